use std::fmt;

use chrono::{DateTime, Duration, Utc};
use oauth2::basic::BasicTokenResponse;
use oauth2::TokenResponse;
use serde::{Deserialize, Serialize};

/// Google's OAuth2 token endpoint.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens are treated as expired this many seconds before their recorded expiry.
pub const EXPIRY_SKEW_SECONDS: i64 = 10;

/// An OAuth2 token bundle for a single authorized user.
///
/// Storage backends treat this as an opaque value: they encode and decode it
/// as a whole and never look inside.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = Some(token_uri.into());
        self
    }

    pub fn with_client(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Build credentials from the response of a token endpoint.
    ///
    /// The response carries the tokens; the client identity and endpoint come
    /// from the application's own settings.
    pub fn from_token_response(
        response: &BasicTokenResponse,
        client_id: &str,
        client_secret: &str,
        token_uri: &str,
    ) -> Self {
        let expiry = response
            .expires_in()
            .and_then(|ttl| Duration::from_std(ttl).ok())
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));

        Self {
            token: Some(response.access_token().secret().to_string()),
            id_token: None,
            refresh_token: response
                .refresh_token()
                .map(|token| token.secret().to_string()),
            token_uri: Some(token_uri.to_string()),
            client_id: Some(client_id.to_string()),
            client_secret: Some(client_secret.to_string()),
            scopes: response
                .scopes()
                .map(|scopes| scopes.iter().map(|scope| scope.to_string()).collect()),
            expiry,
        }
    }

    /// True once the access token is within [`EXPIRY_SKEW_SECONDS`] of its expiry.
    ///
    /// Credentials without a recorded expiry never expire.
    pub fn expired(&self) -> bool {
        match self.expiry {
            Some(expiry) => expiry
                .checked_sub_signed(Duration::seconds(EXPIRY_SKEW_SECONDS))
                .map_or(true, |deadline| Utc::now() >= deadline),
            None => false,
        }
    }

    pub fn valid(&self) -> bool {
        self.token.is_some() && !self.expired()
    }

    /// Check that every requested scope was granted.
    pub fn has_scopes(&self, required: &[&str]) -> bool {
        let granted = self.scopes.as_deref().unwrap_or_default();
        required
            .iter()
            .all(|scope| granted.iter().any(|g| g == scope))
    }
}

fn mask(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "***MASKED***")
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &mask(&self.token))
            .field("id_token", &mask(&self.id_token))
            .field("refresh_token", &mask(&self.refresh_token))
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &mask(&self.client_secret))
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish()
    }
}
