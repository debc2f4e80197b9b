use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::{Credentials, StorageError};

/// Type tag written alongside every encoded credential.
pub const CREDENTIALS_KIND: &str = "oauth2.authorized_user";

/// Current version of the encoded envelope.
pub const ENCODING_VERSION: u32 = 1;

/// Turns credentials into text for a backing store and back again.
///
/// `decode(encode(c))` must reproduce `c` field for field.
pub trait CredentialCodec: Send + Sync {
    fn encode(&self, credentials: &Credentials) -> Result<String, StorageError>;
    fn decode(&self, encoded: &str) -> Result<Credentials, StorageError>;
}

pub type DynCodec = Arc<dyn CredentialCodec>;

/// JSON envelope codec: `{"kind": ..., "version": ..., "credentials": {...}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCredentialCodec;

impl JsonCredentialCodec {
    pub fn shared() -> DynCodec {
        Arc::new(Self)
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    kind: &'a str,
    version: u32,
    credentials: &'a Credentials,
}

#[derive(Deserialize)]
struct Envelope {
    kind: String,
    version: u32,
    credentials: serde_json::Value,
}

impl CredentialCodec for JsonCredentialCodec {
    fn encode(&self, credentials: &Credentials) -> Result<String, StorageError> {
        let envelope = EnvelopeRef {
            kind: CREDENTIALS_KIND,
            version: ENCODING_VERSION,
            credentials,
        };
        serde_json::to_string(&envelope).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    fn decode(&self, encoded: &str) -> Result<Credentials, StorageError> {
        let envelope: Envelope =
            serde_json::from_str(encoded).map_err(StorageError::deserialization)?;

        if envelope.kind != CREDENTIALS_KIND {
            return Err(StorageError::deserialization(format!(
                "unexpected credential kind `{}`",
                envelope.kind
            )));
        }
        if envelope.version != ENCODING_VERSION {
            return Err(StorageError::deserialization(format!(
                "unsupported encoding version {}",
                envelope.version
            )));
        }

        serde_json::from_value(envelope.credentials).map_err(StorageError::deserialization)
    }
}
