use chrono::{TimeZone, Utc};
use oauth2_credential_store::storage::Storage;
use oauth2_credential_store::{Credentials, GOOGLE_TOKEN_URI};

pub fn generate_credentials() -> Credentials {
    Credentials::new("access_tokenz")
        .with_id_token("base64encodedjwtidtoken")
        .with_refresh_token("refresh_tokenz")
        .with_token_uri(GOOGLE_TOKEN_URI)
        .with_client("client_idz", "client_secretz")
        .with_scopes(["email", "profile"])
        .with_expiry(Utc.with_ymd_and_hms(2031, 6, 1, 12, 0, 0).unwrap())
}

/// A minimal contract test suite that every `Storage` backend must satisfy.
///
/// This keeps backend parity honest (dictionary, SQLx, and any future backends).
/// The storage must start out empty.
pub async fn run_storage_contract(storage: &dyn Storage) -> Result<(), Box<dyn std::error::Error>> {
    // Empty store
    assert!(storage.get().await?.is_none(), "new storage should be empty");

    // Deleting nothing is fine
    storage.delete().await?;
    assert!(storage.get().await?.is_none());

    // Roundtrip keeps every field
    let credentials = generate_credentials();
    storage.put(&credentials).await?;
    let fetched = storage
        .get()
        .await?
        .ok_or_else(|| std::io::Error::other("credentials should exist"))?;
    assert_eq!(fetched, credentials);

    // Overwrite replaces the single stored value
    let refreshed = Credentials {
        token: Some("refreshed_access_tokenz".to_string()),
        scopes: None,
        ..credentials.clone()
    };
    storage.put(&refreshed).await?;
    let fetched = storage
        .get()
        .await?
        .ok_or_else(|| std::io::Error::other("credentials should still exist"))?;
    assert_eq!(fetched, refreshed);
    assert_eq!(fetched.scopes, None);

    // Locked primitives agree with the public operations
    storage.acquire_lock().await?;
    let locked = storage.locked_get().await;
    storage.release_lock()?;
    assert_eq!(locked?, Some(refreshed));

    // Delete removes it
    storage.delete().await?;
    assert!(storage.get().await?.is_none());

    Ok(())
}
