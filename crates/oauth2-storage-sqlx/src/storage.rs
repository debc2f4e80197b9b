use async_trait::async_trait;
use oauth2_core::{Credentials, DynCodec, JsonCredentialCodec, StorageError};
use oauth2_ports::{DynLock, Lock, NoOpLock, Storage};
use sqlx::{Pool, Postgres, Sqlite};
use std::borrow::Cow;
use std::path::PathBuf;

#[derive(Clone, Debug)]
enum DatabasePool {
    Sqlite(Pool<Sqlite>),
    Postgres(Pool<Postgres>),
}

/// Where credentials live: table, key column and credential column.
///
/// Names are interpolated into SQL, so only plain identifiers are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlTarget {
    table: String,
    key_column: String,
    credential_column: String,
}

impl SqlTarget {
    pub fn new(
        table: impl Into<String>,
        key_column: impl Into<String>,
        credential_column: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let target = Self {
            table: table.into(),
            key_column: key_column.into(),
            credential_column: credential_column.into(),
        };

        for name in [&target.table, &target.key_column, &target.credential_column] {
            if !is_identifier(name) {
                return Err(StorageError::Config(format!(
                    "`{name}` is not a valid SQL identifier"
                )));
            }
        }
        if target.key_column == target.credential_column {
            return Err(StorageError::config(
                "key and credential columns must differ",
            ));
        }

        Ok(target)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    pub fn credential_column(&self) -> &str {
        &self.credential_column
    }

    fn create_table_sql(&self) -> String {
        format!(
            r#"CREATE TABLE IF NOT EXISTS "{}" ("{}" TEXT PRIMARY KEY, "{}" TEXT)"#,
            self.table, self.key_column, self.credential_column
        )
    }

    fn select_sql(&self, placeholder: &str) -> String {
        format!(
            r#"SELECT "{}" FROM "{}" WHERE "{}" = {placeholder}"#,
            self.credential_column, self.table, self.key_column
        )
    }

    fn upsert_sql(&self, key: &str, value: &str) -> String {
        format!(
            r#"INSERT INTO "{table}" ("{k}", "{c}") VALUES ({key}, {value}) ON CONFLICT ("{k}") DO UPDATE SET "{c}" = excluded."{c}""#,
            table = self.table,
            k = self.key_column,
            c = self.credential_column,
        )
    }

    fn delete_sql(&self, placeholder: &str) -> String {
        format!(
            r#"DELETE FROM "{}" WHERE "{}" = {placeholder}"#,
            self.table, self.key_column
        )
    }
}

impl Default for SqlTarget {
    fn default() -> Self {
        Self {
            table: "oauth2_credentials".to_string(),
            key_column: "id".to_string(),
            credential_column: "credentials".to_string(),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// SQL-backed storage for the credential identified by `key_value`.
pub struct SqlxStorage {
    pool: DatabasePool,
    target: SqlTarget,
    key_value: String,
    lock: DynLock,
    codec: DynCodec,
}

impl SqlxStorage {
    pub async fn new(
        database_url: &str,
        target: SqlTarget,
        key_value: impl Into<String>,
        lock: Option<DynLock>,
    ) -> Result<Self, StorageError> {
        let pool = if database_url.starts_with("postgres") {
            DatabasePool::Postgres(Pool::<Postgres>::connect(database_url).await?)
        } else {
            // Best-effort: if the directory can't be created, sqlx surfaces the
            // underlying error on connect.
            if let Some(path) = sqlite_db_path(database_url) {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        let _ = std::fs::create_dir_all(parent);
                    }
                }
            }

            let connect_url = sqlite_url_with_create_mode(database_url);
            DatabasePool::Sqlite(Pool::<Sqlite>::connect(connect_url.as_ref()).await?)
        };

        Ok(Self {
            pool,
            target,
            key_value: key_value.into(),
            lock: lock.unwrap_or_else(NoOpLock::shared),
            codec: JsonCredentialCodec::shared(),
        })
    }

    pub fn with_codec(mut self, codec: DynCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn target(&self) -> &SqlTarget {
        &self.target
    }

    pub fn key_value(&self) -> &str {
        &self.key_value
    }

    pub fn backend_name(&self) -> &'static str {
        match &self.pool {
            DatabasePool::Sqlite(_) => "sqlite",
            DatabasePool::Postgres(_) => "postgresql",
        }
    }
}

#[async_trait]
impl Storage for SqlxStorage {
    fn lock(&self) -> &dyn Lock {
        self.lock.as_ref()
    }

    async fn init(&self) -> Result<(), StorageError> {
        let create = self.target.create_table_sql();
        match &self.pool {
            DatabasePool::Sqlite(pool) => {
                sqlx::query(&create).execute(pool).await?;
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query(&create).execute(pool).await?;
            }
        }

        tracing::debug!(table = %self.target.table, "credential table ready");
        Ok(())
    }

    async fn healthcheck(&self) -> Result<(), StorageError> {
        // Keep readiness/liveness cheap: don't touch the schema.
        match &self.pool {
            DatabasePool::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
        }

        Ok(())
    }

    async fn locked_get(&self) -> Result<Option<Credentials>, StorageError> {
        let row: Option<(Option<String>,)> = match &self.pool {
            DatabasePool::Sqlite(pool) => {
                sqlx::query_as(&self.target.select_sql("?"))
                    .bind(&self.key_value)
                    .fetch_optional(pool)
                    .await?
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query_as(&self.target.select_sql("$1"))
                    .bind(&self.key_value)
                    .fetch_optional(pool)
                    .await?
            }
        };

        match row.and_then(|(serialized,)| serialized) {
            Some(serialized) => self.codec.decode(&serialized).map(Some),
            None => Ok(None),
        }
    }

    async fn locked_put(&self, credentials: &Credentials) -> Result<(), StorageError> {
        let serialized = self.codec.encode(credentials)?;

        match &self.pool {
            DatabasePool::Sqlite(pool) => {
                sqlx::query(&self.target.upsert_sql("?", "?"))
                    .bind(&self.key_value)
                    .bind(&serialized)
                    .execute(pool)
                    .await?;
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query(&self.target.upsert_sql("$1", "$2"))
                    .bind(&self.key_value)
                    .bind(&serialized)
                    .execute(pool)
                    .await?;
            }
        }

        tracing::debug!(table = %self.target.table, "stored credentials row");
        Ok(())
    }

    async fn locked_delete(&self) -> Result<(), StorageError> {
        let deleted = match &self.pool {
            DatabasePool::Sqlite(pool) => {
                sqlx::query(&self.target.delete_sql("?"))
                    .bind(&self.key_value)
                    .execute(pool)
                    .await?
                    .rows_affected()
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query(&self.target.delete_sql("$1"))
                    .bind(&self.key_value)
                    .execute(pool)
                    .await?
                    .rows_affected()
            }
        };

        tracing::debug!(table = %self.target.table, deleted, "deleted credentials rows");
        Ok(())
    }
}

fn sqlite_db_path(database_url: &str) -> Option<PathBuf> {
    let rest = database_url.strip_prefix("sqlite:")?;
    if rest.starts_with(":memory:") {
        return None;
    }

    // Reduce URL-ish `sqlite:///abs` / `sqlite://rel` forms to a filesystem path.
    let rest = rest.strip_prefix("//").unwrap_or(rest);

    let path_part = rest.split('?').next().unwrap_or(rest);
    if path_part.is_empty() {
        return None;
    }

    Some(PathBuf::from(path_part))
}

fn sqlite_url_with_create_mode(database_url: &str) -> Cow<'_, str> {
    if !database_url.starts_with("sqlite:")
        || database_url.starts_with("sqlite::memory:")
        || database_url.contains("mode=")
    {
        return Cow::Borrowed(database_url);
    }

    let sep = if database_url.contains('?') { '&' } else { '?' };
    Cow::Owned(format!("{database_url}{sep}mode=rwc"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_target_matches_documented_names() {
        let target = SqlTarget::default();
        assert_eq!(target.table(), "oauth2_credentials");
        assert_eq!(target.key_column(), "id");
        assert_eq!(target.credential_column(), "credentials");
    }

    #[test]
    fn target_rejects_non_identifiers() {
        assert!(SqlTarget::new("creds; DROP TABLE users", "id", "credentials").is_err());
        assert!(SqlTarget::new("creds", "1id", "credentials").is_err());
        assert!(SqlTarget::new("creds", "id", "").is_err());
        assert!(SqlTarget::new("creds", "id", "id").is_err());
        assert!(SqlTarget::new("_creds", "user_id", "credentials_v1").is_ok());
    }

    #[test]
    fn generated_sql_quotes_identifiers() {
        let target = SqlTarget::new("creds", "user_id", "blob").unwrap();
        assert_eq!(
            target.select_sql("$1"),
            r#"SELECT "blob" FROM "creds" WHERE "user_id" = $1"#
        );
        assert_eq!(
            target.delete_sql("?"),
            r#"DELETE FROM "creds" WHERE "user_id" = ?"#
        );
        assert!(target
            .upsert_sql("?", "?")
            .ends_with(r#"ON CONFLICT ("user_id") DO UPDATE SET "blob" = excluded."blob""#));
    }

    #[test]
    fn sqlite_paths_are_extracted_from_urls() {
        assert_eq!(
            sqlite_db_path("sqlite:///tmp/creds.db?mode=rwc"),
            Some(PathBuf::from("/tmp/creds.db"))
        );
        assert_eq!(
            sqlite_db_path("sqlite://data/creds.db"),
            Some(PathBuf::from("data/creds.db"))
        );
        assert_eq!(sqlite_db_path("sqlite:creds.db"), Some(PathBuf::from("creds.db")));
        assert_eq!(sqlite_db_path("sqlite::memory:"), None);
        assert_eq!(sqlite_db_path("postgres://localhost/db"), None);
    }

    #[test]
    fn create_mode_is_added_once() {
        assert_eq!(sqlite_url_with_create_mode("sqlite:creds.db"), "sqlite:creds.db?mode=rwc");
        assert_eq!(
            sqlite_url_with_create_mode("sqlite:creds.db?cache=shared"),
            "sqlite:creds.db?cache=shared&mode=rwc"
        );
        assert_eq!(
            sqlite_url_with_create_mode("sqlite:creds.db?mode=ro"),
            "sqlite:creds.db?mode=ro"
        );
        assert_eq!(sqlite_url_with_create_mode("sqlite::memory:"), "sqlite::memory:");
    }

    #[tokio::test]
    async fn sqlite_round_trip_in_temp_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let url = format!("sqlite://{}", dir.path().join("creds.db").display());

        let storage = SqlxStorage::new(&url, SqlTarget::default(), "1", None).await?;
        storage.init().await?;
        assert_eq!(storage.backend_name(), "sqlite");

        assert!(storage.get().await?.is_none());

        let credentials = Credentials::new("foo")
            .with_refresh_token("1/0/a.df219fjls0")
            .with_client("some_client_id", "cOuDdkfjxxnv+");
        storage.put(&credentials).await?;
        assert_eq!(storage.get().await?, Some(credentials));

        storage.delete().await?;
        assert!(storage.get().await?.is_none());
        // Deleting a missing row is fine.
        storage.delete().await?;

        Ok(())
    }
}
