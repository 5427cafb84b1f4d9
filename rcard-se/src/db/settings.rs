//! Settings database access
//!
//! Read/write settings from the settings table (key-value store). All
//! settings are global/system-wide (not user-specific).

use crate::error::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tracing::info;

/// Get the name of the active tuning profile
pub async fn get_active_profile(db: &Pool<Sqlite>) -> Result<String> {
    match get_setting::<String>(db, "active_profile").await? {
        Some(name) => Ok(name),
        None => {
            let default = rcard_common::profile::TuningProfile::DEFAULT_NAME.to_string();
            set_active_profile(db, &default).await?;
            Ok(default)
        }
    }
}

/// Set the active tuning profile name
pub async fn set_active_profile(db: &Pool<Sqlite>, name: &str) -> Result<()> {
    set_setting(db, "active_profile", name.to_string()).await
}

/// Initialize settings table with default values
pub async fn init_settings_defaults(db: &Pool<Sqlite>) -> Result<()> {
    let defaults = vec![
        // Profile the pipeline scores under unless changed by a supervisor
        ("active_profile", rcard_common::profile::TuningProfile::DEFAULT_NAME),
        // Rounds assumed for a bout registered without an explicit count
        ("default_scheduled_rounds", "3"),
    ];

    for (key, default_value) in defaults {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
                .bind(key)
                .fetch_one(db)
                .await?;

        if !exists {
            sqlx::query("INSERT INTO settings (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(default_value)
                .execute(db)
                .await?;

            info!("Initialized setting '{}' with default value: {}", key, default_value);
        }
    }

    Ok(())
}

/// Generic setting getter
///
/// Returns None when the key is absent; parse failures are configuration
/// errors, never silently defaulted.
pub async fn get_setting<T: FromStr>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match value {
        Some(s) => match s.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(Error::Config(format!(
                "Failed to parse setting '{}' value: {}",
                key, s
            ))),
        },
        None => Ok(None),
    }
}

/// Generic setting setter (insert or update)
pub async fn set_setting<T: ToString>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init::init_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_setting_round_trip() {
        let pool = setup_test_db().await;

        assert!(get_setting::<i64>(&pool, "missing").await.unwrap().is_none());

        set_setting(&pool, "answer", 42i64).await.unwrap();
        assert_eq!(get_setting::<i64>(&pool, "answer").await.unwrap(), Some(42));

        // Upsert overwrites
        set_setting(&pool, "answer", 7i64).await.unwrap();
        assert_eq!(get_setting::<i64>(&pool, "answer").await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_active_profile_defaults() {
        let pool = setup_test_db().await;

        let name = get_active_profile(&pool).await.unwrap();
        assert_eq!(name, rcard_common::profile::TuningProfile::DEFAULT_NAME);

        set_active_profile(&pool, "broadcast-legacy").await.unwrap();
        assert_eq!(get_active_profile(&pool).await.unwrap(), "broadcast-legacy");
    }
}
