//! Tuning profile storage
//!
//! Profiles are stored whole (serialized) and always in full; ownership
//! redaction happens in the response serializer, never here.

use crate::error::{Error, Result};
use rcard_common::profile::TuningProfile;
use sqlx::{Pool, Sqlite};
use tracing::info;

/// Insert the two built-in profiles if absent
pub async fn seed_builtin_profiles(db: &Pool<Sqlite>) -> Result<()> {
    for profile in [
        TuningProfile::unified_default(),
        TuningProfile::broadcast_legacy(),
    ] {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tuning_profiles WHERE name = ?)")
                .bind(&profile.name)
                .fetch_one(db)
                .await?;

        if !exists {
            insert_profile(db, &profile).await?;
            info!("Seeded built-in tuning profile '{}'", profile.name);
        }
    }
    Ok(())
}

/// Insert a new profile; fails if the name is taken
pub async fn insert_profile(db: &Pool<Sqlite>, profile: &TuningProfile) -> Result<()> {
    let json = serde_json::to_string(profile)
        .map_err(|e| Error::Internal(format!("Failed to serialize profile: {}", e)))?;

    let result = sqlx::query(
        "INSERT OR IGNORE INTO tuning_profiles (name, owner, profile) VALUES (?, ?, ?)",
    )
    .bind(&profile.name)
    .bind(&profile.owner)
    .bind(json)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::BadRequest(format!(
            "Profile '{}' already exists",
            profile.name
        )));
    }
    Ok(())
}

/// Load a profile by name
pub async fn get_profile(db: &Pool<Sqlite>, name: &str) -> Result<TuningProfile> {
    let json: Option<String> =
        sqlx::query_scalar("SELECT profile FROM tuning_profiles WHERE name = ?")
            .bind(name)
            .fetch_optional(db)
            .await?;

    match json {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| Error::Internal(format!("Corrupt stored profile '{}': {}", name, e))),
        None => Err(Error::NotFound(format!("Tuning profile '{}'", name))),
    }
}

/// Load the currently active profile (settings-driven)
pub async fn active_profile(db: &Pool<Sqlite>) -> Result<TuningProfile> {
    let name = super::settings::get_active_profile(db).await?;
    get_profile(db, &name).await
}
