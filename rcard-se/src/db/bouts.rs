//! Bout metadata access
//!
//! Fighter names and scheduled round counts, consumed by the lifecycle and
//! recompute layers. Bout identity is always an explicit parameter.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rcard_common::model::Bout;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

/// Insert a new bout
pub async fn insert_bout(db: &Pool<Sqlite>, bout: &Bout) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO bouts (bout_id, red_fighter, blue_fighter, scheduled_rounds, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(bout.bout_id.to_string())
    .bind(&bout.red_fighter)
    .bind(&bout.blue_fighter)
    .bind(bout.scheduled_rounds as i64)
    .bind(bout.created_at.to_rfc3339())
    .execute(db)
    .await?;

    Ok(())
}

/// Load a bout by id
pub async fn get_bout(db: &Pool<Sqlite>, bout_id: Uuid) -> Result<Bout> {
    let row = sqlx::query(
        "SELECT bout_id, red_fighter, blue_fighter, scheduled_rounds, created_at FROM bouts WHERE bout_id = ?",
    )
    .bind(bout_id.to_string())
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Bout {}", bout_id)))?;

    row_to_bout(&row)
}

/// All bout ids a fighter appears in (either corner); `None` matches all bouts
pub async fn bouts_for_fighter(db: &Pool<Sqlite>, fighter: Option<&str>) -> Result<Vec<Uuid>> {
    let rows = match fighter {
        Some(name) => {
            sqlx::query("SELECT bout_id FROM bouts WHERE red_fighter = ? OR blue_fighter = ? ORDER BY created_at")
                .bind(name)
                .bind(name)
                .fetch_all(db)
                .await?
        }
        None => {
            sqlx::query("SELECT bout_id FROM bouts ORDER BY created_at")
                .fetch_all(db)
                .await?
        }
    };

    rows.iter()
        .map(|row| parse_uuid(row.get::<String, _>("bout_id")))
        .collect()
}

fn row_to_bout(row: &sqlx::sqlite::SqliteRow) -> Result<Bout> {
    Ok(Bout {
        bout_id: parse_uuid(row.get::<String, _>("bout_id"))?,
        red_fighter: row.get("red_fighter"),
        blue_fighter: row.get("blue_fighter"),
        scheduled_rounds: row.get::<i64, _>("scheduled_rounds") as u32,
        created_at: parse_timestamp(row.get::<String, _>("created_at"))?,
    })
}

pub(crate) fn parse_uuid(s: String) -> Result<Uuid> {
    Uuid::parse_str(&s).map_err(|e| Error::Internal(format!("Corrupt uuid '{}': {}", s, e)))
}

pub(crate) fn parse_timestamp(s: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Corrupt timestamp '{}': {}", s, e)))
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

    fn sample_bout(red: &str, blue: &str) -> Bout {
        Bout {
            bout_id: Uuid::new_v4(),
            red_fighter: red.to_string(),
            blue_fighter: blue.to_string(),
            scheduled_rounds: 3,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_bout_round_trip() {
        let pool = setup_test_db().await;
        let bout = sample_bout("Silva", "Jones");

        insert_bout(&pool, &bout).await.unwrap();
        let loaded = get_bout(&pool, bout.bout_id).await.unwrap();

        assert_eq!(loaded.red_fighter, "Silva");
        assert_eq!(loaded.blue_fighter, "Jones");
        assert_eq!(loaded.scheduled_rounds, 3);
    }

    #[tokio::test]
    async fn test_missing_bout_is_not_found() {
        let pool = setup_test_db().await;
        let err = get_bout(&pool, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_bouts_for_fighter_matches_either_corner() {
        let pool = setup_test_db().await;
        let a = sample_bout("Silva", "Jones");
        let b = sample_bout("Adesanya", "Silva");
        let c = sample_bout("Ngannou", "Miocic");
        for bout in [&a, &b, &c] {
            insert_bout(&pool, bout).await.unwrap();
        }

        let silva = bouts_for_fighter(&pool, Some("Silva")).await.unwrap();
        assert_eq!(silva.len(), 2);
        assert!(silva.contains(&a.bout_id));
        assert!(silva.contains(&b.bout_id));

        let all = bouts_for_fighter(&pool, None).await.unwrap();
        assert_eq!(all.len(), 3);
    }
}
