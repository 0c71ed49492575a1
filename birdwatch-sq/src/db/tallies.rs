//! User tally rows (`checklist_table`)
//!
//! Every query is scoped to the owning user: another user's row id behaves
//! exactly like an id that does not exist.

use birdwatch_common::db::TallyRow;
use birdwatch_common::{Error, Result};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::SqlitePool;
use tracing::debug;

/// One species count submitted from the checklist page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTally {
    pub species_name: String,
    pub num_seen: i64,
}

/// Insert all tallies in one transaction, returning the new row ids in order
pub async fn insert_tallies(
    pool: &SqlitePool,
    user_email: &str,
    tallies: &[NewTally],
) -> Result<Vec<i64>> {
    if tallies.iter().any(|t| t.species_name.trim().is_empty()) {
        return Err(Error::InvalidInput("species name must not be empty".to_string()));
    }
    if let Some(bad) = tallies.iter().find(|t| t.num_seen < 0) {
        return Err(Error::InvalidInput(format!(
            "num_seen must not be negative for {}",
            bad.species_name
        )));
    }

    let mut tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(tallies.len());

    for tally in tallies {
        let id = sqlx::query(
            "INSERT INTO checklist_table (user_email, species_name, num_seen) VALUES (?, ?, ?)",
        )
        .bind(user_email)
        .bind(&tally.species_name)
        .bind(tally.num_seen)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        ids.push(id);
    }

    tx.commit().await?;
    debug!("Inserted {} tally rows for {}", ids.len(), user_email);

    Ok(ids)
}

/// All rows owned by `user_email`, oldest first
pub async fn tallies_for_user(pool: &SqlitePool, user_email: &str) -> Result<Vec<TallyRow>> {
    let rows = sqlx::query_as::<_, TallyRow>(
        "SELECT id, user_email, species_name, num_seen, data, CAST(created_at AS TEXT) AS created_at
         FROM checklist_table
         WHERE user_email = ?
         ORDER BY id",
    )
    .bind(user_email)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Replace the `data` payload of one row; false when no such row is owned by the user
pub async fn update_tally_data(
    pool: &SqlitePool,
    user_email: &str,
    id: i64,
    data: &Value,
) -> Result<bool> {
    let result = sqlx::query("UPDATE checklist_table SET data = ? WHERE id = ? AND user_email = ?")
        .bind(Json(data))
        .bind(id)
        .bind(user_email)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete one row; false when no such row is owned by the user
pub async fn delete_tally(pool: &SqlitePool, user_email: &str, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM checklist_table WHERE id = ? AND user_email = ?")
        .bind(id)
        .bind(user_email)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
