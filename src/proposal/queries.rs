//! Database queries for proposal numbering.

use chrono::{Datelike, NaiveDate};
use sqlx::PgPool;

use super::models::ServiceCode;

/// Settings key holding the last issued proposal sequence.
pub const PROPOSAL_SEQUENCE_KEY: &str = "proposal_sequence";

/// Take the next proposal sequence number.
///
/// The counter row is created on first use and incremented under a row lock,
/// so concurrent callers never observe the same value.
pub async fn next_proposal_sequence(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO settings (key, value)
        VALUES ($1, 0)
        ON CONFLICT (key) DO NOTHING
        "#,
    )
    .bind(PROPOSAL_SEQUENCE_KEY)
    .execute(&mut *tx)
    .await?;

    let current: i64 = sqlx::query_scalar(
        r#"
        SELECT value
        FROM settings
        WHERE key = $1
        FOR UPDATE
        "#,
    )
    .bind(PROPOSAL_SEQUENCE_KEY)
    .fetch_one(&mut *tx)
    .await?;

    let next = current + 1;
    sqlx::query(
        r#"
        UPDATE settings
        SET value = $2, updated_at = NOW()
        WHERE key = $1
        "#,
    )
    .bind(PROPOSAL_SEQUENCE_KEY)
    .bind(next)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(next)
}

/// Code used in the proposal number: the service itself, or `PC` for a
/// combination.
pub fn proposal_service_code(services: &[ServiceCode]) -> &'static str {
    match services {
        [single] => single.as_str(),
        _ => "PC",
    }
}

/// `{seq:03}-SPH-{code}-{month}-{year}`.
pub fn format_proposal_number(sequence: i64, service_code: &str, date: NaiveDate) -> String {
    format!(
        "{:03}-SPH-{}-{}-{}",
        sequence,
        service_code,
        date.month(),
        date.year()
    )
}
