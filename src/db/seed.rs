use crate::domain::models::UserRole;
use crate::services::password;
use anyhow::Result;
use sqlx::PgPool;

/// Create the bootstrap admin account when the instance starts empty.
/// Controlled by ADMIN_EMAIL / ADMIN_PASSWORD; skipped when unset.
pub async fn seed_all(pool: &PgPool) -> Result<()> {
    let (Ok(email), Ok(plain)) = (
        std::env::var("ADMIN_EMAIL"),
        std::env::var("ADMIN_PASSWORD"),
    ) else {
        tracing::info!("ADMIN_EMAIL/ADMIN_PASSWORD not set, skipping admin seed");
        return Ok(());
    };

    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
        .bind(&email)
        .fetch_one(pool)
        .await?;
    if exists {
        tracing::debug!("admin account already present");
        return Ok(());
    }

    let hash = password::hash_password(&plain)?;
    crate::db::insert_user(pool, &email, &hash, UserRole::Admin, "Administrator").await?;
    tracing::info!("Created bootstrap admin account {email}");
    Ok(())
}
