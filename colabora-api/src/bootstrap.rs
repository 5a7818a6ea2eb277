/// Startup provisioning
///
/// Self-registration cannot create admins, so the first admin account comes
/// from `BOOTSTRAP_ADMIN_*` settings. The account is created once and never
/// modified afterwards; changing the settings later has no effect on an
/// existing user.

use colabora_shared::{
    auth::password,
    models::user::{normalize_email, CreateUser, User, UserRole},
};
use sqlx::PgPool;

use crate::config::BootstrapAdmin;

/// What [`ensure_admin`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// A new admin account was created
    Created,

    /// A user with that email already exists
    AlreadyExists,
}

/// Creates the configured admin account if no user has its email
pub async fn ensure_admin(pool: &PgPool, admin: &BootstrapAdmin) -> anyhow::Result<BootstrapOutcome> {
    let email = normalize_email(&admin.email);

    if let Some(existing) = User::find_by_email(pool, &email).await? {
        if existing.role != UserRole::Admin {
            tracing::warn!(
                user_id = %existing.id,
                role = %existing.role,
                "Bootstrap admin email belongs to a non-admin user"
            );
        }
        return Ok(BootstrapOutcome::AlreadyExists);
    }

    password::validate_password_strength(&admin.password)
        .map_err(|e| anyhow::anyhow!("BOOTSTRAP_ADMIN_PASSWORD is too weak: {}", e))?;

    let user = User::create(
        pool,
        CreateUser {
            name: admin.name.clone(),
            email,
            password_hash: password::hash_password(&admin.password)?,
            role: UserRole::Admin,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "Bootstrap admin created");

    Ok(BootstrapOutcome::Created)
}
