/// Database models for Colabora
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: User accounts, roles and authentication data
/// - `project`: Projects owned by a creator
/// - `project_member`: Collaboration join table between projects and users
/// - `task`: Tasks belonging to a project, optionally assigned to a user
/// - `task_file`: Files attached to a task
///
/// # Example
///
/// ```no_run
/// use colabora_shared::models::user::{CreateUser, User, UserRole};
/// use colabora_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     name: "Ana".to_string(),
///     email: "ana@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: UserRole::Member,
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod project;
pub mod project_member;
pub mod task;
pub mod task_file;
pub mod user;
