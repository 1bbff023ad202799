/// Database models for tenantnotes
///
/// This module contains the partitioned entities and their data-access
/// operations.
///
/// # Models
///
/// - `partition`: Distribution of each table across shards
/// - `tenant`: Organizations (reference table)
/// - `user`: Tenant-scoped accounts (sharded on `tenant_id`)
/// - `note`: Personal notes (sharded on `owner_user_id`, co-located with users)
///
/// # Example
///
/// ```no_run
/// use tenantnotes_shared::models::{note::Note, tenant::Tenant, user::{CreateUser, User}};
/// use tenantnotes_shared::db::pool::{create_pool, PoolConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(PoolConfig::default()).await?;
///
/// let tenant = Tenant::get_or_create(&pool, "Acme").await?;
/// let user = User::create(
///     &pool,
///     CreateUser {
///         tenant_id: tenant.id,
///         username: "alice".to_string(),
///         email: "alice@acme.com".to_string(),
///         password_hash: "$argon2id$...".to_string(),
///     },
/// )
/// .await?;
///
/// Note::create(&pool, user.id, "first note").await?;
/// let notes = Note::list_for_user(&pool, user.id).await?;
/// # Ok(())
/// # }
/// ```

pub mod note;
pub mod partition;
pub mod tenant;
pub mod user;
