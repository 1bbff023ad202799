/// Database layer for tenantnotes
///
/// This module provides connection pooling, the shard registry and the schema
/// provisioner that lays out the partitioned tables.
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `registry`: Sharding control surface (reference / distributed tables)
/// - `provision`: Idempotent schema provisioning run at process start
/// - Models are in the `models` module at crate root level
///
/// # Example
///
/// ```no_run
/// use tenantnotes_shared::db::pool::{create_pool, PoolConfig};
/// use tenantnotes_shared::db::provision::ensure_schema;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = PoolConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     ensure_schema(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod pool;
pub mod provision;
pub mod registry;

/// SQLSTATE raised by PostgreSQL for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";

/// Returns true if the error is a unique constraint violation
pub fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(db_error) if db_error.code().as_deref() == Some(UNIQUE_VIOLATION)
    )
}

/// Name of the constraint a unique violation was raised for
///
/// Shard placements report the constraint with a shard suffix
/// (`users_tenant_email_key_102008`), so callers should match by prefix.
pub fn violated_constraint(error: &sqlx::Error) -> Option<&str> {
    match error {
        sqlx::Error::Database(db_error) if db_error.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            db_error.constraint()
        }
        _ => None,
    }
}
