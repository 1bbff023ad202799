/// Tenant model and database operations
///
/// A tenant is the organization users register under. Tenants live in a
/// reference table, so every shard holds a full copy and joins against it
/// never leave the shard.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE shared.tenants (
///     id SERIAL PRIMARY KEY,
///     name VARCHAR(100) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT tenants_name_key UNIQUE (name)
/// );
/// SELECT create_reference_table('shared.tenants');
/// ```
///
/// # Example
///
/// ```no_run
/// use tenantnotes_shared::models::tenant::Tenant;
/// use tenantnotes_shared::db::pool::{create_pool, PoolConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(PoolConfig::default()).await?;
///
/// // Resolves to the same row no matter how many callers race on the name
/// let tenant = Tenant::get_or_create(&pool, "Acme").await?;
/// println!("Tenant {} has id {}", tenant.name, tenant.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;

use super::partition::{Distribution, Partitioned};
use crate::db::is_unique_violation;

/// Name of the global uniqueness constraint on tenant names
pub const TENANT_NAME_CONSTRAINT: &str = "tenants_name_key";

/// Tenant model representing an organization
///
/// Ids are global and shard-independent. Tenants are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
    /// Tenant ID, unique across the cluster
    pub id: i32,

    /// Organization name, unique across the cluster
    pub name: String,

    /// When the tenant was created
    pub created_at: DateTime<Utc>,
}

impl Partitioned for Tenant {
    const TABLE: &'static str = "shared.tenants";
    const DISTRIBUTION: Distribution = Distribution::Reference;
}

impl Tenant {
    /// Inserts a new tenant
    ///
    /// # Errors
    ///
    /// Returns a database error carrying SQLSTATE 23505 if the name is taken.
    /// Use [`Tenant::get_or_create`] when an existing tenant is acceptable.
    pub async fn create(pool: &PgPool, name: &str) -> Result<Self, sqlx::Error> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO shared.tenants (name)
            VALUES ($1)
            RETURNING id, name, created_at
            "#,
        )
        .bind(name)
        .fetch_one(pool)
        .await?;

        Ok(tenant)
    }

    /// Finds a tenant by ID
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use tenantnotes_shared::models::tenant::Tenant;
    /// # use sqlx::PgPool;
    /// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
    /// if let Some(tenant) = Tenant::find_by_id(&pool, 7).await? {
    ///     println!("Found tenant: {}", tenant.name);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, name, created_at
            FROM shared.tenants
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(tenant)
    }

    /// Finds a tenant by its exact name
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, name, created_at
            FROM shared.tenants
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(pool)
        .await?;

        Ok(tenant)
    }

    /// Returns the tenant with this name, creating it if needed
    ///
    /// The unique constraint on `name` is the arbiter: when the insert loses a
    /// race against another writer, the row that won is read back and returned.
    /// Every caller for the same name therefore observes the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database fails, or `RowNotFound` if the name
    /// conflicted but the winning row is not visible (it was never committed).
    pub async fn get_or_create(pool: &PgPool, name: &str) -> Result<Self, sqlx::Error> {
        if let Some(tenant) = Self::find_by_name(pool, name).await? {
            return Ok(tenant);
        }

        match Self::create(pool, name).await {
            Ok(tenant) => {
                debug!(tenant_id = tenant.id, tenant_name = %tenant.name, "Created tenant");
                Ok(tenant)
            }
            Err(err) if is_unique_violation(&err) => {
                debug!(tenant_name = %name, "Tenant created concurrently, reading winner");
                Self::find_by_name(pool, name)
                    .await?
                    .ok_or(sqlx::Error::RowNotFound)
            }
            Err(err) => Err(err),
        }
    }

    /// Lists tenants ordered by id
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let tenants = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, name, created_at
            FROM shared.tenants
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(tenants)
    }
}
