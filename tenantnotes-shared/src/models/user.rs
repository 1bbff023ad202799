/// User model and database operations
///
/// Users belong to exactly one tenant and are sharded on `tenant_id`. The
/// primary key is the composite `(id, tenant_id)`, and both username and email
/// are unique only within their tenant: the same email may be registered under
/// several tenants.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE shared.users (
///     id SERIAL,
///     tenant_id INTEGER NOT NULL,
///     username VARCHAR(50) NOT NULL,
///     email VARCHAR(100) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (id, tenant_id),
///     CONSTRAINT users_tenant_username_key UNIQUE (tenant_id, username),
///     CONSTRAINT users_tenant_email_key UNIQUE (tenant_id, email)
/// );
/// SELECT create_distributed_table('shared.users', 'tenant_id');
/// ```
///
/// # Example
///
/// ```no_run
/// use tenantnotes_shared::models::user::{User, CreateUser};
/// use tenantnotes_shared::models::tenant::Tenant;
/// use tenantnotes_shared::db::pool::{create_pool, PoolConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(PoolConfig::default()).await?;
/// let tenant = Tenant::get_or_create(&pool, "Acme").await?;
///
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
/// let found = User::find_by_email_and_tenant(&pool, "alice@acme.com", tenant.id).await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, warn};

use super::partition::{Distribution, Partitioned};
use crate::auth::password;
use crate::auth::session::SessionId;
use crate::db::violated_constraint;

/// Per-tenant uniqueness constraint on usernames
pub const USERNAME_CONSTRAINT: &str = "users_tenant_username_key";

/// Per-tenant uniqueness constraint on emails
pub const EMAIL_CONSTRAINT: &str = "users_tenant_email_key";

/// Error type for user creation
#[derive(Debug, thiserror::Error)]
pub enum CreateUserError {
    /// Username already taken within the tenant
    #[error("Username already exists in this tenant")]
    DuplicateUsername,

    /// Email already registered within the tenant
    #[error("Email address already exists in this tenant")]
    DuplicateEmail,

    /// Backend failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CreateUserError {
    /// Translates a backend error into a creation error
    ///
    /// Unique violations on the per-tenant constraints become the matching
    /// duplicate variant; everything else is passed through.
    pub fn from_db(err: sqlx::Error) -> Self {
        let constraint = violated_constraint(&err).map(str::to_owned);
        match constraint.as_deref() {
            Some(name) if name.starts_with(USERNAME_CONSTRAINT) => Self::DuplicateUsername,
            Some(name) if name.starts_with(EMAIL_CONSTRAINT) => Self::DuplicateEmail,
            _ => Self::Database(err),
        }
    }
}

/// User model
///
/// `id` is only meaningful together with `tenant_id`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Local user ID
    pub id: i32,

    /// Owning tenant, also the shard key
    pub tenant_id: i32,

    /// Username, unique within the tenant
    pub username: String,

    /// Email address, unique within the tenant
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// When the user was created
    pub created_at: DateTime<Utc>,
}

impl Partitioned for User {
    const TABLE: &'static str = "shared.users";
    const DISTRIBUTION: Distribution = Distribution::ShardedOn {
        shard_key: "tenant_id",
        colocate_with: None,
    };
}

/// Input for creating a new user
///
/// `tenant_id` has no default: the caller must already have resolved the
/// tenant the user is created in.
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Tenant the user belongs to
    pub tenant_id: i32,

    /// Username
    pub username: String,

    /// Email address
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,
}

impl User {
    /// Composite identity used for sessions
    pub fn session_id(&self) -> SessionId {
        SessionId::new(self.id, self.tenant_id)
    }

    /// Checks a plaintext password against the stored hash
    ///
    /// A stored hash that cannot be parsed counts as a mismatch.
    pub fn verify_password(&self, plaintext: &str) -> bool {
        match password::verify_password(plaintext, &self.password_hash) {
            Ok(valid) => valid,
            Err(e) => {
                warn!(user_id = self.id, tenant_id = self.tenant_id, error = %e, "Stored password hash is unusable");
                false
            }
        }
    }

    /// Creates a user inside an existing tenant
    ///
    /// # Errors
    ///
    /// - `DuplicateUsername` / `DuplicateEmail` when the per-tenant unique
    ///   constraints are violated
    /// - `Database` for any other backend failure
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, CreateUserError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO shared.users (tenant_id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, tenant_id, username, email, password_hash, created_at
            "#,
        )
        .bind(data.tenant_id)
        .bind(data.username)
        .bind(data.email)
        .bind(data.password_hash)
        .fetch_one(pool)
        .await
        .map_err(CreateUserError::from_db)?;

        debug!(user_id = user.id, tenant_id = user.tenant_id, "Created user");
        Ok(user)
    }

    /// Finds a user by its composite primary key
    ///
    /// Routed to the single shard holding `tenant_id`.
    pub async fn find_by_key(
        pool: &PgPool,
        id: i32,
        tenant_id: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, tenant_id, username, email, password_hash, created_at
            FROM shared.users
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email without knowing the tenant
    ///
    /// Only used at login to discover a tenant. Emails are unique per tenant,
    /// not globally, so when several tenants hold this email the one with the
    /// lowest tenant id is returned. This query fans out to every shard.
    pub async fn find_by_email_any_tenant(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, tenant_id, username, email, password_hash, created_at
            FROM shared.users
            WHERE email = $1
            ORDER BY tenant_id, id
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email within one tenant
    pub async fn find_by_email_and_tenant(
        pool: &PgPool,
        email: &str,
        tenant_id: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, tenant_id, username, email, password_hash, created_at
            FROM shared.users
            WHERE tenant_id = $1 AND email = $2
            "#,
        )
        .bind(tenant_id)
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Lists the users of one tenant ordered by id
    pub async fn list_by_tenant(pool: &PgPool, tenant_id: i32) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, tenant_id, username, email, password_hash, created_at
            FROM shared.users
            WHERE tenant_id = $1
            ORDER BY id
            "#,
        )
        .bind(tenant_id)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }
}
