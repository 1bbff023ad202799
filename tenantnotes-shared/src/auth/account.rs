/// Registration and login
///
/// Registration attaches a new user to a tenant chosen by name, creating the
/// tenant on first use. Login verifies an email/password pair and yields the
/// user whose composite key becomes the session identity.
///
/// # Tenant discovery at login
///
/// Emails are unique per tenant only. When the caller names a tenant, the
/// lookup is exact. Without one, the first user holding the email (lowest
/// tenant id) is picked, so an email registered under several tenants can only
/// sign in to the others by naming the tenant.
///
/// # Example
///
/// ```no_run
/// use tenantnotes_shared::auth::account::{authenticate, register, RegisterAccount};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let (tenant, user) = register(
///     &pool,
///     RegisterAccount {
///         tenant_name: "Acme".to_string(),
///         username: "alice".to_string(),
///         email: "alice@acme.com".to_string(),
///         password: "correct horse battery".to_string(),
///     },
/// )
/// .await?;
///
/// let session = authenticate(&pool, "alice@acme.com", "correct horse battery", None)
///     .await?
///     .session_id();
/// assert_eq!(session.tenant_id, tenant.id);
/// assert_eq!(session.user_id, user.id);
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use super::password::{self, PasswordError};
use crate::models::{
    tenant::Tenant,
    user::{CreateUser, CreateUserError, User},
};

/// Input for registering a user
#[derive(Debug, Clone)]
pub struct RegisterAccount {
    /// Tenant to join or create
    pub tenant_name: String,

    pub username: String,

    pub email: String,

    /// Plaintext password, hashed before storage
    pub password: String,
}

/// Error type for registration
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    /// Username or email already taken in the tenant
    #[error(transparent)]
    Create(#[from] CreateUserError),

    /// Password hashing failed
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Tenant lookup or creation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Error type for login
///
/// Unknown tenant, unknown email and wrong password all surface as
/// `InvalidCredentials`, so callers cannot tell which part was wrong.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticateError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Hash checked against when no account matches, computed once
static MISS_HASH: OnceLock<Option<String>> = OnceLock::new();

fn miss_hash() -> Option<&'static str> {
    MISS_HASH
        .get_or_init(|| match password::hash_password("tenantnotes-no-such-account") {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!(error = %e, "Could not prepare hash for unmatched logins");
                None
            }
        })
        .as_deref()
}

/// Spends one Argon2 verification on a login that matched no account
///
/// Keeps an unknown email or tenant as slow as a wrong password.
fn verify_against_miss_hash(plaintext_password: &str) {
    if let Some(hash) = miss_hash() {
        let _ = password::verify_password(plaintext_password, hash);
    }
}

/// Registers a user under a tenant, creating the tenant if needed
///
/// # Errors
///
/// - `RegisterError::Create(DuplicateUsername | DuplicateEmail)` when the
///   tenant already has a user with this username or email
/// - `RegisterError::Database` / `RegisterError::Password` on backend or
///   hashing failure
pub async fn register(pool: &PgPool, data: RegisterAccount) -> Result<(Tenant, User), RegisterError> {
    let password_hash = password::hash_password(&data.password)?;

    let tenant = Tenant::get_or_create(pool, &data.tenant_name).await?;

    let user = User::create(
        pool,
        CreateUser {
            tenant_id: tenant.id,
            username: data.username,
            email: data.email,
            password_hash,
        },
    )
    .await?;

    info!(user_id = user.id, tenant_id = tenant.id, "Registered user");
    Ok((tenant, user))
}

/// Verifies credentials and returns the matching user
///
/// With `tenant_name`, only that tenant is searched. Without it, the tenant
/// is discovered from the email first.
pub async fn authenticate(
    pool: &PgPool,
    email: &str,
    plaintext_password: &str,
    tenant_name: Option<&str>,
) -> Result<User, AuthenticateError> {
    let tenant_id = match tenant_name {
        Some(name) => Tenant::find_by_name(pool, name).await?.map(|t| t.id),
        None => User::find_by_email_any_tenant(pool, email)
            .await?
            .map(|u| u.tenant_id),
    };

    let Some(tenant_id) = tenant_id else {
        debug!("Login rejected: no tenant resolved");
        verify_against_miss_hash(plaintext_password);
        return Err(AuthenticateError::InvalidCredentials);
    };

    let Some(user) = User::find_by_email_and_tenant(pool, email, tenant_id).await? else {
        debug!(tenant_id, "Login rejected: no user for email in tenant");
        verify_against_miss_hash(plaintext_password);
        return Err(AuthenticateError::InvalidCredentials);
    };

    if !user.verify_password(plaintext_password) {
        debug!(user_id = user.id, tenant_id, "Login rejected: password mismatch");
        return Err(AuthenticateError::InvalidCredentials);
    }

    Ok(user)
}
