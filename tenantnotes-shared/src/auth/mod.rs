/// Authentication for TenantNotes
///
/// # Modules
///
/// - [`session`]: `"<user_id>:<tenant_id>"` session identity codec
/// - [`jwt`]: signed tokens carrying the session identity
/// - [`password`]: Argon2id password hashing
/// - [`account`]: registration and login flows
/// - [`middleware`]: Axum middleware resolving Bearer tokens to users
///
/// # Example
///
/// ```no_run
/// use tenantnotes_shared::auth::jwt::{create_token, validate_token, Claims};
/// use tenantnotes_shared::auth::password::{hash_password, verify_password};
/// use tenantnotes_shared::auth::session::SessionId;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let token = create_token(&Claims::new(&SessionId::new(1, 1)), "secret-key")?;
/// let claims = validate_token(&token, "secret-key")?;
/// assert_eq!(claims.session_id()?, SessionId::new(1, 1));
/// # Ok(())
/// # }
/// ```

pub mod account;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod session;
