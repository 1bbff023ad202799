/// Schema provisioner
///
/// Creates the shared namespace, the tenant/user/note tables and their
/// sharding metadata. It runs once at process start, before any data access,
/// and is safe to run on every start and from several processes at once.
///
/// # Layout
///
/// ```text
/// CREATE SCHEMA IF NOT EXISTS shared
/// shared.tenants  -> create_reference_table
/// shared.users    -> create_distributed_table(tenant_id)
/// notes           -> create_distributed_table(owner_user_id, colocate_with => shared.users)
/// ```
///
/// Tables are only registered when the backend has no metadata for them yet.
/// The plan is plain data ([`SCHEMA_PLAN`]) executed by [`provision`] against
/// any [`ShardRegistry`], so the step logic runs without a live cluster.
///
/// # Failure
///
/// Any failing step aborts the run. [`ensure_schema`] executes the whole run in
/// one transaction, so DDL already issued is rolled back. There is no degraded
/// mode: tables that exist but are not distributed behave as plain single-node
/// tables, which silently defeats partitioning, so callers should stop startup
/// on error.
///
/// # Example
///
/// ```no_run
/// use tenantnotes_shared::db::pool::{create_pool, PoolConfig};
/// use tenantnotes_shared::db::provision::ensure_schema;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(PoolConfig::default()).await?;
/// let report = ensure_schema(&pool).await?;
/// println!("Registered {} tables", report.registered.len());
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use tracing::{debug, error, info};

use super::registry::{CitusRegistry, ShardRegistry};
use crate::models::{
    note::Note,
    partition::{Distribution, Partitioned, SHARED_SCHEMA},
    tenant::Tenant,
    user::User,
};

/// Advisory lock key serializing concurrent provisioning runs
///
/// ASCII "tnschema".
pub const PROVISION_LOCK_KEY: i64 = 0x746e_7363_6865_6d61;

/// Error type for schema provisioning
///
/// Always fatal for the process that receives it.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// A provisioning step failed
    #[error("Schema provisioning failed at '{step}': {source}")]
    Step {
        /// Human-readable step description
        step: String,
        #[source]
        source: sqlx::Error,
    },

    /// The plan itself is inconsistent
    #[error("Invalid schema plan: {0}")]
    InvalidPlan(String),

    /// Transaction handling failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One table of the plan
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    /// Qualified table name
    pub table: &'static str,

    /// Idempotent `CREATE TABLE IF NOT EXISTS` statement
    pub ddl: &'static str,

    /// Shard layout to register
    pub distribution: Distribution,
}

/// Ordered provisioning plan
#[derive(Debug, Clone, Copy)]
pub struct SchemaPlan {
    /// Namespaces created before any table
    pub namespaces: &'static [&'static str],

    /// Tables, each after the tables it is co-located with
    pub tables: &'static [TableSpec],
}

const TENANTS_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS shared.tenants (
    id SERIAL PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT tenants_name_key UNIQUE (name)
)
"#;

const USERS_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS shared.users (
    id SERIAL,
    tenant_id INTEGER NOT NULL,
    username VARCHAR(50) NOT NULL,
    email VARCHAR(100) NOT NULL,
    password_hash VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (id, tenant_id),
    CONSTRAINT users_tenant_username_key UNIQUE (tenant_id, username),
    CONSTRAINT users_tenant_email_key UNIQUE (tenant_id, email)
)
"#;

const NOTES_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS notes (
    id SERIAL,
    content TEXT NOT NULL,
    owner_user_id INTEGER NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (id, owner_user_id)
)
"#;

/// The tenantnotes schema
pub const SCHEMA_PLAN: SchemaPlan = SchemaPlan {
    namespaces: &[SHARED_SCHEMA],
    tables: &[
        TableSpec {
            table: Tenant::TABLE,
            ddl: TENANTS_DDL,
            distribution: Tenant::DISTRIBUTION,
        },
        TableSpec {
            table: User::TABLE,
            ddl: USERS_DDL,
            distribution: User::DISTRIBUTION,
        },
        TableSpec {
            table: Note::TABLE,
            ddl: NOTES_DDL,
            distribution: Note::DISTRIBUTION,
        },
    ],
};

/// Outcome of a provisioning run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Tables registered by this run
    pub registered: Vec<&'static str>,

    /// Tables that already had sharding metadata
    pub already_registered: Vec<&'static str>,
}

impl SchemaPlan {
    /// Checks that every co-location target is registered earlier in the plan
    pub fn validate(&self) -> Result<(), ProvisionError> {
        for (index, spec) in self.tables.iter().enumerate() {
            if let Some(group) = spec.distribution.colocated_with() {
                let earlier = &self.tables[..index];
                match earlier.iter().find(|t| t.table == group) {
                    None => {
                        return Err(ProvisionError::InvalidPlan(format!(
                            "{} is co-located with {}, which is not provisioned before it",
                            spec.table, group
                        )));
                    }
                    Some(target) if target.distribution.is_reference() => {
                        return Err(ProvisionError::InvalidPlan(format!(
                            "{} cannot be co-located with reference table {}",
                            spec.table, group
                        )));
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }
}

fn step_error(step: impl Into<String>) -> impl FnOnce(sqlx::Error) -> ProvisionError {
    let step = step.into();
    move |source| ProvisionError::Step { step, source }
}

/// Runs a plan against a registry
///
/// Every statement is idempotent and registration is skipped for tables the
/// backend already knows, so re-running a completed plan changes nothing.
pub async fn provision<R: ShardRegistry + ?Sized>(
    registry: &mut R,
    plan: &SchemaPlan,
) -> Result<ProvisionReport, ProvisionError> {
    plan.validate()?;

    for namespace in plan.namespaces {
        registry
            .execute_ddl(&format!("CREATE SCHEMA IF NOT EXISTS {namespace}"))
            .await
            .map_err(step_error(format!("create schema {namespace}")))?;
    }

    let mut report = ProvisionReport::default();

    for spec in plan.tables {
        registry
            .execute_ddl(spec.ddl)
            .await
            .map_err(step_error(format!("create table {}", spec.table)))?;

        let registered = registry
            .is_registered(spec.table)
            .await
            .map_err(step_error(format!("look up shard metadata for {}", spec.table)))?;

        if registered {
            debug!(table = spec.table, "Table already distributed");
            report.already_registered.push(spec.table);
            continue;
        }

        registry
            .register(spec.table, &spec.distribution)
            .await
            .map_err(step_error(format!("distribute {}", spec.table)))?;

        info!(
            table = spec.table,
            shard_key = ?spec.distribution.shard_key(),
            colocate_with = ?spec.distribution.colocated_with(),
            "Registered table with shard metadata"
        );
        report.registered.push(spec.table);
    }

    Ok(report)
}

/// Provisions the tenantnotes schema on a Citus cluster
///
/// The run happens inside one transaction holding a transaction-scoped
/// advisory lock, so processes starting together provision one after the
/// other and later ones find everything in place.
///
/// # Errors
///
/// Returns `ProvisionError` if any step fails; the transaction is rolled back
/// before returning.
pub async fn ensure_schema(pool: &PgPool) -> Result<ProvisionReport, ProvisionError> {
    info!("Provisioning database schema");

    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(PROVISION_LOCK_KEY)
        .execute(&mut *tx)
        .await
        .map_err(step_error("acquire provisioning lock"))?;

    let result = {
        let mut registry = CitusRegistry::new(&mut tx);
        provision(&mut registry, &SCHEMA_PLAN).await
    };

    match result {
        Ok(report) => {
            tx.commit().await?;
            info!(
                registered = ?report.registered,
                already_registered = ?report.already_registered,
                "Database schema ready"
            );
            Ok(report)
        }
        Err(e) => {
            error!(error = %e, "Schema provisioning failed, rolling back");
            if let Err(rollback_err) = tx.rollback().await {
                error!(error = %rollback_err, "Rollback after failed provisioning also failed");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Ddl(String),
        Lookup(String),
        Reference(String),
        Distributed {
            table: String,
            shard_key: String,
            colocate_with: Option<String>,
        },
    }

    /// In-memory registry recording every call
    #[derive(Default)]
    struct FakeRegistry {
        calls: Vec<Call>,
        registered: HashSet<String>,
        fail_on_register: Option<&'static str>,
    }

    impl FakeRegistry {
        fn registrations(&self) -> Vec<&Call> {
            self.calls
                .iter()
                .filter(|c| matches!(c, Call::Reference(_) | Call::Distributed { .. }))
                .collect()
        }
    }

    #[async_trait]
    impl ShardRegistry for FakeRegistry {
        async fn execute_ddl(&mut self, sql: &str) -> Result<(), sqlx::Error> {
            self.calls.push(Call::Ddl(sql.trim().to_string()));
            Ok(())
        }

        async fn is_registered(&mut self, table: &str) -> Result<bool, sqlx::Error> {
            self.calls.push(Call::Lookup(table.to_string()));
            Ok(self.registered.contains(table))
        }

        async fn register_reference_table(&mut self, table: &str) -> Result<(), sqlx::Error> {
            if self.fail_on_register == Some(table) {
                return Err(sqlx::Error::Protocol(format!("cannot distribute {table}")));
            }
            self.calls.push(Call::Reference(table.to_string()));
            self.registered.insert(table.to_string());
            Ok(())
        }

        async fn register_distributed_table(
            &mut self,
            table: &str,
            shard_key: &str,
            colocate_with: Option<&str>,
        ) -> Result<(), sqlx::Error> {
            if self.fail_on_register == Some(table) {
                return Err(sqlx::Error::Protocol(format!("cannot distribute {table}")));
            }
            self.calls.push(Call::Distributed {
                table: table.to_string(),
                shard_key: shard_key.to_string(),
                colocate_with: colocate_with.map(str::to_string),
            });
            self.registered.insert(table.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_fresh_provisioning_registers_every_table() {
        let mut registry = FakeRegistry::default();

        let report = provision(&mut registry, &SCHEMA_PLAN).await.unwrap();

        assert_eq!(
            report.registered,
            vec!["shared.tenants", "shared.users", "notes"]
        );
        assert!(report.already_registered.is_empty());

        assert_eq!(
            registry.registrations(),
            vec![
                &Call::Reference("shared.tenants".to_string()),
                &Call::Distributed {
                    table: "shared.users".to_string(),
                    shard_key: "tenant_id".to_string(),
                    colocate_with: None,
                },
                &Call::Distributed {
                    table: "notes".to_string(),
                    shard_key: "owner_user_id".to_string(),
                    colocate_with: Some("shared.users".to_string()),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_namespace_created_first() {
        let mut registry = FakeRegistry::default();
        provision(&mut registry, &SCHEMA_PLAN).await.unwrap();

        assert_eq!(
            registry.calls[0],
            Call::Ddl("CREATE SCHEMA IF NOT EXISTS shared".to_string())
        );
    }

    #[tokio::test]
    async fn test_table_created_before_lookup_and_registration() {
        let mut registry = FakeRegistry::default();
        provision(&mut registry, &SCHEMA_PLAN).await.unwrap();

        let position = |wanted: &Call| registry.calls.iter().position(|c| c == wanted).unwrap();
        let created = registry
            .calls
            .iter()
            .position(|c| matches!(c, Call::Ddl(sql) if sql.contains("shared.users")))
            .unwrap();
        let looked_up = position(&Call::Lookup("shared.users".to_string()));
        let registered = registry
            .calls
            .iter()
            .position(|c| matches!(c, Call::Distributed { table, .. } if table == "shared.users"))
            .unwrap();

        assert!(created < looked_up);
        assert!(looked_up < registered);
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let mut registry = FakeRegistry::default();
        provision(&mut registry, &SCHEMA_PLAN).await.unwrap();
        let first_registrations = registry.registrations().len();

        let report = provision(&mut registry, &SCHEMA_PLAN).await.unwrap();

        assert!(report.registered.is_empty());
        assert_eq!(report.already_registered.len(), 3);
        assert_eq!(registry.registrations().len(), first_registrations);
    }

    #[tokio::test]
    async fn test_partially_registered_cluster() {
        let mut registry = FakeRegistry::default();
        registry.registered.insert("shared.tenants".to_string());

        let report = provision(&mut registry, &SCHEMA_PLAN).await.unwrap();

        assert_eq!(report.already_registered, vec!["shared.tenants"]);
        assert_eq!(report.registered, vec!["shared.users", "notes"]);
    }

    #[tokio::test]
    async fn test_failing_step_aborts_remaining_steps() {
        let mut registry = FakeRegistry {
            fail_on_register: Some("shared.users"),
            ..Default::default()
        };

        let err = provision(&mut registry, &SCHEMA_PLAN).await.unwrap_err();

        match err {
            ProvisionError::Step { step, .. } => assert_eq!(step, "distribute shared.users"),
            other => panic!("unexpected error: {other:?}"),
        }
        // notes never reached
        assert!(!registry
            .calls
            .iter()
            .any(|c| matches!(c, Call::Ddl(sql) if sql.contains("CREATE TABLE IF NOT EXISTS notes"))));
    }

    #[tokio::test]
    async fn test_plan_with_colocation_before_target_is_rejected() {
        const BAD: SchemaPlan = SchemaPlan {
            namespaces: &[],
            tables: &[TableSpec {
                table: Note::TABLE,
                ddl: NOTES_DDL,
                distribution: Note::DISTRIBUTION,
            }],
        };

        let mut registry = FakeRegistry::default();
        let err = provision(&mut registry, &BAD).await.unwrap_err();

        assert!(matches!(err, ProvisionError::InvalidPlan(_)));
        assert!(registry.calls.is_empty());
    }

    #[test]
    fn test_colocation_with_reference_table_is_rejected() {
        const BAD: SchemaPlan = SchemaPlan {
            namespaces: &[],
            tables: &[
                TableSpec {
                    table: Tenant::TABLE,
                    ddl: TENANTS_DDL,
                    distribution: Tenant::DISTRIBUTION,
                },
                TableSpec {
                    table: "tenant_settings",
                    ddl: "",
                    distribution: Distribution::ShardedOn {
                        shard_key: "tenant_id",
                        colocate_with: Some(Tenant::TABLE),
                    },
                },
            ],
        };

        assert!(matches!(BAD.validate(), Err(ProvisionError::InvalidPlan(_))));
    }

    #[test]
    fn test_schema_plan_is_valid() {
        assert!(SCHEMA_PLAN.validate().is_ok());
    }

    #[test]
    fn test_ddl_is_idempotent() {
        for spec in SCHEMA_PLAN.tables {
            assert!(spec.ddl.contains("IF NOT EXISTS"), "{} DDL must be idempotent", spec.table);
        }
    }

    #[test]
    fn test_user_ddl_declares_tenant_scoped_constraints() {
        assert!(USERS_DDL.contains("PRIMARY KEY (id, tenant_id)"));
        assert!(USERS_DDL.contains(crate::models::user::USERNAME_CONSTRAINT));
        assert!(USERS_DDL.contains(crate::models::user::EMAIL_CONSTRAINT));
        assert!(TENANTS_DDL.contains(crate::models::tenant::TENANT_NAME_CONSTRAINT));
    }
}
