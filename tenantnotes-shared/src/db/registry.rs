/// Sharding control surface
///
/// The provisioner talks to the storage backend only through [`ShardRegistry`],
/// which exposes DDL execution plus the three sharding primitives:
///
/// - `register_reference_table(table)`
/// - `register_distributed_table(table, shard_key)`
/// - `register_distributed_table(table, shard_key, colocate_with)`
///
/// and a metadata lookup telling whether a table is already registered.
///
/// [`CitusRegistry`] implements it on a single PostgreSQL connection with the
/// Citus extension, normally the connection of an open transaction so that the
/// whole provisioning run commits or rolls back together.
///
/// # Example
///
/// ```no_run
/// use tenantnotes_shared::db::registry::{CitusRegistry, ShardRegistry};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let mut tx = pool.begin().await?;
/// let mut registry = CitusRegistry::new(&mut tx);
///
/// if !registry.is_registered("shared.tenants").await? {
///     registry.register_reference_table("shared.tenants").await?;
/// }
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use sqlx::PgConnection;
use tracing::debug;

use crate::models::partition::Distribution;

/// Backend operations needed to lay out partitioned tables
#[async_trait]
pub trait ShardRegistry: Send {
    /// Runs one DDL statement
    async fn execute_ddl(&mut self, sql: &str) -> Result<(), sqlx::Error>;

    /// Whether the table already has sharding metadata
    async fn is_registered(&mut self, table: &str) -> Result<bool, sqlx::Error>;

    /// Replicates the table to every shard
    async fn register_reference_table(&mut self, table: &str) -> Result<(), sqlx::Error>;

    /// Hash-partitions the table on `shard_key`
    ///
    /// With `colocate_with`, the table joins that table's shard group so rows
    /// with equal shard key values land on the same shard.
    async fn register_distributed_table(
        &mut self,
        table: &str,
        shard_key: &str,
        colocate_with: Option<&str>,
    ) -> Result<(), sqlx::Error>;

    /// Registers a table according to its distribution
    async fn register(&mut self, table: &str, distribution: &Distribution) -> Result<(), sqlx::Error> {
        match distribution {
            Distribution::Reference => self.register_reference_table(table).await,
            Distribution::ShardedOn {
                shard_key,
                colocate_with,
            } => {
                self.register_distributed_table(table, shard_key, *colocate_with)
                    .await
            }
        }
    }
}

/// Citus-backed registry bound to one connection
pub struct CitusRegistry<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> CitusRegistry<'c> {
    /// Wraps a connection (or `&mut *transaction`)
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl<'c> ShardRegistry for CitusRegistry<'c> {
    async fn execute_ddl(&mut self, sql: &str) -> Result<(), sqlx::Error> {
        sqlx::query(sql).execute(&mut *self.conn).await?;
        Ok(())
    }

    async fn is_registered(&mut self, table: &str) -> Result<bool, sqlx::Error> {
        let registered: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM pg_dist_partition
                WHERE logicalrelid = to_regclass($1)
            )",
        )
        .bind(table)
        .fetch_one(&mut *self.conn)
        .await?;

        debug!(table, registered, "Checked shard metadata");
        Ok(registered)
    }

    async fn register_reference_table(&mut self, table: &str) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT create_reference_table($1::regclass)")
            .bind(table)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    async fn register_distributed_table(
        &mut self,
        table: &str,
        shard_key: &str,
        colocate_with: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        match colocate_with {
            Some(group) => {
                sqlx::query(
                    "SELECT create_distributed_table($1::regclass, $2, colocate_with => $3)",
                )
                .bind(table)
                .bind(shard_key)
                .bind(group)
                .execute(&mut *self.conn)
                .await?;
            }
            None => {
                sqlx::query("SELECT create_distributed_table($1::regclass, $2)")
                    .bind(table)
                    .bind(shard_key)
                    .execute(&mut *self.conn)
                    .await?;
            }
        }
        Ok(())
    }
}
