/// Partition key model
///
/// Declares, for every entity, where its rows live in the sharded cluster and
/// which column routes them. This module performs no I/O; the schema
/// provisioner reads these declarations to register tables with the backend.
///
/// # Layout
///
/// ```text
/// shared.tenants  Reference                          (copy on every shard)
/// shared.users    ShardedOn(tenant_id)               (shard group of users)
/// notes           ShardedOn(owner_user_id, colocate_with = shared.users)
/// ```
///
/// A note is always placed in the same shard group as `shared.users`, so
/// listing one user's notes never fans out across shards.
///
/// # Example
///
/// ```
/// use tenantnotes_shared::models::partition::Partitioned;
/// use tenantnotes_shared::models::{note::Note, user::User};
///
/// assert_eq!(User::DISTRIBUTION.shard_key(), Some("tenant_id"));
/// assert_eq!(Note::DISTRIBUTION.colocated_with(), Some(User::TABLE));
/// ```

use serde::Serialize;

/// Namespace holding entities shared across the whole cluster
pub const SHARED_SCHEMA: &str = "shared";

/// How a table is laid out across shards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    /// Full copy on every shard
    Reference,

    /// Hash-partitioned on `shard_key`
    ShardedOn {
        /// Column whose value selects the shard
        shard_key: &'static str,

        /// Table whose shard group this table must join
        colocate_with: Option<&'static str>,
    },
}

impl Distribution {
    /// Routing column, `None` for reference tables
    pub fn shard_key(&self) -> Option<&'static str> {
        match self {
            Distribution::Reference => None,
            Distribution::ShardedOn { shard_key, .. } => Some(*shard_key),
        }
    }

    /// Table this one is co-located with, if any
    pub fn colocated_with(&self) -> Option<&'static str> {
        match self {
            Distribution::Reference => None,
            Distribution::ShardedOn { colocate_with, .. } => *colocate_with,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Distribution::Reference)
    }
}

/// An entity stored in a partitioned table
///
/// `TABLE` is the fully qualified table name as the backend's sharding
/// functions expect it.
pub trait Partitioned {
    const TABLE: &'static str;
    const DISTRIBUTION: Distribution;
}

/// Looks up the routing column of an entity
///
/// Returns `None` for entities replicated to every shard.
pub fn shard_key_of<T: Partitioned>() -> Option<&'static str> {
    T::DISTRIBUTION.shard_key()
}
