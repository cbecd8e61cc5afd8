//! Shared entity metadata and the entity capability
//!
//! Every stored type embeds a [`Metadata`] value rather than inheriting from a
//! base type. The repository only needs the identifier and version from it;
//! the timestamps are maintained by [`Entity::before_save`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::RepositoryOperation;
use super::traits::RepositoryResult;
use crate::ids::new_entity_id;

/// Identifier, timestamps and optimistic version shared by every entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Metadata {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl Metadata {
    /// Fill in whatever a new row is missing: id, timestamps and version 1
    pub fn prepare_insert(&mut self, now: DateTime<Utc>) {
        if self.id.is_empty() {
            self.id = new_entity_id();
        }
        self.created_at.get_or_insert(now);
        self.updated_at = Some(now);
        if self.version <= 0 {
            self.version = 1;
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }

    /// Advance the version before an update
    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    pub fn is_new(&self) -> bool {
        self.id.is_empty()
    }
}

/// A type the generic repository can store
pub trait Entity: Send + Sync + Sized + 'static {
    /// Name used in errors and logs
    const NAME: &'static str;

    fn metadata(&self) -> &Metadata;

    fn metadata_mut(&mut self) -> &mut Metadata;

    fn id(&self) -> &str {
        &self.metadata().id
    }

    fn version(&self) -> i64 {
        self.metadata().version
    }

    /// Pre-save hook run by `create` and `update` before the store is called.
    ///
    /// Types owning nested rows override this to prepare them too.
    fn before_save(&mut self, operation: RepositoryOperation) -> RepositoryResult<()> {
        let now = Utc::now();
        match operation {
            RepositoryOperation::Create => self.metadata_mut().prepare_insert(now),
            _ => self.metadata_mut().touch(now),
        }
        Ok(())
    }
}
