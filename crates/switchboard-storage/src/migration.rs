//! Schema versions of the primary store

use crate::StorageResult;

pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct SchemaVersion {
    pub version: u32,
    pub description: &'static str,
}

/// Every schema version, oldest first
pub fn get_migrations() -> Vec<SchemaVersion> {
    vec![SchemaVersion {
        version: 1,
        description: "Entities keyed by <type>:<path> with JSON values",
    }]
}

/// Migrations newer than `current`, up to and including `target`, oldest first
pub fn pending(current: u32, target: u32) -> Vec<SchemaVersion> {
    get_migrations()
        .into_iter()
        .filter(|m| m.version > current && m.version <= target)
        .collect()
}

/// Version bookkeeping a store implements to be migrated in place
pub trait Migratable {
    /// Stored schema version, 0 for a fresh store
    fn get_schema_version(&self) -> StorageResult<u32>;

    fn set_schema_version(&self, version: u32) -> StorageResult<()>;

    /// Apply the changes of one schema version
    fn run_migration(&self, version: u32) -> StorageResult<()>;

    fn migrate_to(&self, target_version: u32) -> StorageResult<()> {
        let current = self.get_schema_version()?;
        if current > target_version {
            tracing::warn!(
                "Store is at schema v{}, newer than this build (v{}); leaving it alone",
                current,
                target_version
            );
            return Ok(());
        }

        for migration in pending(current, target_version) {
            tracing::info!("Applying schema v{}: {}", migration.version, migration.description);
            self.run_migration(migration.version)?;
            self.set_schema_version(migration.version)?;
        }
        Ok(())
    }

    fn migrate_to_latest(&self) -> StorageResult<()> {
        self.migrate_to(CURRENT_VERSION)
    }
}
