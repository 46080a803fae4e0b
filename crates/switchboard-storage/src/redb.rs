//! ReDB entity store

use crate::error::{StorageError, StorageResult};
use crate::migration::Migratable;
use crate::traits::EntityStore;
use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use switchboard_core::{Entity, EntityType};

// Table definitions
const ENTITIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entities");
const META: TableDefinition<&str, u32> = TableDefinition::new("meta");

const SCHEMA_VERSION_KEY: &str = "schema_version";

/// ReDB entity store
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create a ReDB database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path.as_ref())?;
        let store = Self { db };
        store.create_tables()?;
        store.migrate_to_latest()?;
        tracing::debug!("Opened entity store at {:?}", path.as_ref());
        Ok(store)
    }

    fn create_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            write_txn.open_table(ENTITIES)?;
            write_txn.open_table(META)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn make_entity_key(entity_type: EntityType, path: &str) -> String {
        format!("{}:{}", entity_type, path)
    }
}

impl Migratable for RedbStore {
    fn get_schema_version(&self) -> StorageResult<u32> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(META)?;
        Ok(table
            .get(SCHEMA_VERSION_KEY)?
            .map(|v| v.value())
            .unwrap_or(0))
    }

    fn set_schema_version(&self, version: u32) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(META)?;
            table.insert(SCHEMA_VERSION_KEY, version)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn run_migration(&self, version: u32) -> StorageResult<()> {
        match version {
            // Tables are created on open
            1 => Ok(()),
            other => Err(StorageError::Migration(format!(
                "no migration defined for schema version {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl EntityStore for RedbStore {
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        Ok(self.db.begin_read().is_ok())
    }

    async fn save_entity(&self, entity: &Entity) -> StorageResult<()> {
        let key = Self::make_entity_key(entity.entity_type(), &entity.path);
        let value = serde_json::to_vec(entity)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ENTITIES)?;
            table.insert(key.as_str(), value.as_slice())?;
        }
        write_txn.commit()?;

        Ok(())
    }

    async fn get_entity(&self, entity_type: EntityType, path: &str) -> StorageResult<Option<Entity>> {
        let key = Self::make_entity_key(entity_type, path);

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTITIES)?;

        if let Some(value) = table.get(key.as_str())? {
            let entity: Entity = serde_json::from_slice(value.value())?;
            Ok(Some(entity))
        } else {
            Ok(None)
        }
    }

    async fn list_entities(&self, entity_type: Option<EntityType>) -> StorageResult<Vec<Entity>> {
        let prefix = entity_type.map(|t| format!("{}:", t));

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTITIES)?;

        let mut entities = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            if let Some(ref prefix) = prefix {
                if !key.value().starts_with(prefix.as_str()) {
                    continue;
                }
            }
            let entity: Entity = serde_json::from_slice(value.value())?;
            entities.push(entity);
        }

        Ok(entities)
    }

    async fn delete_entity(&self, entity_type: EntityType, path: &str) -> StorageResult<bool> {
        let key = Self::make_entity_key(entity_type, path);

        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(ENTITIES)?;
            let removed = table.remove(key.as_str())?;
            removed.is_some()
        };
        write_txn.commit()?;

        Ok(existed)
    }
}
