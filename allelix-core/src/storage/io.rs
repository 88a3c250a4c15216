use std::io::{Read, Write};
use std::path::Path;

use log::info;

use super::Storage;
use crate::errors::StorageResult;
use crate::utils::{get_dynamic_reader, get_dynamic_writer};

impl Storage {
    pub fn to_writer<W: Write>(&self, writer: W) -> StorageResult<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Read a storage document. Transient state (the feature index and the
    /// novel variant queue) starts out empty and is rebuilt on demand.
    pub fn from_reader<R: Read>(reader: R) -> StorageResult<Self> {
        let mut storage: Storage = serde_json::from_reader(reader)?;
        storage.invalidate_feature_index();
        storage.novel_variants.clear();
        Ok(storage)
    }

    /// Write the storage as JSON, gzip compressed if the path ends in `.gz`.
    pub fn save(&self, path: &Path) -> StorageResult<()> {
        let mut writer = get_dynamic_writer(path)?;
        self.to_writer(&mut writer)?;
        writer.flush()?;
        info!("Wrote storage to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> StorageResult<Self> {
        let reader = get_dynamic_reader(path)?;
        let storage = Self::from_reader(reader)?;
        info!(
            "Loaded storage with {} samples and {} features from {}",
            storage.sample_count(),
            storage.features.len(),
            path.display()
        );
        Ok(storage)
    }
}
