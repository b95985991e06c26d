use crate::{db::DB, errors::StoreError, writer::DbWriter};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};

/// A single-key DB item with a read-through cache
pub struct CachedDbItem<'a, T> {
    db: &'a DB,
    key: Vec<u8>,
    cached_item: RwLock<Option<T>>,
}

impl<'a, T> CachedDbItem<'a, T> {
    pub fn new(db: &'a DB, key: impl Into<Vec<u8>>) -> Self {
        Self { db, key: key.into(), cached_item: RwLock::new(None) }
    }

    pub fn read(&self) -> Result<T, StoreError>
    where
        T: Clone + DeserializeOwned,
    {
        if let Some(item) = self.cached_item.read().clone() {
            return Ok(item);
        }
        if let Some(slice) = self.db.get_pinned(&self.key)? {
            let item: T = bincode::deserialize(&slice)?;
            *self.cached_item.write() = Some(item.clone());
            Ok(item)
        } else {
            Err(StoreError::KeyNotFound(String::from_utf8_lossy(&self.key).into_owned()))
        }
    }

    pub fn write(&self, mut writer: impl DbWriter, item: &T) -> Result<(), StoreError>
    where
        T: Clone + Serialize,
    {
        let bin_data = bincode::serialize(item)?;
        writer.put(&self.key, bin_data)?;
        *self.cached_item.write() = Some(item.clone());
        Ok(())
    }

    pub fn remove(&self, mut writer: impl DbWriter) -> Result<(), StoreError> {
        writer.delete(&self.key)?;
        *self.cached_item.write() = None;
        Ok(())
    }
}
