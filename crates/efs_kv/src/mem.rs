use std::{collections::BTreeMap, io, sync::Mutex};

use crate::store::{Batch, OrderedStore};

/// An in-memory `BTreeMap`-backed store. Used by tests and by any caller
/// that doesn't need real persistence.
#[derive(Default)]
pub struct MemStore {
    map: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemStore {
    #[must_use]
    pub fn open() -> Self {
        Self::default()
    }
}

impl OrderedStore for MemStore {
    fn get(&self, key: &[u8]) -> io::Result<Option<Vec<u8>>> {
        Ok(self.map.lock().unwrap().get(key).cloned())
    }

    fn apply_batch(&self, batch: Batch) -> io::Result<()> {
        let mut map = self.map.lock().unwrap();
        for (key, value) in batch.ops {
            match value {
                Some(val) => {
                    map.insert(key, val);
                }
                None => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn range<'a>(&'a self, start: &[u8], end: &[u8]) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a> {
        let map = self.map.lock().unwrap();
        let items: Vec<_> = map.range(start.to_vec()..end.to_vec()).map(|(k, v)| (k.clone(), v.clone())).collect();
        Box::new(items.into_iter())
    }

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}
