use std::{io, path::Path};

use crate::store::{Batch, OrderedStore};

/// A `sled`-backed store: a real embedded, ordered, crash-safe KV engine
/// opened by filesystem path, matching spec §4.B's storage contract.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open(path: &Path) -> io::Result<Self> {
        let db = sled::open(path).map_err(to_io_error)?;
        Ok(Self { db })
    }
}

impl OrderedStore for SledStore {
    fn get(&self, key: &[u8]) -> io::Result<Option<Vec<u8>>> {
        Ok(self.db.get(key).map_err(to_io_error)?.map(|ivec| ivec.to_vec()))
    }

    fn apply_batch(&self, batch: Batch) -> io::Result<()> {
        let mut sled_batch = sled::Batch::default();
        for (key, value) in batch.ops {
            match value {
                Some(val) => sled_batch.insert(key, val),
                None => sled_batch.remove(key),
            }
        }
        self.db.apply_batch(sled_batch).map_err(to_io_error)?;
        self.db.flush().map_err(to_io_error)?;
        Ok(())
    }

    fn range<'a>(&'a self, start: &[u8], end: &[u8]) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a> {
        Box::new(
            self.db
                .range(start.to_vec()..end.to_vec())
                .filter_map(std::result::Result::ok)
                .map(|(k, v)| (k.to_vec(), v.to_vec())),
        )
    }

    fn flush(&self) -> io::Result<()> {
        self.db.flush().map_err(to_io_error)?;
        Ok(())
    }
}

fn to_io_error(err: sled::Error) -> io::Error {
    io::Error::other(err)
}
