use std::{
    collections::BTreeMap,
    collections::BTreeSet,
    sync::Arc,
};

use efs_crypto::MasterKey;
use efs_worker::{CryptoWorker, InlineWorker};

use crate::{
    error::Error,
    locks::LockRegistry,
    store::{Batch, OrderedStore},
};

/// Wraps an [`OrderedStore`] with transparent AEAD encryption of every
/// value and a transaction layer providing atomic multi-key commits with
/// ascending-order locking (spec §4.B, §5).
pub struct EncryptedStore<S: OrderedStore> {
    inner: S,
    key: MasterKey,
    worker: Arc<dyn CryptoWorker>,
    locks: LockRegistry,
}

impl<S: OrderedStore> EncryptedStore<S> {
    pub fn new(inner: S, key: MasterKey) -> Self {
        Self::with_worker(inner, key, Arc::new(InlineWorker))
    }

    pub fn with_worker(inner: S, key: MasterKey, worker: Arc<dyn CryptoWorker>) -> Self {
        Self { inner, key, worker, locks: LockRegistry::new() }
    }

    /// Looks up `key`. A missing key is `Ok(None)`; a present key whose
    /// ciphertext fails to authenticate under the configured master key is
    /// [`Error::Corruption`] — the two cases are never conflated.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let Some(cipher) = self.inner.get(key)? else {
            return Ok(None);
        };
        self.decrypt_value(key, cipher).map(Some)
    }

    /// Encrypts and writes `key` as an immediate, single-entry batch.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<(), Error> {
        let cipher = self.encrypt_value(value)?;
        let mut batch = Batch::new();
        batch.put(key.to_vec(), cipher);
        self.inner.apply_batch(batch)?;
        Ok(())
    }

    pub fn del(&self, key: &[u8]) -> Result<(), Error> {
        let mut batch = Batch::new();
        batch.delete(key.to_vec());
        self.inner.apply_batch(batch)?;
        Ok(())
    }

    /// Lazily decrypts `[start, end)` in ascending key order.
    pub fn range<'a>(&'a self, start: &[u8], end: &[u8]) -> impl Iterator<Item = Result<(Vec<u8>, Vec<u8>), Error>> + 'a {
        self.inner.range(start, end).map(move |(key, cipher)| {
            let plain = self.decrypt_value(&key, cipher)?;
            Ok((key, plain))
        })
    }

    /// Runs `body` under possession of every id in `lock_ids`, held
    /// all-or-nothing for the duration of the call. On `Ok`, buffered writes
    /// commit as one atomic batch and the success hooks run; on `Err`
    /// nothing is written and the failure hooks run instead.
    pub fn transact<T, E>(&self, lock_ids: &[u64], body: impl FnOnce(&mut Tx<'_, S>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<Error>,
    {
        let ids: BTreeSet<u64> = lock_ids.iter().copied().collect();
        let _guard = self.locks.acquire(&ids);

        let mut tx = Tx { store: self, lock_ids: ids, pending: BTreeMap::new(), success_hooks: Vec::new(), failure_hooks: Vec::new() };

        match body(&mut tx) {
            Ok(value) => {
                self.commit(tx.pending)?;
                for hook in tx.success_hooks {
                    hook();
                }
                Ok(value)
            }
            Err(err) => {
                for hook in tx.failure_hooks {
                    hook();
                }
                Err(err)
            }
        }
    }

    fn commit(&self, pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>) -> Result<(), Error> {
        let mut batch = Batch::new();
        for (key, value) in pending {
            match value {
                Some(plain) => batch.put(key, self.encrypt_value(&plain)?),
                None => batch.delete(key),
            }
        }
        if !batch.is_empty() {
            self.inner.apply_batch(batch)?;
        }
        Ok(())
    }

    fn encrypt_value(&self, plain: &[u8]) -> Result<Vec<u8>, Error> {
        Ok(self
            .worker
            .submit_encrypt(self.key.clone(), plain.to_vec())
            .map_err(|_| Error::WorkerUnavailable)?
            .join())
    }

    fn decrypt_value(&self, key: &[u8], cipher: Vec<u8>) -> Result<Vec<u8>, Error> {
        self.worker
            .submit_decrypt(self.key.clone(), cipher)
            .map_err(|_| Error::WorkerUnavailable)?
            .join()
            .ok_or_else(|| Error::Corruption { key: key.to_vec() })
    }
}

/// A transaction's view over its [`EncryptedStore`]: reads see its own
/// buffered writes before falling through to committed state, and nothing
/// written through it is visible to anyone else until it returns `Ok`.
pub struct Tx<'a, S: OrderedStore> {
    store: &'a EncryptedStore<S>,
    lock_ids: BTreeSet<u64>,
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    success_hooks: Vec<Box<dyn FnOnce() + 'a>>,
    failure_hooks: Vec<Box<dyn FnOnce() + 'a>>,
}

impl<'a, S: OrderedStore> Tx<'a, S> {
    /// Confirms `lock_id` is within this transaction's declared lock set.
    /// Callers (the inode manager, in practice) check this before touching
    /// any inode-keyed data so that a transaction can never silently read or
    /// write outside the locks it acquired.
    pub fn ensure_locked(&self, lock_id: u64) -> Result<(), Error> {
        if self.lock_ids.contains(&lock_id) {
            Ok(())
        } else {
            Err(Error::TransactionConflict)
        }
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        if let Some(buffered) = self.pending.get(key) {
            return Ok(buffered.clone());
        }
        self.store.get(key)
    }

    /// Admits `lock_id` into this transaction's declared set without taking
    /// the registry lock for it.
    ///
    /// Sound only for an id no other transaction could have observed before
    /// this call — in practice, an inode number this transaction itself
    /// just minted while already holding the superblock lock that guards
    /// allocation. Using it for anything else reopens the race the lock
    /// registry exists to prevent.
    pub fn adopt_fresh_lock(&mut self, lock_id: u64) {
        self.lock_ids.insert(lock_id);
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.pending.insert(key.into(), Some(value.into()));
    }

    pub fn del(&mut self, key: impl Into<Vec<u8>>) {
        self.pending.insert(key.into(), None);
    }

    /// `[start, end)` merging this transaction's buffered writes over the
    /// committed state: pending puts shadow stored values, pending deletes
    /// suppress them, and keys touched only in the store pass through.
    pub fn range(&self, start: &[u8], end: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Error> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        for item in self.store.range(start, end) {
            let (key, value) = item?;
            merged.insert(key, value);
        }
        for (key, value) in self.pending.range(start.to_vec()..end.to_vec()) {
            match value {
                Some(val) => {
                    merged.insert(key.clone(), val.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    pub fn queue_success(&mut self, hook: impl FnOnce() + 'a) {
        self.success_hooks.push(Box::new(hook));
    }

    pub fn queue_failure(&mut self, hook: impl FnOnce() + 'a) {
        self.failure_hooks.push(Box::new(hook));
    }

    /// The buffered writes not yet committed. Exposed for test introspection.
    #[must_use]
    pub fn ops(&self) -> &BTreeMap<Vec<u8>, Option<Vec<u8>>> {
        &self.pending
    }
}
