use std::{
    collections::{BTreeSet, HashSet},
    sync::{Condvar, Mutex},
};

/// Grants all-or-nothing possession of a set of numeric lock ids (inode
/// numbers, in practice). A transaction either holds its whole declared set
/// or none of it, so the "acquire in ascending order" discipline spec §5
/// describes is enforced for free: partial acquisition, and therefore
/// ordering-dependent deadlock, can never happen.
#[derive(Default)]
pub struct LockRegistry {
    held: Mutex<HashSet<u64>>,
    freed: Condvar,
}

impl LockRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, ids: &BTreeSet<u64>) -> LockGuard<'_> {
        let mut held = self.held.lock().unwrap();
        while ids.iter().any(|id| held.contains(id)) {
            held = self.freed.wait(held).unwrap();
        }
        held.extend(ids.iter().copied());
        drop(held);
        LockGuard { registry: self, ids: ids.clone() }
    }
}

pub struct LockGuard<'a> {
    registry: &'a LockRegistry,
    ids: BTreeSet<u64>,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.registry.held.lock().unwrap();
        for id in &self.ids {
            held.remove(id);
        }
        drop(held);
        self.registry.freed.notify_all();
    }
}
