//! Encrypted, ordered key/value substrate (spec §4.B).
//!
//! [`OrderedStore`] is the bare ordering/batch contract; [`EncryptedStore`]
//! layers AEAD encryption and transactional locking on top of it. Two
//! concrete stores are provided: [`MemStore`] for tests and ephemeral use,
//! and [`SledStore`] for real persistence.

mod encrypted;
mod error;
mod locks;
mod mem;
mod sled_store;
mod store;

pub use encrypted::{EncryptedStore, Tx};
pub use error::Error;
pub use mem::MemStore;
pub use sled_store::SledStore;
pub use store::{Batch, OrderedStore};
