//! Worker-pool interface for offloading AEAD crypto (spec §6).
//!
//! The filesystem facade is single-threaded cooperative; the only
//! concurrency this crate introduces is a data-parallel pool of threads
//! that do nothing but `encrypt`/`decrypt`. There is no shared mutable
//! state across that boundary other than the job queue itself.

use std::{
    sync::Mutex,
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use efs_crypto::MasterKey;

#[derive(Debug, thiserror::Error)]
#[error("worker pool is shut down")]
pub struct WorkerUnavailable;

enum HandleInner<T> {
    Ready(T),
    Pending(Receiver<T>),
}

impl<T> HandleInner<T> {
    fn join(self) -> T {
        match self {
            Self::Ready(v) => v,
            Self::Pending(rx) => rx.recv().expect("crypto worker thread panicked"),
        }
    }
}

/// A pending encryption, ready to be joined for its ciphertext.
pub struct EncryptHandle(HandleInner<Vec<u8>>);

impl EncryptHandle {
    /// Blocks until the ciphertext is ready.
    #[must_use]
    pub fn join(self) -> Vec<u8> {
        self.0.join()
    }
}

/// A pending decryption, ready to be joined for its plaintext (or `None`
/// if authentication failed).
pub struct DecryptHandle(HandleInner<Option<Vec<u8>>>);

impl DecryptHandle {
    /// Blocks until the plaintext (or authentication failure) is ready.
    #[must_use]
    pub fn join(self) -> Option<Vec<u8>> {
        self.0.join()
    }
}

/// The abstract contract is identical whether a call runs on the caller's
/// thread or is dispatched to a background worker.
pub trait CryptoWorker: Send + Sync {
    fn submit_encrypt(&self, key: MasterKey, plain: Vec<u8>) -> Result<EncryptHandle, WorkerUnavailable>;
    fn submit_decrypt(&self, key: MasterKey, cipher: Vec<u8>) -> Result<DecryptHandle, WorkerUnavailable>;
    fn size(&self) -> usize;
    fn shutdown(&self);
}

/// Runs every crypto call synchronously on the caller's thread.
///
/// This is the default: the facade works correctly without ever spinning
/// up a thread.
#[derive(Debug, Default)]
pub struct InlineWorker;

impl CryptoWorker for InlineWorker {
    fn submit_encrypt(&self, key: MasterKey, plain: Vec<u8>) -> Result<EncryptHandle, WorkerUnavailable> {
        Ok(EncryptHandle(HandleInner::Ready(efs_crypto::encrypt(&key, &plain))))
    }

    fn submit_decrypt(&self, key: MasterKey, cipher: Vec<u8>) -> Result<DecryptHandle, WorkerUnavailable> {
        Ok(DecryptHandle(HandleInner::Ready(efs_crypto::decrypt(&key, &cipher))))
    }

    fn size(&self) -> usize {
        0
    }

    fn shutdown(&self) {}
}

enum Job {
    Encrypt {
        key: MasterKey,
        plain: Vec<u8>,
        reply: Sender<Vec<u8>>,
    },
    Decrypt {
        key: MasterKey,
        cipher: Vec<u8>,
        reply: Sender<Option<Vec<u8>>>,
    },
}

/// A fixed-size pool of threads that only ever run `encrypt`/`decrypt`.
///
/// Dispatched jobs are uncancellable once sent; a cancelled caller simply
/// discards the handle and its eventual result (spec §5).
pub struct ThreadPoolWorker {
    size: usize,
    sender: Mutex<Option<Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadPoolWorker {
    /// Spawns `size` worker threads sharing one job queue.
    #[must_use]
    pub fn new(size: usize) -> Self {
        let (tx, rx) = unbounded::<Job>();
        let handles = (0..size.max(1))
            .map(|_| {
                let rx = rx.clone();
                thread::spawn(move || {
                    for job in rx {
                        match job {
                            Job::Encrypt { key, plain, reply } => {
                                let out = efs_crypto::encrypt(&key, &plain);
                                let _ = reply.send(out);
                            }
                            Job::Decrypt { key, cipher, reply } => {
                                let out = efs_crypto::decrypt(&key, &cipher);
                                let _ = reply.send(out);
                            }
                        }
                    }
                    log::trace!("crypto worker thread exiting");
                })
            })
            .collect();

        Self {
            size: size.max(1),
            sender: Mutex::new(Some(tx)),
            handles: Mutex::new(handles),
        }
    }
}

impl CryptoWorker for ThreadPoolWorker {
    fn submit_encrypt(&self, key: MasterKey, plain: Vec<u8>) -> Result<EncryptHandle, WorkerUnavailable> {
        let guard = self.sender.lock().unwrap();
        let sender = guard.as_ref().ok_or(WorkerUnavailable)?;
        let (reply_tx, reply_rx) = bounded(1);
        sender
            .send(Job::Encrypt { key, plain, reply: reply_tx })
            .map_err(|_| WorkerUnavailable)?;
        Ok(EncryptHandle(HandleInner::Pending(reply_rx)))
    }

    fn submit_decrypt(&self, key: MasterKey, cipher: Vec<u8>) -> Result<DecryptHandle, WorkerUnavailable> {
        let guard = self.sender.lock().unwrap();
        let sender = guard.as_ref().ok_or(WorkerUnavailable)?;
        let (reply_tx, reply_rx) = bounded(1);
        sender
            .send(Job::Decrypt { key, cipher, reply: reply_tx })
            .map_err(|_| WorkerUnavailable)?;
        Ok(DecryptHandle(HandleInner::Pending(reply_rx)))
    }

    fn size(&self) -> usize {
        self.size
    }

    fn shutdown(&self) {
        // Dropping the sender closes the channel; worker threads exit their
        // `for job in rx` loop once drained.
        self.sender.lock().unwrap().take();
        for handle in self.handles.lock().unwrap().drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_worker_round_trips() {
        let worker = InlineWorker;
        let key = efs_crypto::MasterKey::from_bytes([0u8; 32]);
        let cipher = worker.submit_encrypt(key.clone(), b"payload".to_vec()).unwrap().join();
        let plain = worker.submit_decrypt(key, cipher).unwrap().join();
        assert_eq!(plain.as_deref(), Some(b"payload".as_slice()));
    }

    #[test]
    fn thread_pool_worker_round_trips_and_shuts_down() {
        let worker = ThreadPoolWorker::new(2);
        assert_eq!(worker.size(), 2);
        let key = efs_crypto::MasterKey::from_bytes([1u8; 32]);

        let mut handles = vec![];
        for i in 0..8u8 {
            let plain = vec![i; 16];
            handles.push((plain.clone(), worker.submit_encrypt(key.clone(), plain).unwrap()));
        }
        for (plain, handle) in handles {
            let cipher = handle.join();
            let decrypted = worker.submit_decrypt(key.clone(), cipher).unwrap().join();
            assert_eq!(decrypted, Some(plain));
        }

        worker.shutdown();
        assert!(worker.submit_encrypt(key, b"too late".to_vec()).is_err());
    }
}
