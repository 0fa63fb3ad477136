//! A throwaway, pre-formatted filesystem for exercising `efs` end to end.
//!
//! Every [`Fixture`] opens its own `sled` database under a fresh temporary
//! directory, so tests run in parallel without sharing state, and the
//! directory is removed when the fixture drops.

use std::path::PathBuf;

use efs::{mkfs, Config, Credentials, EncryptedFs, Ino, KeySource, SledStore};
use tempfile::TempDir;

/// The all-zero key every fixture opens with. Fixed and well-known on
/// purpose: these databases are throwaway scratch space, never real data.
pub const TEST_KEY: [u8; 32] = [0u8; 32];

/// A freshly `mkfs`'d filesystem, owned by the test that created it.
pub struct Fixture {
    _dir: TempDir,
    pub fs: EncryptedFs<SledStore>,
    pub root: Ino,
    pub root_creds: Credentials,
}

impl Fixture {
    /// Formats and opens a new filesystem, owned by root (uid/gid 0).
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir for test fixture");
        let db_path: PathBuf = dir.path().join("db");
        let config = Config::new(db_path, KeySource::Key(TEST_KEY));
        let fs = mkfs(config, 0, 0, 0).expect("format test filesystem");
        Self { _dir: dir, fs, root: Ino::ROOT, root_creds: Credentials { uid: 0, gid: 0 } }
    }

    /// A non-root identity, useful for permission-denied test cases.
    #[must_use]
    pub fn unprivileged_creds() -> Credentials {
        Credentials { uid: 1000, gid: 1000 }
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_formats_a_root_directory_with_only_synthetic_entries() {
        let fixture = Fixture::new();
        let entries = fixture.fs.readdir(fixture.root, ".", fixture.root_creds).unwrap();
        assert_eq!(entries.len(), 2);
    }
}
