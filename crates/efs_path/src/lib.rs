//! Path walking and permission checks (spec §4.E).
//!
//! This crate knows nothing about how inodes are stored — it resolves
//! paths against whatever implements [`NameResolver`], the same pattern
//! `efs_kv::OrderedStore` uses for the storage engine underneath it. The
//! facade crate implements `NameResolver` over an open `efs_inode`
//! transaction.

mod permission;

pub use permission::{Access, Credentials, check as check_permission};

use efs_inode::{Ino, Kind};

/// The maximum number of symlinks followed while resolving one path before
/// giving up and reporting [`Error::SymlinkLoop`].
pub const SYMLINK_HOP_LIMIT: u32 = 40;

/// Maximum bytes in a single path component.
pub const NAME_MAX: usize = 255;

#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    #[error("no such file or directory")]
    NotFound,
    #[error("not a directory")]
    NotADirectory,
    #[error("too many levels of symbolic links")]
    SymlinkLoop,
    #[error("permission denied")]
    PermissionDenied,
    #[error("path component too long")]
    NameTooLong,
    #[error(transparent)]
    Resolver(#[from] E),
}

/// What the path walker needs from whatever backs the namespace.
pub trait NameResolver {
    type Error: std::error::Error;

    fn lookup(&mut self, parent: Ino, name: &str) -> Result<Option<(Ino, Kind)>, Self::Error>;
    fn readlink(&mut self, ino: Ino) -> Result<String, Self::Error>;
    /// `(mode, uid, gid)` for a permission check against `ino`.
    fn owner_mode(&mut self, ino: Ino) -> Result<(u16, u32, u32), Self::Error>;
}

/// Resolves `path` starting at `start` (the root for an absolute path, the
/// caller's cwd for a relative one), following symlinks up to
/// [`SYMLINK_HOP_LIMIT`] times, and requiring execute permission on every
/// directory traversed along the way.
pub fn walk<R: NameResolver>(resolver: &mut R, root: Ino, start: Ino, path: &str, creds: Credentials) -> Result<Ino, Error<R::Error>> {
    let mut hops = 0u32;
    walk_inner(resolver, root, start, path, creds, &mut hops)
}

/// Does the actual work of [`walk`], threading `hops` through every
/// recursive symlink follow so the limit accumulates across the whole
/// resolution instead of resetting each time a new frame is entered.
fn walk_inner<R: NameResolver>(resolver: &mut R, root: Ino, start: Ino, path: &str, creds: Credentials, hops: &mut u32) -> Result<Ino, Error<R::Error>> {
    let mut current = if path.starts_with('/') { root } else { start };
    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();

    let mut index = 0;
    while index < components.len() {
        let name = components[index];
        if name.len() > NAME_MAX {
            return Err(Error::NameTooLong);
        }

        let (mode, uid, gid) = resolver.owner_mode(current)?;
        if !check_permission(mode, uid, gid, creds, Access::EXECUTE) {
            return Err(Error::PermissionDenied);
        }

        let Some((next, kind)) = resolver.lookup(current, name)? else {
            return Err(Error::NotFound);
        };

        let is_last = index == components.len() - 1;
        if kind == Kind::Symlink {
            *hops += 1;
            if *hops > SYMLINK_HOP_LIMIT {
                return Err(Error::SymlinkLoop);
            }
            let target = resolver.readlink(next)?;
            let target_root = if target.starts_with('/') { root } else { current };
            let resolved = walk_inner(resolver, root, target_root, &target, creds, hops)?;
            if is_last {
                return Ok(resolved);
            }
            current = resolved;
            index += 1;
            continue;
        }

        if !is_last && kind != Kind::Directory {
            return Err(Error::NotADirectory);
        }

        current = next;
        index += 1;
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("no such test entry")]
    struct TestError;

    struct Fake {
        entries: HashMap<(Ino, &'static str), (Ino, Kind)>,
        modes: HashMap<Ino, (u16, u32, u32)>,
        links: HashMap<Ino, String>,
    }

    impl NameResolver for Fake {
        type Error = TestError;

        fn lookup(&mut self, parent: Ino, name: &str) -> Result<Option<(Ino, Kind)>, Self::Error> {
            Ok(self.entries.iter().find(|((p, n), _)| *p == parent && *n == name).map(|(_, v)| *v))
        }

        fn readlink(&mut self, ino: Ino) -> Result<String, Self::Error> {
            self.links.get(&ino).cloned().ok_or(TestError)
        }

        fn owner_mode(&mut self, ino: Ino) -> Result<(u16, u32, u32), Self::Error> {
            self.modes.get(&ino).copied().ok_or(TestError)
        }
    }

    fn fixture() -> Fake {
        let root = Ino(1);
        let etc = Ino(2);
        let passwd = Ino(3);
        let link = Ino(4);

        let mut entries = HashMap::new();
        entries.insert((root, "etc"), (etc, Kind::Directory));
        entries.insert((etc, "passwd"), (passwd, Kind::File));
        entries.insert((root, "shortcut"), (link, Kind::Symlink));

        let mut modes = HashMap::new();
        modes.insert(root, (0o755, 0, 0));
        modes.insert(etc, (0o755, 0, 0));
        modes.insert(passwd, (0o644, 0, 0));
        modes.insert(link, (0o777, 0, 0));

        let mut links = HashMap::new();
        links.insert(link, "/etc/passwd".to_owned());

        Fake { entries, modes, links }
    }

    fn creds() -> Credentials {
        Credentials { uid: 1000, gid: 1000 }
    }

    #[test]
    fn resolves_a_plain_absolute_path() {
        let mut fake = fixture();
        let ino = walk(&mut fake, Ino(1), Ino(1), "/etc/passwd", creds()).unwrap();
        assert_eq!(ino, Ino(3));
    }

    #[test]
    fn missing_component_is_not_found() {
        let mut fake = fixture();
        let err = walk(&mut fake, Ino(1), Ino(1), "/etc/shadow", creds()).unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[test]
    fn walking_through_a_file_is_not_a_directory() {
        let mut fake = fixture();
        let err = walk(&mut fake, Ino(1), Ino(1), "/etc/passwd/oops", creds()).unwrap_err();
        assert!(matches!(err, Error::NotADirectory));
    }

    #[test]
    fn symlink_in_the_middle_resolves_transparently() {
        let mut fake = fixture();
        let ino = walk(&mut fake, Ino(1), Ino(1), "/shortcut", creds()).unwrap();
        assert_eq!(ino, Ino(3));
    }

    #[test]
    fn self_referential_symlink_hits_the_hop_limit() {
        let root = Ino(1);
        let looper = Ino(5);
        let mut entries = HashMap::new();
        entries.insert((root, "loop"), (looper, Kind::Symlink));
        let mut modes = HashMap::new();
        modes.insert(root, (0o755, 0, 0));
        modes.insert(looper, (0o777, 0, 0));
        let mut links = HashMap::new();
        links.insert(looper, "/loop".to_owned());
        let mut fake = Fake { entries, modes, links };

        let err = walk(&mut fake, root, root, "/loop", creds()).unwrap_err();
        assert!(matches!(err, Error::SymlinkLoop));
    }

    #[test]
    fn missing_execute_permission_on_a_traversed_directory_is_denied() {
        let mut fake = fixture();
        fake.modes.insert(Ino(2), (0o700, 5, 5));
        let err = walk(&mut fake, Ino(1), Ino(1), "/etc/passwd", creds()).unwrap_err();
        assert!(matches!(err, Error::PermissionDenied));
    }
}
