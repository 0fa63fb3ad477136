use bitflags::bitflags;

bitflags! {
    /// The access a caller wants to exercise, checked against owner/group/
    /// other permission bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Access: u8 {
        const READ    = 0b100;
        const WRITE   = 0b010;
        const EXECUTE = 0b001;
    }
}

/// The identity a path operation runs as.
#[derive(Debug, Clone, Copy)]
pub struct Credentials {
    pub uid: u32,
    pub gid: u32,
}

impl Credentials {
    #[must_use]
    pub const fn is_root(self) -> bool {
        self.uid == 0
    }
}

/// Checks `mode` (the low 9 bits: owner/group/other, each rwx) against
/// `want`. Root bypasses read/write checks but still needs an execute bit
/// set somewhere in `mode` to traverse a directory or execute a file — spec
/// §4.E's "root bypass for r/w but not x" rule.
#[must_use]
pub fn check(mode: u16, file_uid: u32, file_gid: u32, creds: Credentials, want: Access) -> bool {
    let bits = if creds.uid == file_uid {
        (mode >> 6) & 0b111
    } else if creds.gid == file_gid {
        (mode >> 3) & 0b111
    } else {
        mode & 0b111
    };
    let granted = Access::from_bits_truncate(bits as u8);

    if creds.is_root() {
        let needs_exec = want.contains(Access::EXECUTE);
        let has_any_exec = (mode & 0o111) != 0;
        return !needs_exec || has_any_exec;
    }

    granted.contains(want)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_is_checked_against_the_high_bits() {
        let creds = Credentials { uid: 10, gid: 10 };
        assert!(check(0o600, 10, 10, creds, Access::READ | Access::WRITE));
        assert!(!check(0o600, 10, 10, creds, Access::EXECUTE));
    }

    #[test]
    fn group_falls_back_when_not_owner() {
        let creds = Credentials { uid: 99, gid: 10 };
        assert!(check(0o640, 1, 10, creds, Access::READ));
        assert!(!check(0o640, 1, 10, creds, Access::WRITE));
    }

    #[test]
    fn other_bits_apply_to_everyone_else() {
        let creds = Credentials { uid: 99, gid: 99 };
        assert!(check(0o644, 1, 1, creds, Access::READ));
        assert!(!check(0o644, 1, 1, creds, Access::WRITE));
    }

    #[test]
    fn root_bypasses_read_write_but_still_needs_an_execute_bit() {
        let root = Credentials { uid: 0, gid: 0 };
        assert!(check(0o000, 1, 1, root, Access::READ | Access::WRITE));
        assert!(!check(0o000, 1, 1, root, Access::EXECUTE));
        assert!(check(0o100, 1, 1, root, Access::EXECUTE));
    }
}
