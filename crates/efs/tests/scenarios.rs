use efs::{Error, OpenFlags};
use efs_testing::Fixture;

fn now() -> i64 {
    1_700_000_000
}

#[test]
fn create_read_file_round_trip() {
    let fixture = Fixture::new();
    fixture.fs.write_file(fixture.root, "/a.txt", b"Test Buffer", 0o644, fixture.root_creds, now()).unwrap();
    let data = fixture.fs.read_file(fixture.root, "/a.txt", fixture.root_creds).unwrap();
    assert_eq!(data, b"Test Buffer");

    let stat = fixture.fs.stat(fixture.root, "/a.txt", fixture.root_creds).unwrap();
    assert_eq!(stat.size, 11);
}

#[test]
fn unlink_while_open_keeps_the_file_alive_until_the_last_close() {
    let fixture = Fixture::new();
    let content = b"Test Buffer for File Descriptor";
    fixture.fs.write_file(fixture.root, "/f", content, 0o644, fixture.root_creds, now()).unwrap();

    // Open two independent descriptors before unlinking so each keeps its
    // own read position afterward.
    let read_fd = fixture.fs.open(fixture.root, "/f", OpenFlags::READ, 0, fixture.root_creds, now()).unwrap();
    let write_fd = fixture.fs.open(fixture.root, "/f", OpenFlags::WRITE, 0, fixture.root_creds, now()).unwrap();

    fixture.fs.unlink(fixture.root, "/f", fixture.root_creds).unwrap();
    assert!(matches!(fixture.fs.stat(fixture.root, "/f", fixture.root_creds), Err(Error::NotFound)));

    let read_back = fixture.fs.read(read_fd, content.len()).unwrap();
    assert_eq!(read_back, content);

    fixture.fs.write(write_fd, b"Nice", now()).unwrap();
    let verify_fd = fixture.fs.open(fixture.root, "/does-not-matter", OpenFlags::READ, 0, fixture.root_creds, now());
    assert!(verify_fd.is_err(), "the name is gone; only the already-open descriptors still work");

    fixture.fs.close(read_fd).unwrap();
    fixture.fs.close(write_fd).unwrap();

    // Now that every descriptor has closed and the name was already gone,
    // the path can never resolve again.
    assert!(matches!(fixture.fs.open(fixture.root, "/f", OpenFlags::READ, 0, fixture.root_creds, now()), Err(Error::NotFound)));
}

#[test]
fn directory_link_counts_include_the_synthetic_entries() {
    let fixture = Fixture::new();
    fixture.fs.mkdir(fixture.root, "/a", 0o755, fixture.root_creds, now()).unwrap();
    fixture.fs.mkdir(fixture.root, "/a/b", 0o755, fixture.root_creds, now()).unwrap();

    let a = fixture.fs.stat(fixture.root, "/a", fixture.root_creds).unwrap();
    let b = fixture.fs.stat(fixture.root, "/a/b", fixture.root_creds).unwrap();
    assert_eq!(a.nlink, 3, "self, its own \".\", and \"b\"'s \"..\"");
    assert_eq!(b.nlink, 2, "self and its own \".\"");
}

#[test]
fn symlink_resolves_and_a_loop_is_rejected() {
    let fixture = Fixture::new();
    fixture.fs.symlink(fixture.root, "a link", "/s", fixture.root_creds, now()).unwrap();
    assert_eq!(fixture.fs.readlink(fixture.root, "/s", fixture.root_creds).unwrap(), "a link");

    fixture.fs.symlink(fixture.root, "/y", "/x", fixture.root_creds, now()).unwrap();
    fixture.fs.symlink(fixture.root, "/x", "/y", fixture.root_creds, now()).unwrap();
    let err = fixture.fs.open(fixture.root, "/x", OpenFlags::READ, 0, fixture.root_creds, now()).unwrap_err();
    assert!(matches!(err, Error::SymlinkLoop));
}

#[test]
fn rename_over_an_existing_file_replaces_it() {
    let fixture = Fixture::new();
    fixture.fs.write_file(fixture.root, "/a", b"A", 0o644, fixture.root_creds, now()).unwrap();
    fixture.fs.write_file(fixture.root, "/b", b"B", 0o644, fixture.root_creds, now()).unwrap();

    fixture.fs.rename(fixture.root, "/a", "/b", fixture.root_creds, now()).unwrap();

    assert_eq!(fixture.fs.read_file(fixture.root, "/b", fixture.root_creds).unwrap(), b"A");
    assert!(matches!(fixture.fs.stat(fixture.root, "/a", fixture.root_creds), Err(Error::NotFound)));
}

#[test]
fn dup_descriptors_advance_their_own_position_independently() {
    let fixture = Fixture::new();
    fixture.fs.write_file(fixture.root, "/f", b"0123456789", 0o644, fixture.root_creds, now()).unwrap();

    let fd = fixture.fs.open(fixture.root, "/f", OpenFlags::READ, 0, fixture.root_creds, now()).unwrap();
    let first = fixture.fs.read(fd, 4).unwrap();
    assert_eq!(first, b"0123");

    let dup_fd = fixture.fs.dup(fd).unwrap();
    let second_via_original = fixture.fs.read(fd, 4).unwrap();
    assert_eq!(second_via_original, b"4567");

    // The dup was taken after four bytes were already consumed, so it shares
    // that starting position, not position zero.
    let via_dup = fixture.fs.read(dup_fd, 4).unwrap();
    assert_eq!(via_dup, b"4567");
}

#[test]
fn permission_denied_when_writing_without_write_access() {
    let fixture = Fixture::new();
    fixture.fs.write_file(fixture.root, "/owned", b"secret", 0o600, fixture.root_creds, now()).unwrap();

    let stranger = Fixture::unprivileged_creds();
    let err = fixture.fs.open(fixture.root, "/owned", OpenFlags::WRITE, 0, stranger, now()).unwrap_err();
    assert!(matches!(err, Error::PermissionDenied));
}
