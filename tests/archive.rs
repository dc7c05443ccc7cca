use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use stagezip::{Error, ZipContext};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

enum Item<'a> {
    File(&'a str, &'a [u8], CompressionMethod),
    Dir(&'a str),
}

fn write_zip(path: &Path, items: &[Item]) {
    let file = File::create(path).expect("Failed to create fixture zip");
    let mut writer = zip::ZipWriter::new(file);
    for item in items {
        match item {
            Item::File(name, data, method) => {
                let options = SimpleFileOptions::default().compression_method(*method);
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
            Item::Dir(name) => {
                writer
                    .add_directory(*name, SimpleFileOptions::default())
                    .unwrap();
            }
        }
    }
    writer.finish().unwrap();
}

/// One STORED entry whose central record declares `declared` bytes through
/// a ZIP64 extra field while the archive only holds `data`.
fn zip64_oversized_entry(name: &str, declared: u64, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();

    // Local file header
    out.extend_from_slice(b"PK\x03\x04");
    out.extend_from_slice(&20u16.to_le_bytes()); // version needed
    out.extend_from_slice(&0u16.to_le_bytes()); // flags
    out.extend_from_slice(&0u16.to_le_bytes()); // stored
    out.extend_from_slice(&0u32.to_le_bytes()); // time, date
    out.extend_from_slice(&0u32.to_le_bytes()); // crc32
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(data);

    let cd_offset = out.len() as u32;
    out.extend_from_slice(b"PK\x01\x02");
    out.extend_from_slice(&45u16.to_le_bytes()); // version made by
    out.extend_from_slice(&45u16.to_le_bytes()); // version needed
    out.extend_from_slice(&0u16.to_le_bytes()); // flags
    out.extend_from_slice(&0u16.to_le_bytes()); // stored
    out.extend_from_slice(&0u32.to_le_bytes()); // time, date
    out.extend_from_slice(&0u32.to_le_bytes()); // crc32
    out.extend_from_slice(&u32::MAX.to_le_bytes()); // compressed size
    out.extend_from_slice(&u32::MAX.to_le_bytes()); // uncompressed size
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    out.extend_from_slice(&20u16.to_le_bytes()); // extra length
    out.extend_from_slice(&0u16.to_le_bytes()); // comment length
    out.extend_from_slice(&0u16.to_le_bytes()); // disk number
    out.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
    out.extend_from_slice(&0u32.to_le_bytes()); // external attrs
    out.extend_from_slice(&0u32.to_le_bytes()); // local header offset
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // zip64 extra
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(&declared.to_le_bytes());
    out.extend_from_slice(&(data.len() as u64).to_le_bytes());
    let cd_size = out.len() as u32 - cd_offset;

    out.extend_from_slice(b"PK\x05\x06");
    out.extend_from_slice(&0u16.to_le_bytes()); // disk number
    out.extend_from_slice(&0u16.to_le_bytes()); // cd disk
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&cd_size.to_le_bytes());
    out.extend_from_slice(&cd_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

struct Fixture {
    dir: tempfile::TempDir,
    ctx: ZipContext,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::Builder::new()
            .prefix("stagezip-test-")
            .tempdir()
            .expect("Failed to create temp dir");
        let ctx = ZipContext::with_staging_dir(dir.path().join("staging"));
        Self { dir, ctx }
    }

    fn zip(&self, name: &str, items: &[Item]) -> PathBuf {
        let path = self.dir.path().join(name);
        write_zip(&path, items);
        path
    }
}

#[test]
fn lists_entries_in_archive_order() {
    let fx = Fixture::new();
    let path = fx.zip(
        "mixed.zip",
        &[
            Item::File("a/b.txt", b"hello", CompressionMethod::Deflated),
            Item::Dir("a/"),
            Item::File("c.d64", b"disk", CompressionMethod::Stored),
        ],
    );

    let session = fx.ctx.open(&path).unwrap();
    let entries = session.list_entries().unwrap();

    let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["a/b.txt", "a/", "c.d64"]);
    assert!(!entries[0].is_directory);
    assert!(entries[1].is_directory);
    assert!(!entries[2].is_directory);
    assert_eq!(entries[2].uncompressed_size, 4);
    assert_eq!(entries[2].compressed_size, 4);

    assert!(session.entry_exists("c.d64"));
    assert!(!session.entry_exists("missing.x"));

    session.close();
    assert!(!session.entry_exists("c.d64"));
    assert!(!session.entry_exists("missing.x"));
}

#[test]
fn extension_check_is_case_insensitive() {
    let fx = Fixture::new();
    let items = [Item::File("game.prg", b"\x01\x08", CompressionMethod::Stored)];
    for name in ["upper.ZIP", "mixed.Zip", "lower.zip"] {
        let path = fx.zip(name, &items);
        assert!(stagezip::is_archive(&path));
        let session = fx.ctx.open(&path).unwrap();
        assert!(session.entry_exists("game.prg"));
    }
}

#[test]
fn non_zip_and_corrupt_files_fail_to_open() {
    let fx = Fixture::new();

    let image = fx.dir.path().join("game.d64");
    std::fs::write(&image, b"disk").unwrap();
    assert!(matches!(fx.ctx.open(&image), Err(Error::NotAnArchive(_))));

    let corrupt = fx.dir.path().join("corrupt.zip");
    std::fs::write(&corrupt, b"PK\x03\x04 this is not really a zip").unwrap();
    assert!(matches!(fx.ctx.open(&corrupt), Err(Error::OpenFailed { .. })));

    assert!(matches!(
        fx.ctx.open(fx.dir.path().join("missing.zip")),
        Err(Error::OpenFailed { .. })
    ));
    assert_eq!(fx.ctx.open_session_count(), 0);
}

#[test]
fn oversized_zip64_entry_fails_without_preallocating() {
    let fx = Fixture::new();
    let path = fx.dir.path().join("huge.zip");
    std::fs::write(&path, zip64_oversized_entry("game.d64", 1 << 62, b"abc")).unwrap();

    let session = fx.ctx.open(&path).unwrap();
    let entry = session.entry("game.d64").unwrap();
    assert_eq!(entry.uncompressed_size, 1 << 62);
    assert_eq!(entry.compressed_size, 3);

    match session.extract_to_memory("game.d64") {
        Err(Error::ReadTruncated {
            expected, actual, ..
        }) => {
            assert_eq!(expected, 1 << 62);
            assert_eq!(actual, 3);
        }
        other => panic!("expected ReadTruncated, got {other:?}"),
    }
    session.close();

    assert!(matches!(
        fx.ctx.extract_payload_to_temp(&path, None),
        Err(Error::ReadTruncated { .. })
    ));
    assert_eq!(fx.ctx.open_session_count(), 0);
}

#[test]
fn memory_and_staged_bytes_match() {
    let fx = Fixture::new();
    let image: Vec<u8> = (0..4096u32).map(|i| (i * 7 % 251) as u8).collect();
    let path = fx.zip(
        "game.zip",
        &[
            Item::File("disks/game.d64", &image, CompressionMethod::Deflated),
            Item::File("raw.prg", b"\x01\x08\x0b\x08", CompressionMethod::Stored),
        ],
    );

    let session = fx.ctx.open(&path).unwrap();
    let in_memory = session.extract_to_memory("disks/game.d64").unwrap();
    assert_eq!(in_memory, image);

    let staged = session.extract_to_temp_file("disks/game.d64").unwrap();
    assert!(staged.starts_with(fx.ctx.staging_dir()));
    assert_eq!(std::fs::read(&staged).unwrap(), in_memory);

    let again = session.extract_to_temp_file("disks/game.d64").unwrap();
    assert_ne!(staged, again);

    assert_eq!(
        session.extract_to_memory("raw.prg").unwrap(),
        b"\x01\x08\x0b\x08"
    );
}

#[test]
fn finds_payload_by_extension() {
    let fx = Fixture::new();
    let path = fx.zip(
        "bundle.zip",
        &[
            Item::File("readme.txt", b"read me", CompressionMethod::Deflated),
            Item::File("game.d64", b"disk", CompressionMethod::Stored),
            Item::File("game.crt", b"cart", CompressionMethod::Stored),
        ],
    );

    let session = fx.ctx.open(&path).unwrap();
    assert_eq!(session.find_payload(Some(&[".d64"])).unwrap(), "game.d64");
    assert_eq!(session.find_payload(Some(&[".CRT"])).unwrap(), "game.crt");
    assert_eq!(session.find_payload(None).unwrap(), "game.d64");
    assert!(matches!(
        session.find_payload(Some(&[".t64"])),
        Err(Error::NoPayload(_))
    ));
}

#[test]
fn payload_to_temp_always_closes_the_archive() {
    let fx = Fixture::new();
    let path = fx.zip(
        "bundle.zip",
        &[
            Item::Dir("docs/"),
            Item::File("docs/manual.txt", b"manual", CompressionMethod::Deflated),
            Item::File("tape/game.tap", b"tape data", CompressionMethod::Deflated),
        ],
    );

    let staged = fx.ctx.extract_payload_to_temp(&path, None).unwrap();
    assert_eq!(std::fs::read(&staged).unwrap(), b"tape data");
    assert!(
        staged
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("_game.tap")
    );
    assert_eq!(fx.ctx.open_session_count(), 0);

    let missing = fx.ctx.extract_payload_to_temp(&path, Some(&[".crt"]));
    assert!(matches!(missing, Err(Error::NoPayload(_))));
    assert_eq!(fx.ctx.open_session_count(), 0);
}

#[test]
fn cleanup_sweep_closes_open_sessions() {
    let fx = Fixture::new();
    let first = fx.zip(
        "one.zip",
        &[Item::File("one.prg", b"1", CompressionMethod::Stored)],
    );
    let second = fx.zip(
        "two.zip",
        &[Item::File("two.prg", b"2", CompressionMethod::Stored)],
    );

    let one = fx.ctx.open(&first).unwrap();
    let two = fx.ctx.open(&second).unwrap();
    assert_eq!(fx.ctx.open_session_count(), 2);

    assert_eq!(fx.ctx.cleanup_all_open_sessions(), 2);
    assert_eq!(fx.ctx.open_session_count(), 0);

    assert!(matches!(
        one.extract_to_memory("one.prg"),
        Err(Error::SessionClosed)
    ));
    one.close();
    two.close();
    assert_eq!(fx.ctx.open_session_count(), 0);
}
