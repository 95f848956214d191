//! Corruption detection tests
//!
//! These tests verify that damaged containers are detected:
//! - Truncated containers fail to open as corrupt
//! - Bit flips in entry bodies are caught by CRC-32
//! - Damaged central directory records end the walk with an error
//! - A failed write leaves the previous container byte-identical

use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walzip_core::{CompressionMethod, COMPRESSION_LEVEL};
use walzip_durability::{
    write_entry, ContainerError, ContainerReader, ContainerWriter, EntryCursor, WriteStage,
};

fn write_source(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    path
}

fn build_container(dir: &TempDir, entries: usize) -> PathBuf {
    let container = dir.path().join("zip_archive.zip");
    for i in 0..entries {
        let name = format!("00000001000000000000000{}", i + 1);
        let data = vec![i as u8; 4096];
        let source = write_source(dir.path(), &format!("src{i}"), &data);
        write_entry(
            &container,
            &name,
            &source,
            CompressionMethod::Zlib,
            COMPRESSION_LEVEL,
            "WAL archive",
        )
        .unwrap();
    }
    container
}

#[test]
fn test_truncated_container_is_corrupt() {
    let temp_dir = TempDir::new().unwrap();
    let container = build_container(&temp_dir, 2);

    let len = fs::metadata(&container).unwrap().len();
    let file = OpenOptions::new().write(true).open(&container).unwrap();
    file.set_len(len - 10).unwrap();
    drop(file);

    match ContainerReader::open(&container) {
        Err(err) => {
            assert!(err.is_corrupt(), "unexpected error: {err}");
            assert!(err.to_string().contains("zip_archive.zip"));
        }
        Ok(_) => panic!("truncated container opened"),
    }
    assert!(EntryCursor::open(&container).is_err());
}

#[test]
fn test_garbage_file_is_corrupt() {
    let temp_dir = TempDir::new().unwrap();
    let container = temp_dir.path().join("zip_archive.zip");
    fs::write(&container, b"this is not an archive at all, just text").unwrap();

    let err = ContainerReader::open(&container).err().unwrap();
    assert!(matches!(err, ContainerError::Corrupt { .. }));
}

#[test]
fn test_body_bit_flip_detected() {
    let temp_dir = TempDir::new().unwrap();
    let container = temp_dir.path().join("zip_archive.zip");
    let source = write_source(temp_dir.path(), "seg", &[0x5a; 256]);
    write_entry(
        &container,
        "seg",
        &source,
        CompressionMethod::Uncompressed,
        COMPRESSION_LEVEL,
        "",
    )
    .unwrap();

    // Local header is 30 bytes + 3 name bytes + 9 byte timestamp field
    {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&container)
            .unwrap();
        let body = 30 + 3 + 9 + 100;
        file.seek(SeekFrom::Start(body)).unwrap();
        let mut buf = [0u8; 1];
        file.read_exact(&mut buf).unwrap();
        buf[0] ^= 0xFF;
        file.seek(SeekFrom::Start(body)).unwrap();
        file.write_all(&buf).unwrap();
    }

    let reader = ContainerReader::open(&container).unwrap();
    // Metadata is still readable
    let stat = reader.stat_index(0).unwrap();
    assert_eq!(stat.uncompressed_size, Some(256));
    assert!(matches!(
        reader.read_entry(0),
        Err(ContainerError::ChecksumMismatch { .. })
    ));
    assert!(!reader.verify().unwrap().is_ok());
}

#[test]
fn test_damaged_central_record_stops_cursor() {
    let temp_dir = TempDir::new().unwrap();
    let container = build_container(&temp_dir, 3);

    // Find the second central directory signature and break it
    let mut bytes = fs::read(&container).unwrap();
    let positions: Vec<usize> = bytes
        .windows(4)
        .enumerate()
        .filter(|(_, w)| *w == b"PK\x01\x02")
        .map(|(i, _)| i)
        .collect();
    assert_eq!(positions.len(), 3);
    bytes[positions[1]] = b'X';
    fs::write(&container, &bytes).unwrap();

    let mut cursor = EntryCursor::open(&container).unwrap();
    assert!(cursor.next().unwrap().is_ok());
    let err = cursor.next().unwrap().unwrap_err();
    assert!(err.is_corrupt());
    assert!(cursor.next().is_none());

    let reader = ContainerReader::open(&container).unwrap();
    assert!(reader.stats().unwrap_err().is_corrupt());
}

#[test]
fn test_failed_write_leaves_container_identical() {
    let temp_dir = TempDir::new().unwrap();
    let container = build_container(&temp_dir, 2);
    let before = fs::read(&container).unwrap();

    let err = write_entry(
        &container,
        "000000010000000000000009",
        &temp_dir.path().join("does-not-exist"),
        CompressionMethod::Zstd,
        COMPRESSION_LEVEL,
        "WAL archive",
    )
    .unwrap_err();
    assert_eq!(err.write_stage(), Some(WriteStage::AddEntry));
    assert_eq!(fs::read(&container).unwrap(), before);

    let err = write_entry(
        &container,
        "000000010000000000000009",
        &write_source(temp_dir.path(), "ok", b"fine"),
        CompressionMethod::Zstd,
        99,
        "WAL archive",
    )
    .unwrap_err();
    assert_eq!(err.write_stage(), Some(WriteStage::SetCompression));
    assert_eq!(fs::read(&container).unwrap(), before);
}

#[test]
fn test_writer_refuses_corrupt_container() {
    let temp_dir = TempDir::new().unwrap();
    let container = build_container(&temp_dir, 1);
    let len = fs::metadata(&container).unwrap().len();
    OpenOptions::new()
        .write(true)
        .open(&container)
        .unwrap()
        .set_len(len / 2)
        .unwrap();
    let before = fs::read(&container).unwrap();

    let err = ContainerWriter::open(&container).err().unwrap();
    assert!(err.is_corrupt());
    assert_eq!(fs::read(&container).unwrap(), before);
}
