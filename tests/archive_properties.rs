//! Property tests for the archiver
//!
//! - Round-trip: every archived segment enumerates with its size and CRC-32
//! - Monotonic count: each successful call adds exactly one entry
//! - Compression round-trip: every method reproduces the original bytes

use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;
use walzip::{ArchiveConfig, Archiver, CompressionMethod};

fn method_strategy() -> impl Strategy<Value = CompressionMethod> {
    prop::sample::select(CompressionMethod::ALL.to_vec())
}

fn segment_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..2048),
        // WAL pages are mostly zero padding
        (0usize..16384, any::<u8>()).prop_map(|(len, b)| {
            let mut page = vec![0u8; len];
            if let Some(first) = page.first_mut() {
                *first = b;
            }
            page
        }),
    ]
}

fn segment_name(i: usize) -> String {
    format!("{:024X}", i + 1)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_archive_round_trip_and_monotonic_count(
        segments in prop::collection::vec((segment_strategy(), method_strategy()), 1..5)
    ) {
        let temp_dir = TempDir::new().unwrap();
        let archive_dir = temp_dir.path().join("archive");
        let archiver = Archiver::new(ArchiveConfig::new(archive_dir.to_string_lossy())).unwrap();

        for (i, (data, method)) in segments.iter().enumerate() {
            let mut config = archiver.config();
            config.compression_method = *method;
            archiver.reload(config).unwrap();

            let before = archiver.archive_stats().unwrap().entry_count;
            let name = segment_name(i);
            let source = temp_dir.path().join(format!("seg{i}"));
            fs::write(&source, data).unwrap();
            prop_assert!(archiver.archive_file(&name, &source));
            prop_assert_eq!(archiver.archive_stats().unwrap().entry_count, before + 1);
        }

        let rows: Vec<_> = archiver
            .archived_segments()
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        prop_assert_eq!(rows.len(), segments.len());
        for (i, (row, (data, method))) in rows.iter().zip(&segments).enumerate() {
            let expected_name = segment_name(i);
            prop_assert_eq!(row.name.as_deref(), Some(expected_name.as_str()));
            prop_assert_eq!(row.uncompressed_size, Some(data.len() as u64));
            prop_assert_eq!(row.checksum, Some(crc32fast::hash(data)));
            prop_assert_eq!(row.compression_method, Some(*method));
            prop_assert_eq!(&archiver.read_segment(i as u64).unwrap(), data);
        }
    }
}

#[test]
fn test_every_method_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let data: Vec<u8> = (0..65_536u32)
        .map(|i| if i % 512 < 16 { (i % 251) as u8 } else { 0 })
        .collect();
    let source = temp_dir.path().join("segment");
    fs::write(&source, &data).unwrap();

    for method in CompressionMethod::ALL {
        let archive_dir = temp_dir.path().join(method.name());
        let config = ArchiveConfig::new(archive_dir.to_string_lossy()).with_compression(method);
        let archiver = Archiver::new(config).unwrap();

        assert!(archiver.archive_file("000000010000000000000001", &source));
        assert_eq!(archiver.read_segment(0).unwrap(), data, "{method}");
        let row = archiver.archived_segments().unwrap().next().unwrap().unwrap();
        assert_eq!(row.compression_method, Some(method));
        if method != CompressionMethod::Uncompressed {
            assert!(row.compressed_size.unwrap() < data.len() as u64, "{method}");
        }
    }
}
