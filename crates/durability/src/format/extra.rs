//! Extra field blocks.
//!
//! An extra block is a sequence of `id(2) size(2) data(size)` fields. The
//! container writes two kinds and understands three:
//!
//! - `0x0001` ZIP64 extended information (sizes, offset, disk)
//! - `0x5455` extended timestamp (exact Unix mtime)
//! - `0x9901` WinZip AES (read only: encryption strength and real codec)

use super::records::{u16_at, u32_at, u64_at};

/// ZIP64 extended information field id
pub const ZIP64_EXTRA_ID: u16 = 0x0001;
/// Extended timestamp field id ("UT")
pub const EXTENDED_TIMESTAMP_ID: u16 = 0x5455;
/// WinZip AES field id
pub const AES_EXTRA_ID: u16 = 0x9901;

/// Extended timestamp flag: modification time present
const UT_FLAG_MTIME: u8 = 0x01;

/// Length of the ZIP64 field reserved in local headers (both sizes)
pub const ZIP64_LOCAL_DATA_SIZE: usize = 16;

/// Parsed WinZip AES field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AesExtra {
    /// Key strength: 1 = 128 bit, 2 = 192 bit, 3 = 256 bit
    pub strength: u8,
    /// Codec actually used for the body
    pub actual_method: u16,
}

/// Fields recovered from an extra block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraFields {
    /// Unix modification time from the extended timestamp field
    pub mtime: Option<i64>,
    /// Raw ZIP64 field data
    pub zip64: Option<Vec<u8>>,
    /// WinZip AES field
    pub aes: Option<AesExtra>,
}

/// ZIP64 values resolved for one central record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Zip64Values {
    /// Uncompressed size
    pub uncompressed_size: Option<u64>,
    /// Compressed size
    pub compressed_size: Option<u64>,
    /// Local header offset
    pub local_header_offset: Option<u64>,
    /// Starting disk
    pub disk_start: Option<u32>,
}

impl ExtraFields {
    /// Parse an extra block. Malformed trailing fields are ignored.
    pub fn parse(block: &[u8]) -> Self {
        let mut fields = ExtraFields::default();
        let mut pos = 0;
        while pos + 4 <= block.len() {
            let id = u16_at(block, pos);
            let size = u16_at(block, pos + 2) as usize;
            let start = pos + 4;
            let end = start + size;
            if end > block.len() {
                break;
            }
            let data = &block[start..end];
            match id {
                ZIP64_EXTRA_ID => fields.zip64 = Some(data.to_vec()),
                EXTENDED_TIMESTAMP_ID => {
                    if data.len() >= 5 && data[0] & UT_FLAG_MTIME != 0 {
                        fields.mtime = Some(i64::from(u32_at(data, 1) as i32));
                    }
                }
                AES_EXTRA_ID => {
                    if data.len() >= 7 {
                        fields.aes = Some(AesExtra {
                            strength: data[4],
                            actual_method: u16_at(data, 5),
                        });
                    }
                }
                _ => {}
            }
            pos = end;
        }
        fields
    }

    /// Resolve ZIP64 values for a central record.
    ///
    /// Only fields whose classic counterpart is saturated are present in the
    /// ZIP64 data, always in the order uncompressed, compressed, offset, disk.
    pub fn zip64_central(
        &self,
        uncompressed: bool,
        compressed: bool,
        offset: bool,
        disk: bool,
    ) -> Zip64Values {
        let mut values = Zip64Values::default();
        let data = match &self.zip64 {
            Some(data) => data.as_slice(),
            None => return values,
        };
        let mut pos = 0;
        let mut take_u64 = |wanted: bool| -> Option<u64> {
            if !wanted || pos + 8 > data.len() {
                return None;
            }
            let v = u64_at(data, pos);
            pos += 8;
            Some(v)
        };
        values.uncompressed_size = take_u64(uncompressed);
        values.compressed_size = take_u64(compressed);
        values.local_header_offset = take_u64(offset);
        if disk && pos + 4 <= data.len() {
            values.disk_start = Some(u32_at(data, pos));
        }
        values
    }
}

fn push_field(block: &mut Vec<u8>, id: u16, data: &[u8]) {
    block.extend_from_slice(&id.to_le_bytes());
    block.extend_from_slice(&(data.len() as u16).to_le_bytes());
    block.extend_from_slice(data);
}

/// Append an extended timestamp field carrying `mtime`.
///
/// Skipped when the time does not fit the field's signed 32-bit range; the
/// DOS date/time still records it at two-second precision.
pub fn push_extended_timestamp(block: &mut Vec<u8>, mtime: i64) {
    if let Ok(secs) = i32::try_from(mtime) {
        let mut data = [0u8; 5];
        data[0] = UT_FLAG_MTIME;
        data[1..5].copy_from_slice(&secs.to_le_bytes());
        push_field(block, EXTENDED_TIMESTAMP_ID, &data);
    }
}

/// Append a ZIP64 field for a central record, if any value overflows.
pub fn push_zip64_central(block: &mut Vec<u8>, uncompressed: u64, compressed: u64, offset: u64) {
    let overflow = |v: u64| v >= u64::from(u32::MAX);
    let mut data = Vec::with_capacity(24);
    for value in [uncompressed, compressed, offset] {
        if overflow(value) {
            data.extend_from_slice(&value.to_le_bytes());
        }
    }
    if !data.is_empty() {
        push_field(block, ZIP64_EXTRA_ID, &data);
    }
}

/// Append a zeroed ZIP64 field for a local header.
///
/// Returns the offset of the field's data within `block`, where both sizes
/// are patched once the entry body has been written.
pub fn push_zip64_local_placeholder(block: &mut Vec<u8>) -> usize {
    let data_offset = block.len() + 4;
    push_field(block, ZIP64_EXTRA_ID, &[0u8; ZIP64_LOCAL_DATA_SIZE]);
    data_offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extended_timestamp_roundtrip() {
        let mut block = Vec::new();
        push_extended_timestamp(&mut block, 1_700_000_000);
        assert_eq!(block.len(), 9);
        assert_eq!(ExtraFields::parse(&block).mtime, Some(1_700_000_000));
    }

    #[test]
    fn test_extended_timestamp_pre_epoch() {
        let mut block = Vec::new();
        push_extended_timestamp(&mut block, -86_400);
        assert_eq!(ExtraFields::parse(&block).mtime, Some(-86_400));
    }

    #[test]
    fn test_extended_timestamp_out_of_range_skipped() {
        let mut block = Vec::new();
        push_extended_timestamp(&mut block, i64::from(i32::MAX) + 1);
        assert!(block.is_empty());
    }

    #[test]
    fn test_zip64_only_overflowing_fields() {
        let mut block = Vec::new();
        push_zip64_central(&mut block, 10, 20, 30);
        assert!(block.is_empty());

        let big = 1u64 << 33;
        push_zip64_central(&mut block, 10, 20, big);
        let fields = ExtraFields::parse(&block);
        assert_eq!(fields.zip64.as_ref().map(Vec::len), Some(8));

        let values = fields.zip64_central(false, false, true, false);
        assert_eq!(values.local_header_offset, Some(big));
        assert_eq!(values.uncompressed_size, None);
    }

    #[test]
    fn test_zip64_field_order() {
        let mut block = Vec::new();
        push_zip64_central(&mut block, 1 << 32, 1 << 33, 1 << 34);
        let values = ExtraFields::parse(&block).zip64_central(true, true, true, false);
        assert_eq!(values.uncompressed_size, Some(1 << 32));
        assert_eq!(values.compressed_size, Some(1 << 33));
        assert_eq!(values.local_header_offset, Some(1 << 34));
    }

    #[test]
    fn test_local_placeholder_offset() {
        let mut block = Vec::new();
        push_extended_timestamp(&mut block, 0);
        let at = push_zip64_local_placeholder(&mut block);
        assert_eq!(at, 9 + 4);
        assert_eq!(block.len(), at + ZIP64_LOCAL_DATA_SIZE);
    }

    #[test]
    fn test_aes_field_and_unknown_fields() {
        // unknown field, then AES: version 2, vendor "AE", strength 3, method 8
        let mut block = Vec::new();
        push_field(&mut block, 0xcafe, &[1, 2, 3]);
        push_field(&mut block, AES_EXTRA_ID, &[2, 0, b'A', b'E', 3, 8, 0]);
        let fields = ExtraFields::parse(&block);
        assert_eq!(
            fields.aes,
            Some(AesExtra {
                strength: 3,
                actual_method: 8
            })
        );
        assert_eq!(fields.mtime, None);
    }

    #[test]
    fn test_malformed_field_ignored() {
        // declares 200 bytes but only 2 follow
        let block = [0x55, 0x54, 200, 0, 1, 2];
        assert_eq!(ExtraFields::parse(&block), ExtraFields::default());
    }
}
