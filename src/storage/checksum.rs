//! CRC32 content checksum of a persisted generation
//!
//! Covers every row's JSON encoding in load order. Stored in the catalog
//! metadata and recomputed on open; a mismatch is fatal.

use crc32fast::Hasher;

use crate::record::Record;

use super::errors::{StorageError, StorageResult};

/// Running CRC32 (IEEE polynomial) over a sequence of records
#[derive(Debug, Clone, Default)]
pub struct ContentChecksum {
    hasher: Hasher,
}

impl ContentChecksum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, record: &Record) -> StorageResult<()> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| StorageError::data_corruption(format!("Failed to encode row: {}", e)))?;
        // length prefix keeps row boundaries significant
        self.hasher.update(&(bytes.len() as u32).to_le_bytes());
        self.hasher.update(&bytes);
        Ok(())
    }

    pub fn finalize(self) -> u32 {
        self.hasher.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Color, PartCategory};

    fn red() -> Record {
        Record::Color(Color {
            id: 4,
            name: "Red".into(),
            rgb: "C91A09".into(),
            is_trans: false,
        })
    }

    #[test]
    fn test_empty_content_is_stable() {
        assert_eq!(ContentChecksum::new().finalize(), ContentChecksum::new().finalize());
        let mut one = ContentChecksum::new();
        one.update(&red()).unwrap();
        assert_ne!(one.finalize(), ContentChecksum::new().finalize());
    }

    #[test]
    fn test_content_checksum_is_order_sensitive() {
        let bricks = Record::PartCategory(PartCategory {
            id: 11,
            name: "Bricks".into(),
        });

        let mut forward = ContentChecksum::new();
        forward.update(&red()).unwrap();
        forward.update(&bricks).unwrap();

        let mut backward = ContentChecksum::new();
        backward.update(&bricks).unwrap();
        backward.update(&red()).unwrap();

        assert_ne!(forward.finalize(), backward.finalize());
    }

    #[test]
    fn test_content_checksum_sees_field_change() {
        let mut a = ContentChecksum::new();
        a.update(&red()).unwrap();

        let mut b = ContentChecksum::new();
        b.update(&Record::Color(Color {
            id: 4,
            name: "Dark Red".into(),
            rgb: "C91A09".into(),
            is_trans: false,
        }))
        .unwrap();

        assert_ne!(a.finalize(), b.finalize());
    }
}
