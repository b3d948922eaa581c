//! CRC32 checksums for row frames
//!
//! Every frame read from `records.dat` is verified before its payload is
//! decoded. Uses CRC32 (IEEE polynomial).

use crc32fast::Hasher;

/// Computes a CRC32 checksum over `data`
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Returns true if `data` hashes to `expected`
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_detects_single_bit_flip() {
        let mut row = br#"[1,"alpha",{"x":"1"}]"#.to_vec();
        let original = compute_checksum(&row);
        row[3] ^= 0x01;
        assert_ne!(original, compute_checksum(&row));
    }

    #[test]
    fn test_verify_checksum() {
        let data = b"[7]";
        let checksum = compute_checksum(data);
        assert!(verify_checksum(data, checksum));
        assert!(!verify_checksum(data, checksum ^ 1));
    }
}
