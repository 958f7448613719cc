/// Extract a bit-field of `width` bits starting at `lsb_index`.
///
/// `buffer` is little-endian: bit 0 is the LSB of `buffer[0]`, bit 8 the LSB
/// of `buffer[1]`. The result is right-aligned. Bits that fall past the end
/// of the buffer read as zero, so a field that straddles the end of a short
/// block keeps its low bits. Widths above 32 are clamped to 32.
pub fn extract(buffer: &[u8], lsb_index: usize, width: u8) -> u32 {
    let width = width.min(32) as usize;
    let mut value = 0u32;
    for i in 0..width {
        let Some(bit) = lsb_index.checked_add(i) else {
            break;
        };
        let byte = match buffer.get(bit >> 3) {
            Some(b) => *b,
            None => continue,
        };
        if byte & (1u8 << (bit & 7)) != 0 {
            value |= 1u32 << i;
        }
    }
    value
}

/// Little-endian 16-bit word at `byte_offset`; missing bytes read as zero.
pub fn le16(buffer: &[u8], byte_offset: usize) -> u16 {
    extract(buffer, byte_offset.saturating_mul(8), 16) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference read through a u64 for buffers of up to eight bytes.
    fn reference(buffer: &[u8], lsb: usize, width: u8) -> u32 {
        let mut padded = [0u8; 8];
        padded[..buffer.len()].copy_from_slice(buffer);
        let word = u64::from_le_bytes(padded);
        let mask = if width >= 32 { u32::MAX as u64 } else { (1u64 << width) - 1 };
        ((word >> lsb) & mask) as u32
    }

    #[test]
    fn test_single_bits() {
        let buf = [0b1010_0001, 0b0000_0001];
        assert_eq!(extract(&buf, 0, 1), 1);
        assert_eq!(extract(&buf, 1, 1), 0);
        assert_eq!(extract(&buf, 5, 1), 1);
        assert_eq!(extract(&buf, 7, 1), 1);
        assert_eq!(extract(&buf, 8, 1), 1);
        assert_eq!(extract(&buf, 9, 1), 0);
    }

    #[test]
    fn test_field_straddles_bytes() {
        // bits 4..12 span the high nibble of byte 0 and low nibble of byte 1
        let buf = [0xA0, 0x0B];
        assert_eq!(extract(&buf, 4, 8), 0xBA);
        assert_eq!(extract(&buf, 0, 16), 0x0BA0);
    }

    #[test]
    fn test_matches_little_endian_reference() {
        let buf = [0x5A, 0xC3, 0x0F, 0xF0, 0x81, 0x7E];
        for lsb in 0..(buf.len() * 8) {
            for width in 1..=32u8 {
                if lsb + width as usize > buf.len() * 8 {
                    continue;
                }
                assert_eq!(
                    extract(&buf, lsb, width),
                    reference(&buf, lsb, width),
                    "lsb={lsb} width={width}"
                );
            }
        }
    }

    #[test]
    fn test_out_of_range_reads_zero() {
        let buf = [0xFF, 0xFF];
        assert_eq!(extract(&buf, 16, 1), 0);
        assert_eq!(extract(&buf, 16, 32), 0);
        assert_eq!(extract(&buf, 1000, 8), 0);
        // partially in range keeps the in-range low bits
        assert_eq!(extract(&buf, 12, 8), 0x0F);
    }

    #[test]
    fn test_total_on_degenerate_input() {
        assert_eq!(extract(&[], 0, 32), 0);
        assert_eq!(extract(&[0xFF], 0, 0), 0);
        assert_eq!(extract(&[0xFF], usize::MAX, 32), 0);
        assert_eq!(extract(&[0xFF; 8], 0, 200), u32::MAX);
    }

    #[test]
    fn test_extract_is_repeatable() {
        let buf = [0x12, 0x34, 0x56];
        let first = extract(&buf, 3, 13);
        for _ in 0..4 {
            assert_eq!(extract(&buf, 3, 13), first);
        }
    }

    #[test]
    fn test_le16() {
        assert_eq!(le16(&[0x2E, 0x10, 0x30], 0), 0x102E);
        assert_eq!(le16(&[0x2E, 0x10, 0x30], 2), 0x0030);
        assert_eq!(le16(&[], 4), 0);
    }
}
