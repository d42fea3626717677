//! CRC16 over the TYPE and PAYLOAD bytes of a frame
//!
//! CCITT polynomial 0x1021, initial register 0xFFFF, no reflection and no
//! final XOR (the variant usually listed as CRC-16/CCITT-FALSE). Computed a
//! bit at a time; frames are short enough that a lookup table is not worth
//! its flash.

/// Initial CRC register value
pub const CRC16_INIT: u16 = 0xFFFF;

/// CCITT generator polynomial
pub const CRC16_POLY: u16 = 0x1021;

/// Feed `data` into a running CRC register
///
/// `crc16_update(crc16_update(CRC16_INIT, a), b)` equals `crc16(a ++ b)`.
pub fn crc16_update(mut crc: u16, data: &[u8]) -> u16 {
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ CRC16_POLY;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// CRC16 of a complete byte span
pub fn crc16(data: &[u8]) -> u16 {
    crc16_update(CRC16_INIT, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        // Standard check input for CRC-16/CCITT-FALSE
        assert_eq!(crc16(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(crc16(&[]), CRC16_INIT);
    }

    #[test]
    fn test_incremental_matches_whole() {
        let data = [0x01, 0xFB, 0x2E, 0x10, 0x20];
        let split = crc16_update(crc16_update(CRC16_INIT, &data[..1]), &data[1..]);
        assert_eq!(split, crc16(&data));
    }

    #[test]
    fn test_single_bit_flip_changes_crc() {
        let data = [0x03, b'h', b'e', b'l', b'l', b'o'];
        let reference = crc16(&data);

        for i in 0..data.len() {
            for bit in 0..8 {
                let mut flipped = data;
                flipped[i] ^= 1 << bit;
                assert_ne!(crc16(&flipped), reference);
            }
        }
    }
}
