//! Annex B length-delimited framing (AV1 spec Annex B): a bare LEB128 size prefix in
//! front of each temporal unit / frame unit, read by the caller before handing the
//! remaining bytes to the OBU parser.

use crate::bitreader::BitReader;
use crate::error::Result;
use crate::leb128::read_leb128;

/// Reads one Annex B `leb128()` size field and returns `(size, bytes_consumed)`. The
/// size is widened to `u64` here even though the crate's LEB128 decoder caps individual
/// values at 32 bits, since Annex B sizes describe byte counts that can exceed that in
/// principle; in practice this crate's LEB128 conformance rule applies identically.
pub fn parse_annexb_unit_size(data: &[u8]) -> Result<(u64, usize)> {
    let mut reader = BitReader::new(data);
    let (value, consumed) = read_leb128(&mut reader)?;
    Ok((value as u64, consumed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_single_byte_size() {
        let data = [0x05, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE];
        let (size, consumed) = parse_annexb_unit_size(&data).unwrap();
        assert_eq!(size, 5);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn reads_multi_byte_size() {
        let data = [0x80, 0x01, 0x00];
        let (size, consumed) = parse_annexb_unit_size(&data).unwrap();
        assert_eq!(size, 128);
        assert_eq!(consumed, 2);
    }
}
