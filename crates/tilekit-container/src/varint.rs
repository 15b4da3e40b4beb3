use crate::ContainerError;
use std::io::Read;

/// Append the unsigned LEB128 encoding of `value` to `out`.
pub fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Read one unsigned LEB128 number.
///
/// Returns `Ok(None)` on clean EOF before the first byte (the end of the
/// block stream). EOF in the middle of a number, or a number longer than 10
/// bytes, is a corrupt container. `offset` is the absolute stream position of
/// the first byte, used only for error reporting. On success, also returns
/// the number of bytes consumed.
pub fn read_varint(r: &mut impl Read, offset: u64) -> Result<Option<(u64, usize)>, ContainerError> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    let mut consumed = 0usize;
    loop {
        let mut byte = [0u8; 1];
        match r.read(&mut byte)? {
            0 if consumed == 0 => return Ok(None),
            0 => return Err(ContainerError::Truncated { offset }),
            _ => {}
        }
        consumed += 1;
        if consumed > 10 {
            return Err(ContainerError::VarintOverflow { offset });
        }
        value |= u64::from(byte[0] & 0x7f) << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(Some((value, consumed)));
        }
        shift += 7;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(value: u64) {
        let mut buf = Vec::new();
        encode_varint(value, &mut buf);
        let (got, n) = read_varint(&mut Cursor::new(&buf), 0).unwrap().unwrap();
        assert_eq!(got, value);
        assert_eq!(n, buf.len());
    }

    #[test]
    fn small_values_are_one_byte() {
        let mut buf = Vec::new();
        encode_varint(0, &mut buf);
        assert_eq!(buf, [0]);
        buf.clear();
        encode_varint(127, &mut buf);
        assert_eq!(buf, [0x7f]);
    }

    #[test]
    fn multi_byte_boundary() {
        let mut buf = Vec::new();
        encode_varint(128, &mut buf);
        assert_eq!(buf, [0x80, 0x01]);
        roundtrip(128);
        roundtrip(300);
    }

    #[test]
    fn roundtrips_across_range() {
        for value in [0, 1, 127, 128, 16_383, 16_384, 1 << 32, u64::MAX] {
            roundtrip(value);
        }
    }

    #[test]
    fn clean_eof_is_none() {
        let result = read_varint(&mut Cursor::new(&[]), 0).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn mid_number_eof_is_truncation() {
        let err = read_varint(&mut Cursor::new(&[0x80]), 7).unwrap_err();
        assert!(matches!(err, ContainerError::Truncated { offset: 7 }));
    }

    #[test]
    fn eleven_continuation_bytes_overflow() {
        let bytes = [0x80u8; 11];
        let err = read_varint(&mut Cursor::new(&bytes), 0).unwrap_err();
        assert!(matches!(err, ContainerError::VarintOverflow { .. }));
    }
}
