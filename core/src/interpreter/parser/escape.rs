//! Backslash escape resolution
//!
//! Escapes are resolved while the tree is built; the evaluator only ever sees
//! the resulting bytes.

/// Resolve the escape whose backslash sits at `src[at]`, looking no further
/// than `end`. Returns the produced bytes and the index just past the escape.
pub fn resolve(src: &[u8], at: usize, end: usize) -> (Vec<u8>, usize) {
    let next = at + 1;
    if next >= end {
        return (vec![b'\\'], next);
    }
    match src[next] {
        b'a' => (vec![0x07], next + 1),
        b'b' => (vec![0x08], next + 1),
        b'f' => (vec![0x0c], next + 1),
        b'n' => (vec![b'\n'], next + 1),
        b'r' => (vec![b'\r'], next + 1),
        b't' => (vec![b'\t'], next + 1),
        b'v' => (vec![0x0b], next + 1),
        b'\n' => {
            let mut i = next + 1;
            while i < end && matches!(src[i], b' ' | b'\t') {
                i += 1;
            }
            (vec![b' '], i)
        }
        b'x' => {
            let digits = hex_run(src, next + 1, end, 2);
            if digits == 0 {
                return (vec![b'x'], next + 1);
            }
            let value = hex_value(&src[next + 1..next + 1 + digits]);
            (vec![value as u8], next + 1 + digits)
        }
        b'u' => {
            if hex_run(src, next + 1, end, 4) < 4 {
                return (vec![b'u'], next + 1);
            }
            let cp = hex_value(&src[next + 1..next + 5]);
            (encode_bmp(cp), next + 5)
        }
        b'0'..=b'7' => {
            let mut i = next;
            let mut value: u32 = 0;
            while i < end && i < next + 3 && (b'0'..=b'7').contains(&src[i]) {
                value = value * 8 + u32::from(src[i] - b'0');
                i += 1;
            }
            (vec![(value & 0xff) as u8], i)
        }
        other => (vec![other], next + 1),
    }
}

fn hex_run(src: &[u8], start: usize, end: usize, max: usize) -> usize {
    src[start.min(end)..end]
        .iter()
        .take(max)
        .take_while(|b| b.is_ascii_hexdigit())
        .count()
}

fn hex_value(digits: &[u8]) -> u32 {
    digits.iter().fold(0, |acc, &d| {
        let v = match d {
            b'0'..=b'9' => d - b'0',
            b'a'..=b'f' => d - b'a' + 10,
            _ => d - b'A' + 10,
        };
        acc * 16 + u32::from(v)
    })
}

/// UTF-8 encode a Basic Multilingual Plane code point (1 to 3 bytes).
///
/// Surrogate code points are encoded like any other 3-byte value.
pub fn encode_bmp(cp: u32) -> Vec<u8> {
    if cp < 0x80 {
        vec![cp as u8]
    } else if cp < 0x800 {
        vec![0xc0 | (cp >> 6) as u8, 0x80 | (cp & 0x3f) as u8]
    } else {
        vec![
            0xe0 | (cp >> 12) as u8,
            0x80 | ((cp >> 6) & 0x3f) as u8,
            0x80 | (cp & 0x3f) as u8,
        ]
    }
}

/// Inverse of [`encode_bmp`] for 2 and 3 byte sequences
pub fn decode_bmp(bytes: &[u8]) -> Option<u32> {
    match *bytes {
        [a, b] if a & 0xe0 == 0xc0 && b & 0xc0 == 0x80 => {
            Some((u32::from(a & 0x1f) << 6) | u32::from(b & 0x3f))
        }
        [a, b, c] if a & 0xf0 == 0xe0 && b & 0xc0 == 0x80 && c & 0xc0 == 0x80 => Some(
            (u32::from(a & 0x0f) << 12) | (u32::from(b & 0x3f) << 6) | u32::from(c & 0x3f),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn esc(s: &str) -> (Vec<u8>, usize) {
        resolve(s.as_bytes(), 0, s.len())
    }

    #[test]
    fn test_single_character_escapes() {
        assert_eq!(esc("\\n"), (vec![b'\n'], 2));
        assert_eq!(esc("\\t"), (vec![b'\t'], 2));
        assert_eq!(esc("\\\\"), (vec![b'\\'], 2));
        assert_eq!(esc("\\{"), (vec![b'{'], 2));
        assert_eq!(esc("\\q"), (vec![b'q'], 2));
    }

    #[test]
    fn test_hex_takes_at_most_two_digits() {
        assert_eq!(esc("\\x41"), (vec![0x41], 4));
        assert_eq!(esc("\\x414"), (vec![0x41], 4));
        assert_eq!(esc("\\xf"), (vec![0x0f], 3));
        assert_eq!(esc("\\xg"), (vec![b'x'], 2));
    }

    #[test]
    fn test_unicode_needs_four_digits() {
        assert_eq!(esc("\\u0041"), (vec![b'A'], 6));
        assert_eq!(esc("\\u00e9"), ("é".as_bytes().to_vec(), 6));
        assert_eq!(esc("\\u20ac"), ("€".as_bytes().to_vec(), 6));
        assert_eq!(esc("\\u12"), (vec![b'u'], 2));
    }

    #[test]
    fn test_octal_up_to_three_digits() {
        assert_eq!(esc("\\101"), (vec![b'A'], 4));
        assert_eq!(esc("\\0"), (vec![0], 2));
        assert_eq!(esc("\\1011"), (vec![b'A'], 4));
    }

    #[test]
    fn test_backslash_newline_swallows_indentation() {
        assert_eq!(esc("\\\n   \tx"), (vec![b' '], 6));
    }

    #[test]
    fn test_trailing_backslash_is_literal() {
        assert_eq!(esc("\\"), (vec![b'\\'], 1));
    }

    #[test]
    fn test_decode_inverts_encode() {
        for cp in [0x80u32, 0x7ff, 0x800, 0xd800, 0xffff] {
            assert_eq!(decode_bmp(&encode_bmp(cp)), Some(cp));
        }
    }
}
