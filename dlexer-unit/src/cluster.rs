//! Cluster length arithmetic.
//!
//! All routines here agree on the same boundaries: for any byte string `s` and
//! any offset `i` reached by stepping forward with [`width`] from `0`,
//! `len_backward(&s[..i + width(&s[i..])]) == width(&s[i..])`.

/// The longest cluster, in bytes.
pub const MAX_LEN: usize = 4;

/// Returns the byte length of a cluster from its lead byte.
///
/// The length is the count of leading one bits. ASCII bytes (no leading ones)
/// and continuation bytes (one leading one) are clusters of their own, as are
/// bytes with more than four leading ones. The result is always at least 1.
///
/// ```
/// use dlexer_unit::cluster::len;
///
/// assert_eq!(len(b'a'), 1);
/// assert_eq!(len(0x80), 1);
/// assert_eq!(len(0xD1), 2);
/// assert_eq!(len(0xE2), 3);
/// assert_eq!(len(0xF0), 4);
/// assert_eq!(len(0xFF), 1);
/// ```
#[inline]
pub const fn len(lead: u8) -> usize {
    match lead.leading_ones() {
        n @ 2..=4 => n as usize,
        _ => 1,
    }
}

/// Whether `b` is a continuation byte, i.e. `0b10xx_xxxx`.
#[inline]
pub const fn is_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}

/// Returns the length of the cluster at the start of `src`, or 0 if `src` is
/// empty.
///
/// Unlike [`len()`], this looks at the continuation bytes: a lead byte that is
/// truncated by the end of `src` or followed by a non-continuation byte is
/// treated as a one-byte cluster.
///
/// ```
/// use dlexer_unit::cluster::width;
///
/// assert_eq!(width("я!".as_bytes()), 2);
/// assert_eq!(width(&[0xD1]), 1);
/// assert_eq!(width(&[0xE2, b'a', b'b']), 1);
/// assert_eq!(width(b""), 0);
/// ```
#[inline]
pub fn width(src: &[u8]) -> usize {
    let Some(&lead) = src.first() else {
        return 0;
    };
    let n = len(lead);
    match src.get(1..n) {
        Some(rest) if rest.iter().all(|&b| is_continuation(b)) => n,
        _ => 1,
    }
}

/// Returns the length of the cluster that ends right before the end of
/// `before`, i.e. how far a cursor at `before.len()` has to move back to land
/// on the previous boundary. Returns 0 if `before` is empty.
///
/// ```
/// use dlexer_unit::cluster::len_backward;
///
/// assert_eq!(len_backward(b"ab"), 1);
/// assert_eq!(len_backward("aя".as_bytes()), 2);
/// assert_eq!(len_backward("😀".as_bytes()), 4);
/// // A stray continuation byte stands alone
/// assert_eq!(len_backward(&[b'a', 0x80]), 1);
/// assert_eq!(len_backward(b""), 0);
/// ```
pub fn len_backward(before: &[u8]) -> usize {
    let Some(last) = before.len().checked_sub(1) else {
        return 0;
    };
    let continuations = before[..=last]
        .iter()
        .rev()
        .take(MAX_LEN - 1)
        .take_while(|&&b| is_continuation(b))
        .count();
    if continuations == 0 || continuations == before.len() {
        return 1;
    }
    let lead = before[last - continuations];
    if len(lead) == continuations + 1 {
        continuations + 1
    } else {
        1
    }
}

/// Copies the cluster at the start of `src` into `dst` and returns its
/// length as given by [`width`].
///
/// Returns 0 and leaves `dst` untouched if `src` is empty.
///
/// ```
/// use dlexer_unit::cluster::decode_at;
///
/// let mut buf = [0; 4];
/// assert_eq!(decode_at(&mut buf, "€uro".as_bytes()), 3);
/// assert_eq!(&buf[..3], "€".as_bytes());
/// ```
#[inline]
pub fn decode_at(dst: &mut [u8; MAX_LEN], src: &[u8]) -> usize {
    let n = width(src);
    dst[..n].copy_from_slice(&src[..n]);
    n
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn lead_lengths() {
        for b in 0..0x80 {
            assert_eq!(len(b), 1);
        }
        for b in 0x80..0xC0 {
            assert_eq!(len(b), 1);
        }
        for b in 0xC0..0xE0 {
            assert_eq!(len(b), 2);
        }
        for b in 0xE0..0xF0 {
            assert_eq!(len(b), 3);
        }
        for b in 0xF0..0xF8 {
            assert_eq!(len(b), 4);
        }
        for b in 0xF8..=0xFF {
            assert_eq!(len(b), 1);
        }
    }

    #[test]
    fn malformed() {
        // Truncated lead
        assert_eq!(width(&[0xF0, 0x9F]), 1);
        assert_eq!(len_backward(&[0xF0, 0x9F]), 1);
        // Too many continuations
        assert_eq!(len_backward(&[0xC3, 0xA9, 0xA9]), 1);
        assert_eq!(len_backward(&[0xC3, 0xA9]), 2);
        assert_eq!(len_backward(&[0x80, 0x80, 0x80, 0x80]), 1);
        // Lead interrupted by another lead
        assert_eq!(width(&[0xE2, 0xC3, 0x82]), 1);
        assert_eq!(width(&[0xC3, 0x82]), 2);
    }

    #[test]
    fn decode() {
        let mut buf = [0; MAX_LEN];
        assert_eq!(decode_at(&mut buf, b""), 0);
        assert_eq!(decode_at(&mut buf, b"xyz"), 1);
        assert_eq!(buf[0], b'x');
        assert_eq!(decode_at(&mut buf, "😀".as_bytes()), 4);
        assert_eq!(&buf, "😀".as_bytes());
    }

    /// Walks `s` forward and checks that every step can be undone backward.
    fn check_walk(s: &[u8]) {
        let mut pos = 0;
        while pos < s.len() {
            let n = width(&s[pos..]);
            assert!(n >= 1);
            pos += n;
            assert_eq!(len_backward(&s[..pos]), n, "at {pos} in {s:x?}");
        }
        assert_eq!(pos, s.len());
    }

    proptest! {
        #[test]
        fn forward_matches_char_encoding(c in any::<char>()) {
            let mut buf = [0; 4];
            let s = c.encode_utf8(&mut buf);
            prop_assert_eq!(len(s.as_bytes()[0]), c.len_utf8());
            prop_assert_eq!(width(s.as_bytes()), c.len_utf8());
            prop_assert_eq!(len_backward(s.as_bytes()), c.len_utf8());
        }

        #[test]
        fn walk_text(s in "\\PC*") {
            check_walk(s.as_bytes());
        }

        #[test]
        fn walk_bytes(s in proptest::collection::vec(any::<u8>(), 0..64)) {
            check_walk(&s);
        }
    }
}
