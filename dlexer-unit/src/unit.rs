use std::{cmp::Ordering, fmt};

use crate::cluster::{self, MAX_LEN};

/// One character cluster, 1 to 4 bytes, stored inline.
///
/// Units order by their bytes. Ranges of units are only meaningful between
/// units of the same [`len`](Unit::len): a one-byte unit never falls inside a
/// range of two-byte units, whatever its value.
///
/// ```
/// use dlexer_unit::Unit;
///
/// let a = Unit::from('а');
/// let ya = Unit::from('я');
/// assert!(a < Unit::from('б') && Unit::from('б') < ya);
/// assert!(Unit::from('б').within(&a, &ya));
/// assert!(!Unit::from('b').within(&a, &ya));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Unit {
    bytes: [u8; MAX_LEN],
    len: u8,
}

#[allow(clippy::len_without_is_empty)]
impl Unit {
    /// Decodes the cluster at the start of `src`, or `None` if `src` is empty.
    pub fn decode(src: &[u8]) -> Option<Self> {
        let mut bytes = [0; MAX_LEN];
        match cluster::decode_at(&mut bytes, src) {
            0 => None,
            len => Some(Self {
                bytes,
                len: len as u8,
            }),
        }
    }

    /// A one-byte unit.
    pub const fn from_byte(b: u8) -> Self {
        Self {
            bytes: [b, 0, 0, 0],
            len: 1,
        }
    }

    /// Byte length, 1 to 4.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len()]
    }

    /// Whether `self` has the same length as `start` and `end` and lies in
    /// `start..=end`.
    #[inline]
    pub fn within(&self, start: &Unit, end: &Unit) -> bool {
        self.len == start.len && self.len == end.len && start <= self && self <= end
    }
}

impl From<char> for Unit {
    fn from(c: char) -> Self {
        let mut bytes = [0; MAX_LEN];
        let len = c.encode_utf8(&mut bytes).len();
        Self {
            bytes,
            len: len as u8,
        }
    }
}

impl AsRef<[u8]> for Unit {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl Ord for Unit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl PartialOrd for Unit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(self.as_bytes()) {
            Ok(s) => write!(f, "{s:?}"),
            Err(_) => write!(f, "{:x?}", self.as_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode() {
        assert_eq!(Unit::decode(b""), None);
        assert_eq!(Unit::decode(b"ab"), Some(Unit::from('a')));
        assert_eq!(Unit::decode("яa".as_bytes()), Some(Unit::from('я')));
        assert_eq!(Unit::decode(&[0xD1]).map(|u| u.len()), Some(1));
    }

    #[test]
    fn order() {
        assert!(Unit::from('a') < Unit::from('b'));
        assert!(Unit::from('z') < Unit::from('а'));
        assert!(Unit::from_byte(b'1').within(&Unit::from('1'), &Unit::from('9')));
        assert!(!Unit::from('я').within(&Unit::from('а'), &Unit::from('ю')));
        assert!(!Unit::from('я').within(&Unit::from('a'), &Unit::from('z')));
    }

    #[test]
    fn debug() {
        assert_eq!(format!("{:?}", Unit::from('я')), r#""я""#);
        assert_eq!(format!("{:?}", Unit::from_byte(0xFF)), "[ff]");
    }
}
