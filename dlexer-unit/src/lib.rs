//! Character cluster codec.
/*!
A *cluster* is the run of bytes that encodes one character in a UTF-8-style
encoding: a lead byte followed by up to three continuation bytes. The regex
engine in `dlexer` reads its input one cluster at a time and rewinds by whole
clusters when it backtracks, so the two directions must agree on every
boundary.

## Features
- [`cluster::len()`]: cluster length from a lead byte
- [`cluster::len_backward()`]: length of the cluster that ends at a cursor
- [`cluster::decode_at()`] and [`Unit`]: copy one cluster out of a byte string

Malformed input is not rejected. A lead byte whose continuation bytes are
missing or wrong degrades to a one-byte cluster, so every byte of any input is
covered by exactly one cluster in either direction.

## Example
```
use dlexer_unit::{cluster, Unit};

let s = "aя€😀".as_bytes();
assert_eq!(cluster::len(s[1]), 2);
assert_eq!(cluster::len_backward(s), 4);

let unit = Unit::decode(&s[3..]).unwrap();
assert_eq!(unit.as_bytes(), "€".as_bytes());
```
*/
pub mod cluster;
mod unit;

pub use unit::Unit;
