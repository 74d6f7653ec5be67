//! # Fixed-Width Key and Value Codecs
//!
//! This module defines how keys and values cross the boundary between typed
//! Rust values and the raw byte windows of a node block. Every key and value
//! in a tree has a fixed byte width known at compile time, which is what lets
//! the node layout place slots at constant strides (see `node`).
//!
//! ## Contract
//!
//! - `encode` writes exactly `WIDTH` bytes at `[pos, pos + WIDTH)` and
//!   touches nothing else in the window.
//! - `decode` reads exactly `WIDTH` bytes from `[pos, pos + WIDTH)`.
//! - Both round-trip: `decode(encode(x)) == x`.
//!
//! The codec surfaces no errors. Handing it a window too small for the slot
//! is a caller bug and panics via the slice bounds check.
//!
//! ## Key ordering
//!
//! Keys additionally need a total order and a debug rendering; both come
//! from the standard `Ord` and `Debug` traits via the `KeyCodec` blanket
//! impl. Ordering is defined on the decoded value, not on the encoded
//! bytes, so integer keys may use their natural little-endian encoding.
//!
//! ## Stock implementations
//!
//! `u32`, `u64` and `i64` encode little-endian; `[u8; N]` stores its bytes
//! verbatim and orders lexicographically, which is the natural fit for
//! fixed-width string keys.

use std::fmt;

/// A value with a fixed encoded width that can be written into and read out
/// of a byte window at a given position.
pub trait Codec: Sized + Clone + 'static {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Writes `self` into `window[pos..pos + WIDTH]`.
    fn encode(&self, window: &mut [u8], pos: usize);

    /// Reads a value back out of `window[pos..pos + WIDTH]`.
    fn decode(window: &[u8], pos: usize) -> Self;
}

/// A codec usable as a tree key: totally ordered and debug-renderable.
pub trait KeyCodec: Codec + Ord + fmt::Debug {}

impl<T: Codec + Ord + fmt::Debug> KeyCodec for T {}

impl Codec for u32 {
    const WIDTH: usize = 4;

    fn encode(&self, window: &mut [u8], pos: usize) {
        window[pos..pos + Self::WIDTH].copy_from_slice(&self.to_le_bytes());
    }

    fn decode(window: &[u8], pos: usize) -> Self {
        let mut raw = [0u8; Self::WIDTH];
        raw.copy_from_slice(&window[pos..pos + Self::WIDTH]);
        u32::from_le_bytes(raw)
    }
}

impl Codec for u64 {
    const WIDTH: usize = 8;

    fn encode(&self, window: &mut [u8], pos: usize) {
        window[pos..pos + Self::WIDTH].copy_from_slice(&self.to_le_bytes());
    }

    fn decode(window: &[u8], pos: usize) -> Self {
        let mut raw = [0u8; Self::WIDTH];
        raw.copy_from_slice(&window[pos..pos + Self::WIDTH]);
        u64::from_le_bytes(raw)
    }
}

impl Codec for i64 {
    const WIDTH: usize = 8;

    fn encode(&self, window: &mut [u8], pos: usize) {
        window[pos..pos + Self::WIDTH].copy_from_slice(&self.to_le_bytes());
    }

    fn decode(window: &[u8], pos: usize) -> Self {
        let mut raw = [0u8; Self::WIDTH];
        raw.copy_from_slice(&window[pos..pos + Self::WIDTH]);
        i64::from_le_bytes(raw)
    }
}

impl<const N: usize> Codec for [u8; N] {
    const WIDTH: usize = N;

    fn encode(&self, window: &mut [u8], pos: usize) {
        window[pos..pos + N].copy_from_slice(self);
    }

    fn decode(window: &[u8], pos: usize) -> Self {
        let mut raw = [0u8; N];
        raw.copy_from_slice(&window[pos..pos + N]);
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u64_round_trips_at_offset() {
        let mut window = [0xAAu8; 24];
        0xDEAD_BEEF_u64.encode(&mut window, 8);

        assert_eq!(u64::decode(&window, 8), 0xDEAD_BEEF);
    }

    #[test]
    fn encode_touches_only_its_slot() {
        let mut window = [0xAAu8; 16];
        7u32.encode(&mut window, 4);

        assert_eq!(&window[..4], &[0xAA; 4]);
        assert_eq!(&window[8..], &[0xAA; 8]);
    }

    #[test]
    fn i64_round_trips_negative_values() {
        let mut window = [0u8; 8];
        (-1i64).encode(&mut window, 0);

        assert_eq!(window, [0xFF; 8]);
        assert_eq!(i64::decode(&window, 0), -1);
    }

    #[test]
    fn byte_array_round_trips() {
        let mut window = [0u8; 20];
        let key = *b"00000042";
        key.encode(&mut window, 3);

        assert_eq!(<[u8; 8]>::decode(&window, 3), key);
    }

    #[test]
    fn byte_array_orders_lexicographically() {
        let a = *b"00000009";
        let b = *b"00000010";

        assert!(a < b);
    }

    #[test]
    fn widths_match_encoded_sizes() {
        assert_eq!(<u32 as Codec>::WIDTH, 4);
        assert_eq!(<u64 as Codec>::WIDTH, 8);
        assert_eq!(<i64 as Codec>::WIDTH, 8);
        assert_eq!(<[u8; 13] as Codec>::WIDTH, 13);
    }
}
