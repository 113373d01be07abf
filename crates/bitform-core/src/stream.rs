//! C1 — bit-addressed, random-access input stream (spec §4.1).
//!
//! Every read takes an absolute bit address; there is no cursor. Reads are
//! pure functions of `(bytes, addr, len, endian)`, so the stream may be
//! shared re-entrantly by every field of a parser (spec §5).

use crate::endian::Endian;
use crate::error::StreamError;
use bytes::Bytes;
use std::fmt;
use std::path::Path;

/// Character set used to decode a string field's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// 7-bit ASCII; any byte with the high bit set is a decode error.
    Ascii,
    /// ISO-8859-1: every byte maps directly to the codepoint of the same
    /// value, so decoding never fails.
    Latin1,
    /// Strict UTF-8.
    Utf8,
}

impl Charset {
    pub const fn name(self) -> &'static str {
        match self {
            Charset::Ascii => "ascii",
            Charset::Latin1 => "latin1",
            Charset::Utf8 => "utf-8",
        }
    }

    fn decode(self, bytes: &[u8]) -> Result<String, ()> {
        match self {
            Charset::Ascii => {
                if bytes.iter().any(|b| *b >= 0x80) {
                    return Err(());
                }
                Ok(bytes.iter().map(|b| *b as char).collect())
            }
            Charset::Latin1 => Ok(bytes.iter().map(|b| *b as char).collect()),
            Charset::Utf8 => std::str::from_utf8(bytes).map(str::to_owned).map_err(|_| ()),
        }
    }
}

/// How a string field's length is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringMode {
    /// Exactly this many bytes, no terminator.
    Fixed(u64),
    /// Reads bytes until (and including) a NUL; the NUL is not part of the
    /// decoded value.
    NulTerminated,
    /// An `8`/`16`/`32`-bit unsigned length prefix in the given endianness,
    /// followed by that many bytes.
    LengthPrefixed { width: u8, endian: Endian },
}

/// The result of a successful string read: the decoded text and how many
/// bits of the stream it (and its terminator/prefix) occupied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringRead {
    pub text: String,
    pub size_bits: u64,
}

/// Renders raw bytes as `\xNN`-escaped text, used as the display fallback
/// when a strict charset decode fails (spec §4.1's "backslash-replace").
pub fn backslash_escape(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 4);
    for b in bytes {
        if b.is_ascii_graphic() || *b == b' ' {
            out.push(*b as char);
        } else {
            out.push_str(&format!("\\x{b:02x}"));
        }
    }
    out
}

/// An immutable, byte-addressable source of bits.
///
/// Construct with [`InputStream::from_path`] or [`InputStream::from_bytes`].
/// The whole input is read up front, so `total_bits()` is always known for
/// this implementation (spec §3 allows "unknown until EOF" for streaming
/// sources, which this in-memory engine does not need).
#[derive(Clone)]
pub struct InputStream {
    bytes: Bytes,
}

impl fmt::Debug for InputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputStream")
            .field("total_bits", &self.total_bits())
            .finish()
    }
}

impl InputStream {
    /// Reads the entire file at `path` into memory.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self::from_bytes(data))
    }

    /// Wraps an in-memory buffer. Accepts anything convertible to
    /// [`bytes::Bytes`] (a `Vec<u8>`, `&'static [u8]`, or `Bytes` itself).
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self { bytes: data.into() }
    }

    /// Total size of the stream, in bits.
    pub fn total_bits(&self) -> u64 {
        self.bytes.len() as u64 * 8
    }

    /// Total size of the stream, in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn check_bounds(&self, addr: u64, len: u64) -> Result<(), StreamError> {
        let total = self.total_bits();
        if addr.saturating_add(len) > total {
            return Err(StreamError::UnderRun {
                addr,
                len,
                stream_len: total,
            });
        }
        Ok(())
    }

    fn bit_at(&self, pos: u64) -> u8 {
        let byte = self.bytes[(pos / 8) as usize];
        let bit_idx = pos % 8;
        (byte >> (7 - bit_idx)) & 1
    }

    /// Reads `n` bits (`1..=64`) at absolute bit address `addr`, packed per
    /// `endian`, and returns them as an unsigned integer.
    pub fn read_bits(&self, addr: u64, n: u8, endian: Endian) -> Result<u64, StreamError> {
        debug_assert!((1..=64).contains(&n), "read_bits: n must be 1..=64");
        self.check_bounds(addr, u64::from(n))?;

        let mut value: u64 = 0;
        for i in 0..u64::from(n) {
            value = (value << 1) | u64::from(self.bit_at(addr + i));
        }

        // Sub-byte spans have no well-defined byte order to swap; only
        // byte-aligned multi-byte spans are affected by endianness.
        if endian == Endian::Little && n % 8 == 0 && n > 8 {
            let nbytes = usize::from(n / 8);
            let mut swapped: u64 = 0;
            for i in 0..nbytes {
                let byte = (value >> (8 * (nbytes - 1 - i))) & 0xFF;
                swapped |= byte << (8 * i);
            }
            return Ok(swapped);
        }
        Ok(value)
    }

    /// Reads `len` raw bytes at absolute bit address `addr`. `addr` must be
    /// byte-aligned.
    pub fn read_bytes(&self, addr: u64, len: u64) -> Result<Bytes, StreamError> {
        if addr % 8 != 0 {
            return Err(StreamError::Alignment { addr });
        }
        self.check_bounds(addr, len * 8)?;
        let start = (addr / 8) as usize;
        let end = start + len as usize;
        Ok(self.bytes.slice(start..end))
    }

    /// Reads an integer of `bit_size` bits (`1..=64`) at `addr`.
    ///
    /// Sizes that are a multiple of 8 are equivalent to [`Self::read_bytes`]
    /// followed by the corresponding endian-aware decode; sub-byte sizes
    /// fall back to bit-level extraction via [`Self::read_bits`].
    pub fn read_integer(
        &self,
        addr: u64,
        signed: bool,
        bit_size: u8,
        endian: Endian,
    ) -> Result<i128, StreamError> {
        let raw = self.read_bits(addr, bit_size, endian)?;
        if !signed {
            return Ok(i128::from(raw));
        }
        if bit_size == 64 {
            return Ok(i128::from(raw as i64));
        }
        let shift = 64 - u32::from(bit_size);
        let signed_value = ((raw << shift) as i64) >> shift;
        Ok(i128::from(signed_value))
    }

    /// Reads a string at `addr` per `mode`, decoding with `charset`.
    /// `strip` optionally names a set of characters trimmed from both ends
    /// once decoded (only meaningful for [`StringMode::Fixed`]).
    pub fn read_string(
        &self,
        addr: u64,
        charset: Charset,
        mode: StringMode,
        strip: Option<&str>,
    ) -> Result<StringRead, StreamError> {
        match mode {
            StringMode::Fixed(len) => {
                let bytes = self.read_bytes(addr, len)?;
                let text = charset
                    .decode(&bytes)
                    .map_err(|()| StreamError::Decode {
                        charset: charset.name(),
                        addr,
                    })?;
                let text = match strip {
                    Some(chars) => text.trim_matches(|c| chars.contains(c)).to_owned(),
                    None => text,
                };
                Ok(StringRead {
                    text,
                    size_bits: len * 8,
                })
            }
            StringMode::NulTerminated => {
                if addr % 8 != 0 {
                    return Err(StreamError::Alignment { addr });
                }
                let start = (addr / 8) as usize;
                let total = self.bytes.len();
                let mut end = start;
                while end < total && self.bytes[end] != 0 {
                    end += 1;
                }
                if end >= total {
                    return Err(StreamError::UnderRun {
                        addr,
                        len: 8,
                        stream_len: self.total_bits(),
                    });
                }
                let text = charset
                    .decode(&self.bytes[start..end])
                    .map_err(|()| StreamError::Decode {
                        charset: charset.name(),
                        addr,
                    })?;
                Ok(StringRead {
                    text,
                    size_bits: (end - start + 1) as u64 * 8,
                })
            }
            StringMode::LengthPrefixed { width, endian } => {
                let len = self.read_bits(addr, width, endian)?;
                let data_addr = addr + u64::from(width);
                let bytes = self.read_bytes(data_addr, len)?;
                let text = charset
                    .decode(&bytes)
                    .map_err(|()| StreamError::Decode {
                        charset: charset.name(),
                        addr: data_addr,
                    })?;
                Ok(StringRead {
                    text,
                    size_bits: u64::from(width) + len * 8,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_bits_big_endian_matches_bytes() {
        let stream = InputStream::from_bytes(vec![0x01, 0x23, 0x45, 0x67]);
        let v = stream.read_bits(0, 32, Endian::Big).unwrap();
        assert_eq!(v, 0x0123_4567);
    }

    #[test]
    fn read_bits_little_endian_swaps_bytes() {
        let stream = InputStream::from_bytes(vec![0x01, 0x23, 0x45, 0x67]);
        let v = stream.read_bits(0, 32, Endian::Little).unwrap();
        assert_eq!(v, 0x6745_2301);
    }

    #[test]
    fn read_bits_sub_byte_ignores_endian() {
        // 0b1011_0000 -> top 4 bits = 0b1011 = 11, regardless of endian.
        let stream = InputStream::from_bytes(vec![0b1011_0000]);
        assert_eq!(stream.read_bits(0, 4, Endian::Big).unwrap(), 0b1011);
        assert_eq!(stream.read_bits(0, 4, Endian::Little).unwrap(), 0b1011);
    }

    #[test]
    fn read_bytes_requires_alignment() {
        let stream = InputStream::from_bytes(vec![0xFFu8]);
        assert!(matches!(
            stream.read_bytes(1, 1),
            Err(StreamError::Alignment { addr: 1 })
        ));
    }

    #[test]
    fn under_run_is_reported() {
        let stream = InputStream::from_bytes(vec![0x00u8]);
        assert!(matches!(
            stream.read_bits(0, 16, Endian::Big),
            Err(StreamError::UnderRun { .. })
        ));
    }

    #[test]
    fn read_integer_signed_sub_byte() {
        // 5-bit field holding -1 (0b11111).
        let stream = InputStream::from_bytes(vec![0b1111_1000]);
        let v = stream.read_integer(0, true, 5, Endian::Big).unwrap();
        assert_eq!(v, -1);
    }

    #[test]
    fn read_string_fixed() {
        let stream = InputStream::from_bytes(b"hello".to_vec());
        let r = stream
            .read_string(0, Charset::Ascii, StringMode::Fixed(5), None)
            .unwrap();
        assert_eq!(r.text, "hello");
        assert_eq!(r.size_bits, 40);
    }

    #[test]
    fn read_string_nul_terminated() {
        let stream = InputStream::from_bytes(b"abc\0def".to_vec());
        let r = stream
            .read_string(0, Charset::Ascii, StringMode::NulTerminated, None)
            .unwrap();
        assert_eq!(r.text, "abc");
        assert_eq!(r.size_bits, 32);
    }

    #[test]
    fn read_string_length_prefixed() {
        // u8 length prefix of 3, then "xyz".
        let stream = InputStream::from_bytes(vec![3, b'x', b'y', b'z']);
        let r = stream
            .read_string(
                0,
                Charset::Ascii,
                StringMode::LengthPrefixed {
                    width: 8,
                    endian: Endian::Big,
                },
                None,
            )
            .unwrap();
        assert_eq!(r.text, "xyz");
        assert_eq!(r.size_bits, 8 + 24);
    }

    #[test]
    fn backslash_escape_renders_control_bytes() {
        assert_eq!(backslash_escape(&[b'A', 0x00, b'B']), "A\\x00B");
    }
}
