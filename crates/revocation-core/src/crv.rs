//! Certificate Revocation Vectors
//!
//! A CRV is a bit-vector where bit `i` set means "entry `i` is revoked".
//! Revocation is monotonic: vectors only ever grow and bits are only ever
//! set, which is why the one combining operation offered here is a union.
//!
//! Vectors travel compressed. [`CrvCodec`] is the codec contract the log
//! depends on; [`RunLengthCodec`] is the canonical implementation. The
//! commitment hash a CA signs is taken over the codec output, so encoding
//! must be deterministic: equal vectors always compress to equal bytes.

use std::fmt;

use crate::error::{Result, RevocationError};

/// Largest capacity a decoded vector may claim (32 MiB of bits)
pub const MAX_CRV_CAPACITY: u64 = 1 << 28;

/// Certificate Revocation Vector
///
/// Bits are stored little-endian within each byte: position `8k + j` lives in
/// byte `k`, bit `j`. Bits beyond `capacity` are always zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Crv {
    bits: Vec<u8>,
    capacity: u64,
}

impl Crv {
    /// Create an all-zero vector with room for `capacity` bits
    pub fn new(capacity: u64) -> Self {
        Self {
            bits: vec![0; byte_len(capacity)],
            capacity,
        }
    }

    /// Create a vector with the given positions set
    ///
    /// The capacity is the smallest whole number of bytes covering every
    /// position, so `{1, 3}` yields an 8-bit vector.
    pub fn from_positions(positions: &[u64]) -> Self {
        let mut crv = Self::default();
        for &pos in positions {
            crv.set(pos);
        }
        crv
    }

    /// Number of bits this vector covers
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Whether `pos` is marked revoked
    pub fn is_set(&self, pos: u64) -> bool {
        if pos >= self.capacity {
            return false;
        }
        self.bits[(pos / 8) as usize] & (1 << (pos % 8)) != 0
    }

    /// Mark `pos` revoked, growing to the next byte boundary if needed
    pub fn set(&mut self, pos: u64) {
        if pos >= self.capacity {
            self.grow((pos / 8 + 1) * 8);
        }
        self.bits[(pos / 8) as usize] |= 1 << (pos % 8);
    }

    /// Grow to at least `capacity` bits. Never shrinks.
    pub fn grow(&mut self, capacity: u64) {
        if capacity > self.capacity {
            self.bits.resize(byte_len(capacity), 0);
            self.capacity = capacity;
        }
    }

    /// Bitwise union: bit `i` is set iff it is set in either operand
    ///
    /// The result covers the larger of the two capacities.
    pub fn union(&self, other: &Crv) -> Crv {
        let (larger, smaller) = if self.capacity >= other.capacity {
            (self, other)
        } else {
            (other, self)
        };
        let mut merged = larger.clone();
        for (dst, src) in merged.bits.iter_mut().zip(&smaller.bits) {
            *dst |= *src;
        }
        merged
    }

    /// Whether every bit set here is also set in `other`
    pub fn is_subset_of(&self, other: &Crv) -> bool {
        self.positions().all(|pos| other.is_set(pos))
    }

    /// Iterate over the set positions in ascending order
    pub fn positions(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.capacity).filter(move |&pos| self.is_set(pos))
    }

    /// Number of revoked entries
    pub fn count(&self) -> u64 {
        self.bits.iter().map(|b| u64::from(b.count_ones())).sum()
    }

    /// Whether no position is set
    pub fn is_clear(&self) -> bool {
        self.bits.iter().all(|b| *b == 0)
    }
}

/// Renders the highest position first, so `{1, 3}` over 8 bits is `00001010`
impl fmt::Display for Crv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pos in (0..self.capacity).rev() {
            f.write_str(if self.is_set(pos) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

fn byte_len(capacity: u64) -> usize {
    capacity.div_ceil(8) as usize
}

// =============================================================================
// Codec
// =============================================================================

/// Compression contract for CRVs
///
/// `compress` must be deterministic and `decompress` must reject any input
/// that `compress` could not have produced.
pub trait CrvCodec: Send + Sync + fmt::Debug {
    /// Compress a vector into its wire form
    fn compress(&self, crv: &Crv) -> Vec<u8>;

    /// Decode a wire-form vector
    fn decompress(&self, bytes: &[u8]) -> Result<Crv>;
}

/// Run-length CRV codec
///
/// Layout: a format byte, the capacity as a LEB128 varint, then alternating
/// run lengths (varints) starting with a run of clear bits. Only the first run
/// may be empty and the runs must sum to the capacity exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunLengthCodec;

impl RunLengthCodec {
    /// Format byte identifying this encoding
    pub const FORMAT: u8 = 0x01;
}

impl CrvCodec for RunLengthCodec {
    fn compress(&self, crv: &Crv) -> Vec<u8> {
        let mut out = vec![Self::FORMAT];
        write_varint(&mut out, crv.capacity);

        let mut current = false;
        let mut run = 0u64;
        for pos in 0..crv.capacity {
            if crv.is_set(pos) == current {
                run += 1;
            } else {
                write_varint(&mut out, run);
                current = !current;
                run = 1;
            }
        }
        if crv.capacity > 0 {
            write_varint(&mut out, run);
        }
        out
    }

    fn decompress(&self, bytes: &[u8]) -> Result<Crv> {
        let (&format, mut rest) = bytes
            .split_first()
            .ok_or_else(|| RevocationError::InvalidEncoding("empty input".into()))?;
        if format != Self::FORMAT {
            return Err(RevocationError::InvalidEncoding(format!(
                "unknown format byte 0x{:02x}",
                format
            )));
        }

        let capacity = read_varint(&mut rest)?;
        if capacity > MAX_CRV_CAPACITY {
            return Err(RevocationError::InvalidEncoding(format!(
                "capacity {} exceeds maximum {}",
                capacity, MAX_CRV_CAPACITY
            )));
        }

        if capacity == 0 && !rest.is_empty() {
            return Err(RevocationError::InvalidEncoding(
                "runs present for an empty vector".into(),
            ));
        }

        let mut crv = Crv::new(capacity);
        let mut pos = 0u64;
        let mut set = false;
        let mut first = true;
        while !rest.is_empty() {
            let run = read_varint(&mut rest)?;
            if run == 0 && !first {
                return Err(RevocationError::InvalidEncoding(
                    "empty run after the first".into(),
                ));
            }
            let end = pos
                .checked_add(run)
                .filter(|end| *end <= capacity)
                .ok_or_else(|| {
                    RevocationError::InvalidEncoding("runs exceed capacity".into())
                })?;
            if set {
                for p in pos..end {
                    crv.set(p);
                }
            }
            pos = end;
            set = !set;
            first = false;
        }

        if pos != capacity {
            return Err(RevocationError::InvalidEncoding(format!(
                "runs cover {} of {} bits",
                pos, capacity
            )));
        }
        Ok(crv)
    }
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
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

fn read_varint(input: &mut &[u8]) -> Result<u64> {
    let mut value = 0u64;
    for shift in (0..64).step_by(7) {
        let (&byte, rest) = input
            .split_first()
            .ok_or_else(|| RevocationError::InvalidEncoding("truncated varint".into()))?;
        *input = rest;

        let bits = u64::from(byte & 0x7f);
        if shift == 63 && bits > 1 {
            return Err(RevocationError::InvalidEncoding("varint overflow".into()));
        }
        value |= bits << shift;

        if byte & 0x80 == 0 {
            // Reject padded encodings so every value has one representation
            if byte == 0 && shift > 0 {
                return Err(RevocationError::InvalidEncoding(
                    "non-minimal varint".into(),
                ));
            }
            return Ok(value);
        }
    }
    Err(RevocationError::InvalidEncoding("varint too long".into()))
}
