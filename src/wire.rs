//! Wire buffer plumbing for the two pipelines
//!
//! [`WireWriter`] accumulates the bytes of one layer's header. It carries
//! partial bytes between consecutive bit fields and records typed holes for
//! fields whose value is computed only after the full byte range is known
//! (lengths, checksums). [`WireReader`] is the mirror image for dissection:
//! it consumes a prefix of the captured bytes and deliberately tolerates
//! truncated input by consuming whatever is available.

/// Byte order of a fixed-width integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// Patch ordering for deferred fields. All `Length` holes are patched
/// before any `Checksum` hole, so a checksum always covers final length
/// bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PatchPhase {
    Length,
    Checksum,
}

/// A placeholder left in the output by a deferred field, zero-filled until
/// the patch pass replaces it.
#[derive(Debug, Clone)]
pub struct Hole {
    /// Byte offset within the layer's header.
    pub offset: usize,
    /// Width in bytes.
    pub width: usize,
    /// Index of the owning field in the packet type's field list.
    pub field: usize,
    pub phase: PatchPhase,
}

/// Encode an unsigned integer at a fixed wire width.
pub fn uint_to_bytes(value: u64, width: usize, endian: Endian) -> Vec<u8> {
    let be = value.to_be_bytes();
    let mut out = be[8 - width..].to_vec();
    if endian == Endian::Little {
        out.reverse();
    }
    out
}

/// Decode an unsigned integer from up to 8 bytes.
pub fn uint_from_bytes(bytes: &[u8], endian: Endian) -> u64 {
    let mut v = 0u64;
    match endian {
        Endian::Big => {
            for b in bytes {
                v = (v << 8) | *b as u64;
            }
        }
        Endian::Little => {
            for b in bytes.iter().rev() {
                v = (v << 8) | *b as u64;
            }
        }
    }
    v
}

#[derive(Debug, Default)]
pub struct WireWriter {
    out: Vec<u8>,
    holes: Vec<Hole>,
    bit_acc: u64,
    bit_cnt: u32,
    field: usize,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called by the pipeline before each field's emit, so holes know their
    /// owning field.
    pub(crate) fn set_field(&mut self, index: usize) {
        self.field = index;
    }

    /// Byte length emitted so far, not counting a pending partial byte.
    pub fn byte_len(&self) -> usize {
        self.out.len()
    }

    /// Append whole bytes, flushing any partial bit carry first.
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.flush_bits();
        self.out.extend_from_slice(bytes);
    }

    pub fn put_uint(&mut self, value: u64, width: usize, endian: Endian) {
        let bytes = uint_to_bytes(value, width, endian);
        self.put_bytes(&bytes);
    }

    /// Append `nbits` bits of `value`, most significant first. Whole bytes
    /// are emitted as soon as the carry crosses a byte boundary.
    pub fn put_bits(&mut self, value: u64, nbits: u32) {
        debug_assert!(nbits <= 32);
        let mask = if nbits == 64 { u64::MAX } else { (1u64 << nbits) - 1 };
        self.bit_acc = (self.bit_acc << nbits) | (value & mask);
        self.bit_cnt += nbits;
        while self.bit_cnt >= 8 {
            self.bit_cnt -= 8;
            self.out.push((self.bit_acc >> self.bit_cnt) as u8);
        }
    }

    /// Pad a pending partial byte with zero bits. A no-op at byte
    /// boundaries.
    pub fn flush_bits(&mut self) {
        if self.bit_cnt > 0 {
            let pad = 8 - self.bit_cnt;
            self.bit_acc <<= pad;
            self.out.push(self.bit_acc as u8);
            self.bit_cnt = 0;
        }
        self.bit_acc = 0;
    }

    /// Reserve a zero-filled hole to be patched after assembly.
    pub fn put_hole(&mut self, width: usize, phase: PatchPhase) {
        self.flush_bits();
        self.holes.push(Hole {
            offset: self.out.len(),
            width,
            field: self.field,
            phase,
        });
        self.out.extend(std::iter::repeat(0u8).take(width));
    }

    /// Flush and return the header bytes plus the recorded holes.
    pub fn finish(mut self) -> (Vec<u8>, Vec<Hole>) {
        self.flush_bits();
        (self.out, self.holes)
    }
}

#[derive(Debug)]
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
    /// Bit offset within the byte at `pos`, 0..8.
    bit_off: u32,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            bit_off: 0,
        }
    }

    /// Bytes not yet fully consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Skip a partially consumed byte so the next read is byte aligned.
    fn align(&mut self) {
        if self.bit_off > 0 {
            self.pos += 1;
            self.bit_off = 0;
        }
    }

    /// Take up to `n` bytes; fewer if the input is truncated.
    pub fn take(&mut self, n: usize) -> &'a [u8] {
        self.align();
        let end = core::cmp::min(self.pos + n, self.data.len());
        let out = &self.data[self.pos..end];
        self.pos = end;
        out
    }

    /// Everything left, byte aligned.
    pub fn rest(&mut self) -> &'a [u8] {
        self.align();
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }

    /// Read a fixed-width integer; a short read interprets the available
    /// bytes only.
    pub fn take_uint(&mut self, width: usize, endian: Endian) -> u64 {
        let bytes = self.take(width);
        uint_from_bytes(bytes, endian)
    }

    /// Read `nbits` bits, most significant first, straddling byte
    /// boundaries. Missing bits read as zero.
    pub fn take_bits(&mut self, nbits: u32) -> u64 {
        let mut v = 0u64;
        for _ in 0..nbits {
            let bit = if self.pos < self.data.len() {
                (self.data[self.pos] >> (7 - self.bit_off)) & 1
            } else {
                0
            };
            v = (v << 1) | bit as u64;
            self.bit_off += 1;
            if self.bit_off == 8 {
                self.bit_off = 0;
                self.pos += 1;
            }
        }
        v
    }
}
