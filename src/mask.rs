//! Change-mask allocation and the per-instance bit set.
//!
//! One bit per mutable property ordinal, meaning "explicitly assigned a
//! different value since construction." The shape is fixed per schema and
//! shared by all its instances; each instance owns one mask.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// The narrowest representation holding one bit per mutable property:
/// 8/16/32/64-bit scalar, or ⌈N/8⌉ bytes past 64 properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaskShape {
    U8,
    U16,
    U32,
    U64,
    Bytes(usize),
}

impl MaskShape {
    /// Pick the minimal shape for `count` mutable properties.
    pub fn for_count(count: usize) -> Self {
        match count {
            0..=8 => MaskShape::U8,
            9..=16 => MaskShape::U16,
            17..=32 => MaskShape::U32,
            33..=64 => MaskShape::U64,
            n => MaskShape::Bytes(n.div_ceil(8)),
        }
    }

    /// Bit capacity of the shape.
    pub fn capacity(self) -> usize {
        match self {
            MaskShape::U8 => 8,
            MaskShape::U16 => 16,
            MaskShape::U32 => 32,
            MaskShape::U64 => 64,
            MaskShape::Bytes(len) => len * 8,
        }
    }
}

/// Per-instance change mask. Masks up to 128 properties stay inline; wider
/// schemas spill the byte sequence to the heap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeMask {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Bytes(SmallVec<[u8; 16]>),
}

impl ChangeMask {
    /// A zeroed mask of the given shape.
    pub fn new(shape: MaskShape) -> Self {
        match shape {
            MaskShape::U8 => ChangeMask::U8(0),
            MaskShape::U16 => ChangeMask::U16(0),
            MaskShape::U32 => ChangeMask::U32(0),
            MaskShape::U64 => ChangeMask::U64(0),
            MaskShape::Bytes(len) => ChangeMask::Bytes(SmallVec::from_elem(0, len)),
        }
    }

    /// Set the bit at `ordinal`.
    pub fn set(&mut self, ordinal: usize) {
        match self {
            ChangeMask::U8(bits) => *bits |= 1u8 << ordinal,
            ChangeMask::U16(bits) => *bits |= 1u16 << ordinal,
            ChangeMask::U32(bits) => *bits |= 1u32 << ordinal,
            ChangeMask::U64(bits) => *bits |= 1u64 << ordinal,
            ChangeMask::Bytes(bytes) => bytes[ordinal / 8] |= 1u8 << (ordinal % 8),
        }
    }

    /// Whether the bit at `ordinal` is set.
    pub fn test(&self, ordinal: usize) -> bool {
        match self {
            ChangeMask::U8(bits) => (bits >> ordinal) & 1 == 1,
            ChangeMask::U16(bits) => (bits >> ordinal) & 1 == 1,
            ChangeMask::U32(bits) => (bits >> ordinal) & 1 == 1,
            ChangeMask::U64(bits) => (bits >> ordinal) & 1 == 1,
            ChangeMask::Bytes(bytes) => (bytes[ordinal / 8] >> (ordinal % 8)) & 1 == 1,
        }
    }

    /// Whether any bit is set. Uniform across shapes — byte masks scan for
    /// any nonzero byte.
    pub fn any(&self) -> bool {
        match self {
            ChangeMask::U8(bits) => *bits != 0,
            ChangeMask::U16(bits) => *bits != 0,
            ChangeMask::U32(bits) => *bits != 0,
            ChangeMask::U64(bits) => *bits != 0,
            ChangeMask::Bytes(bytes) => bytes.iter().any(|b| *b != 0),
        }
    }
}
