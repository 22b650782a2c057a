use crate::serialize::{hex_option, hex_range, hex_u_int};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Reasons a memory region is rejected when it is registered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, docsplay::Display)]
pub enum RegionError {
    /// The region starting at {start:#010x} is empty.
    Empty {
        /// Start address of the rejected region.
        start: u32,
    },

    /// The region {range:#010x?} overlaps the already registered region {existing:#010x?}.
    Overlap {
        /// Address range of the rejected region.
        range: Range<u32>,
        /// Address range of the region it collides with.
        existing: Range<u32>,
    },

    /// The flash region starting at {start:#010x} has a block size of zero.
    InvalidBlockSize {
        /// Start address of the rejected region.
        start: u32,
    },

    /// The flash region starting at {start:#010x} is not aligned to its write alignment of {align} bytes.
    InvalidAlignment {
        /// Start address of the rejected region.
        start: u32,
        /// The requested write alignment.
        align: u32,
    },

    /// The flash region starting at {start:#010x} cannot be buffered in sectors of {sector_size} bytes.
    InvalidSectorSize {
        /// Start address of the rejected region.
        start: u32,
        /// The requested sector size.
        sector_size: u32,
    },
}

/// Represents a region in RAM.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RamRegion {
    /// A name to describe the region
    #[serde(default)]
    pub name: Option<String>,
    /// Address range of the region
    #[serde(serialize_with = "hex_range")]
    pub range: Range<u32>,
}

impl RamRegion {
    /// Creates an unnamed RAM region covering `range`.
    pub fn new(range: Range<u32>) -> Self {
        Self { name: None, range }
    }

    /// Names the region.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the length of the region in bytes.
    pub fn length(&self) -> u32 {
        self.range.end.saturating_sub(self.range.start)
    }

    /// Checks the region on its own, without looking at its neighbours.
    pub fn validate(&self) -> Result<(), RegionError> {
        ensure_not_empty(&self.range)
    }
}

fn default_erased_byte_value() -> u8 {
    0xff
}

fn default_align() -> u32 {
    1
}

/// Represents a region in non-volatile memory (e.g. flash or EEPROM).
///
/// Besides the address range, this carries the geometry the flash engine
/// needs: the erase block size announced to the debugger, the value an erased
/// byte reads back as, the write alignment and, for devices that can only be
/// programmed a whole sector at a time, the sector size used for buffering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NvmRegion {
    /// A name to describe the region
    #[serde(default)]
    pub name: Option<String>,
    /// Address range of the region
    #[serde(serialize_with = "hex_range")]
    pub range: Range<u32>,
    /// Erase granularity, reported as the `blocksize` property of the memory map.
    #[serde(serialize_with = "hex_u_int")]
    pub block_size: u32,
    /// The value of a byte after it has been erased.
    #[serde(
        default = "default_erased_byte_value",
        serialize_with = "hex_u_int"
    )]
    pub erased_byte_value: u8,
    /// Writes must start and end on a multiple of this many bytes.
    #[serde(default = "default_align")]
    pub align: u32,
    /// When set, writes are collected into sectors of this size and
    /// committed a whole sector at a time. Both ends of `range` must be
    /// multiples of it.
    #[serde(default, serialize_with = "hex_option")]
    pub sector_size: Option<u32>,
}

impl NvmRegion {
    /// Creates an unnamed, unbuffered flash region with byte alignment and an
    /// erased value of `0xff`.
    pub fn new(range: Range<u32>, block_size: u32) -> Self {
        Self {
            name: None,
            range,
            block_size,
            erased_byte_value: default_erased_byte_value(),
            align: default_align(),
            sector_size: None,
        }
    }

    /// Names the region.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the value erased bytes read back as.
    pub fn with_erased_byte_value(mut self, erased_byte_value: u8) -> Self {
        self.erased_byte_value = erased_byte_value;
        self
    }

    /// Sets the write alignment.
    pub fn with_align(mut self, align: u32) -> Self {
        self.align = align;
        self
    }

    /// Switches the region to sector-buffered programming.
    pub fn with_sector_size(mut self, sector_size: u32) -> Self {
        self.sector_size = Some(sector_size);
        self
    }

    /// Returns the length of the region in bytes.
    pub fn length(&self) -> u32 {
        self.range.end.saturating_sub(self.range.start)
    }

    /// Returns whether the region contains the given address.
    pub fn contains(&self, address: u32) -> bool {
        self.range.contains(&address)
    }

    /// Checks the region geometry on its own, without looking at its neighbours.
    pub fn validate(&self) -> Result<(), RegionError> {
        ensure_not_empty(&self.range)?;

        let start = self.range.start;
        if self.block_size == 0 {
            return Err(RegionError::InvalidBlockSize { start });
        }

        let align = self.align;
        if align == 0 || start % align != 0 || self.range.end % align != 0 {
            return Err(RegionError::InvalidAlignment { start, align });
        }

        if let Some(sector_size) = self.sector_size {
            if sector_size == 0 || start % sector_size != 0 || self.range.end % sector_size != 0
            {
                return Err(RegionError::InvalidSectorSize { start, sector_size });
            }
        }

        Ok(())
    }
}

fn ensure_not_empty(range: &Range<u32>) -> Result<(), RegionError> {
    if range.is_empty() {
        Err(RegionError::Empty { start: range.start })
    } else {
        Ok(())
    }
}

/// Rejects `range` if it overlaps any of the `existing` ranges.
pub fn check_overlap<'a>(
    range: &Range<u32>,
    existing: impl IntoIterator<Item = &'a Range<u32>>,
) -> Result<(), RegionError> {
    match existing
        .into_iter()
        .find(|existing| existing.intersects_range(range))
    {
        Some(existing) => Err(RegionError::Overlap {
            range: range.clone(),
            existing: existing.clone(),
        }),
        None => Ok(()),
    }
}

/// Enables the user to do range intersection testing.
pub trait MemoryRange {
    /// Returns true if `self` contains `range` fully.
    fn contains_range(&self, range: &Range<u32>) -> bool;

    /// Returns true if `self` and `range` share at least one address.
    fn intersects_range(&self, range: &Range<u32>) -> bool;
}

impl MemoryRange for Range<u32> {
    fn contains_range(&self, range: &Range<u32>) -> bool {
        if range.is_empty() {
            false
        } else {
            self.start <= range.start && range.end <= self.end
        }
    }

    fn intersects_range(&self, range: &Range<u32>) -> bool {
        !self.is_empty() && !range.is_empty() && self.start < range.end && range.start < self.end
    }
}
