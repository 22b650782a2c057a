//! Memory layout description schema
//!
//! Every target driven by `probe-core` exposes its RAM and flash layout to the
//! debugger. This crate holds the plain description of that layout: the
//! address ranges, the flash geometry the programming engine needs (erase
//! block size, erased value, write alignment, sector buffering) and the YAML
//! format drivers can use to describe a part instead of hard-coding it.
//!
#![warn(missing_docs)]

mod description;
mod memory;
pub(crate) mod serialize;

pub use description::{DescriptionError, TargetDescription};
pub use memory::{check_overlap, MemoryRange, NvmRegion, RamRegion, RegionError};
