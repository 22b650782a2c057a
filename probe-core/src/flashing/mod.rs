//! Flash erasing and programming.
//!
//! A target owns a list of [`FlashRegion`]s, each with its own
//! [`FlashAlgorithm`]. The engine resolves which region owns an address,
//! splits requests at region boundaries, pads writes to the region's write
//! alignment and, for regions that can only be programmed a whole sector at
//! a time, collects the data into sectors first.
//!
//! ## Programming a target
//!
//! ```
//! use probe_core::flashing::{FlashAlgorithm, FlashError};
//! use probe_core::{NvmRegion, Target};
//! # use probe_core::{Error, HaltReason, TargetDriver};
//! # struct Driver;
//! # impl TargetDriver for Driver {
//! #     fn driver_name(&self) -> &str { "demo" }
//! #     fn regs_size(&self) -> usize { 0 }
//! #     fn attach(&mut self) -> Result<(), Error> { Ok(()) }
//! #     fn detach(&mut self) -> Result<(), Error> { Ok(()) }
//! #     fn check_error(&mut self) -> bool { false }
//! #     fn mem_read(&mut self, _: u32, _: &mut [u8]) -> Result<(), Error> { Ok(()) }
//! #     fn mem_write(&mut self, _: u32, _: &[u8]) -> Result<(), Error> { Ok(()) }
//! #     fn regs_read(&mut self, _: &mut [u8]) -> Result<(), Error> { Ok(()) }
//! #     fn regs_write(&mut self, _: &[u8]) -> Result<(), Error> { Ok(()) }
//! #     fn reset(&mut self) -> Result<(), Error> { Ok(()) }
//! #     fn halt_request(&mut self) -> Result<(), Error> { Ok(()) }
//! #     fn halt_wait(&mut self) -> Result<HaltReason, Error> { Ok(HaltReason::Request) }
//! #     fn halt_resume(&mut self, _: bool) -> Result<(), Error> { Ok(()) }
//! #     fn hostio_reply(&mut self, _: i32, _: u32) -> Result<(), Error> { Ok(()) }
//! # }
//! # struct Algorithm;
//! # impl FlashAlgorithm for Algorithm {
//! #     fn erase(&mut self, _: &NvmRegion, _: u32, _: u32) -> Result<(), FlashError> { Ok(()) }
//! #     fn write(&mut self, _: &NvmRegion, _: u32, _: &[u8]) -> Result<(), FlashError> { Ok(()) }
//! # }
//!
//! let mut target = Target::new(Driver);
//! target.add_flash(NvmRegion::new(0x0800_0000..0x0801_0000, 0x400), Algorithm)?;
//!
//! target.flash_erase(0x0800_0000, 0x800)?;
//! target.flash_write(0x0800_0000, &[0x1, 0x2, 0x3])?;
//! target.flash_done()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod algorithm;
mod error;
mod region;

use std::ops::Range;

pub use algorithm::FlashAlgorithm;
pub use error::FlashError;
pub use region::FlashRegion;

use crate::Target;

impl Target {
    /// Returns the flash region containing `address`.
    pub fn flash_region_for(&self, address: u32) -> Option<&FlashRegion> {
        self.flash
            .iter()
            .find(|flash| flash.region().contains(address))
    }

    fn flash_index_for(&self, address: u64) -> Option<usize> {
        let address = u32::try_from(address).ok()?;
        self.flash
            .iter()
            .position(|flash| flash.region().contains(address))
    }

    /// Checks that every byte of `address..end` belongs to a flash region,
    /// possibly spread over several regions.
    fn check_flash_range(&self, address: u64, end: u64) -> Result<(), FlashError> {
        let mut address = address;
        while address < end {
            match self.flash_index_for(address) {
                Some(index) => address = u64::from(self.flash[index].region().range.end),
                None => return Err(FlashError::AddressNotMapped { address }),
            }
        }
        Ok(())
    }

    /// Splits `address..address + length` at flash region boundaries and
    /// calls `operation` for every piece.
    ///
    /// All pieces are attempted even if some fail; the first failure is
    /// returned. Nothing is attempted if part of the range is not flash.
    fn for_each_flash_chunk(
        &mut self,
        address: u32,
        length: u64,
        mut operation: impl FnMut(&mut FlashRegion, u32, Range<usize>) -> Result<(), FlashError>,
    ) -> Result<(), FlashError> {
        let mut address = u64::from(address);
        let end = address + length;
        self.check_flash_range(address, end)?;

        let mut first_error = None;
        let mut offset = 0;
        while address < end {
            let index = self
                .flash_index_for(address)
                .ok_or(FlashError::AddressNotMapped { address })?;
            let flash = &mut self.flash[index];

            let chunk = end.min(u64::from(flash.region().range.end)) - address;
            let data = offset..offset + chunk as usize;

            if let Err(error) = operation(flash, address as u32, data) {
                tracing::warn!(
                    "Flash operation on {:#x} bytes at {:#010x} failed: {}",
                    chunk,
                    address,
                    error
                );
                first_error.get_or_insert(error);
            }

            address += chunk;
            offset += chunk as usize;
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Erases `length` bytes of flash starting at `address`.
    ///
    /// The range may span several flash regions; each region's algorithm
    /// only sees the part inside that region.
    pub fn flash_erase(&mut self, address: u32, length: u32) -> Result<(), FlashError> {
        tracing::debug!("Erasing {:#x} bytes at {:#010x}", length, address);
        self.for_each_flash_chunk(address, u64::from(length), |flash, address, data| {
            flash.erase(address, data.len() as u32)
        })
    }

    /// Programs `data` into flash starting at `address`.
    ///
    /// The data may span several flash regions. Sector-buffered regions keep
    /// their last sector in memory until [`Target::flash_done`] is called.
    pub fn flash_write(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError> {
        tracing::debug!("Writing {:#x} bytes at {:#010x}", data.len(), address);
        self.for_each_flash_chunk(address, data.len() as u64, |flash, address, range| {
            flash.program(address, &data[range])
        })
    }

    /// Ends a programming session: commits buffered sectors and runs every
    /// region's `done` routine, stopping at the first failure.
    pub fn flash_done(&mut self) -> Result<(), FlashError> {
        tracing::debug!("Finishing flash programming on {}", self.driver_name());
        for flash in &mut self.flash {
            flash.finish()?;
        }
        Ok(())
    }
}
