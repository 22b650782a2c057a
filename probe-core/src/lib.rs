//! # Target abstraction core of a debug probe
//!
//! `probe-core` sits between the transport talking to the silicon and the
//! debug protocol talking to the debugger. Drivers for individual parts
//! create [`Target`]s, describe their RAM and flash layout and register
//! target specific commands on them; the debugger side attaches to a target
//! from the [`Registry`] and drives it through a uniform interface.
//!
//! # Examples
//!
//! ## Listing and attaching targets
//!
//! ```
//! use probe_core::{Registry, Target, RamRegion};
//! # use probe_core::{Error, HaltReason, TargetDriver};
//! # struct Stm32;
//! # impl TargetDriver for Stm32 {
//! #     fn driver_name(&self) -> &str { "STM32F4" }
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
//!
//! let mut registry = Registry::new();
//!
//! // A driver found a part during the scan.
//! let mut target = Target::new(Stm32);
//! target.add_ram(RamRegion::new(0x2000_0000..0x2002_0000))?;
//! registry.create(target);
//!
//! registry.for_each(|ordinal, target| println!("{ordinal}: {}", target.driver_name()));
//!
//! let target = registry.attach_n(1, None)?;
//! assert!(target.memory_map().starts_with("<memory-map>"));
//! # Ok::<(), Error>(())
//! ```

pub mod command;
#[warn(missing_docs)]
mod driver;
#[warn(missing_docs)]
mod error;
#[warn(missing_docs)]
pub mod flashing;
mod memory_map;
mod registry;
mod target;
#[cfg(test)]
mod test;

pub use crate::command::{Command, CommandError, CommandHandler};
pub use crate::driver::{HaltReason, HwBreakpoints, HwWatchpoints, Support, TargetDriver, WatchKind};
pub use crate::error::Error;
pub use crate::memory_map::memory_map;
pub use crate::registry::{Registry, TargetId};
pub use crate::target::{DestroyCallback, Target};

pub use probe_core_target::{
    DescriptionError, MemoryRange, NvmRegion, RamRegion, RegionError, TargetDescription,
};
