use std::fmt;

use once_cell::unsync::OnceCell;
use probe_core_target::{check_overlap, NvmRegion, RamRegion, TargetDescription};

use crate::command::CommandTable;
use crate::driver::{HaltReason, Support, TargetDriver, WatchKind};
use crate::flashing::{FlashAlgorithm, FlashRegion};
use crate::Error;

/// Called when the owner of an attached target loses its claim, either
/// because someone else attaches the target or because it is destroyed.
pub type DestroyCallback = Box<dyn FnOnce(&mut Target)>;

/// One attached or attachable device.
///
/// A target owns its driver, its memory layout, the command tables drivers
/// registered on it and the memory map generated from the layout. Everything
/// is released when the target is dropped; a pending destroy callback is run
/// first.
pub struct Target {
    pub(crate) driver: Box<dyn TargetDriver>,
    pub(crate) ram: Vec<RamRegion>,
    pub(crate) flash: Vec<FlashRegion>,
    pub(crate) commands: Vec<CommandTable>,
    pub(crate) memory_map: OnceCell<String>,
    attached: bool,
    destroy_callback: Option<DestroyCallback>,
}

impl Target {
    /// Creates a target without any memory regions or commands.
    pub fn new(driver: impl TargetDriver + 'static) -> Self {
        Self::from_boxed(Box::new(driver))
    }

    /// Creates a target from an already boxed driver.
    pub fn from_boxed(driver: Box<dyn TargetDriver>) -> Self {
        Self {
            driver,
            ram: Vec::new(),
            flash: Vec::new(),
            commands: Vec::new(),
            memory_map: OnceCell::new(),
            attached: false,
            destroy_callback: None,
        }
    }

    /// Name of the driver controlling this target.
    pub fn driver_name(&self) -> &str {
        self.driver.driver_name()
    }

    /// Target description XML for the debugger, or an empty string.
    pub fn target_description(&self) -> &str {
        self.driver.target_description().unwrap_or("")
    }

    /// Size of the register file in bytes.
    pub fn regs_size(&self) -> usize {
        self.driver.regs_size()
    }

    /// Returns `true` while a debug session holds the target.
    pub fn attached(&self) -> bool {
        self.attached
    }

    /// RAM regions, most recently added first.
    pub fn ram_regions(&self) -> &[RamRegion] {
        &self.ram
    }

    /// Flash regions, most recently added first.
    pub fn flash_regions(&self) -> &[FlashRegion] {
        &self.flash
    }

    fn check_new_region(&self, range: &std::ops::Range<u32>) -> Result<(), Error> {
        let existing = self
            .ram
            .iter()
            .map(|ram| &ram.range)
            .chain(self.flash.iter().map(|flash| &flash.region().range));
        check_overlap(range, existing)?;

        if self.memory_map.get().is_some() {
            tracing::warn!(
                "Region {:#010x?} added after the memory map of {} was generated, it will not be reported",
                range,
                self.driver_name()
            );
        }

        Ok(())
    }

    /// Adds a RAM region.
    ///
    /// The region must not be empty and must not overlap any region already
    /// known to the target.
    pub fn add_ram(&mut self, region: RamRegion) -> Result<(), Error> {
        region.validate()?;
        self.check_new_region(&region.range)?;

        tracing::debug!("Adding RAM region {:#010x?}", region.range);
        self.ram.insert(0, region);
        Ok(())
    }

    /// Adds a flash region programmed through `algorithm`.
    ///
    /// Besides the overlap check done for RAM, the flash geometry is
    /// validated as well.
    pub fn add_flash(
        &mut self,
        region: NvmRegion,
        algorithm: impl FlashAlgorithm + 'static,
    ) -> Result<(), Error> {
        self.add_flash_region(FlashRegion::new(region, algorithm))
    }

    /// Adds an already assembled flash region.
    pub fn add_flash_region(&mut self, flash: FlashRegion) -> Result<(), Error> {
        flash.region().validate()?;
        self.check_new_region(&flash.region().range)?;

        tracing::debug!(
            "Adding flash region {:#010x?} with block size {:#x}",
            flash.region().range,
            flash.region().block_size
        );
        self.flash.insert(0, flash);
        Ok(())
    }

    /// Adds every region of a description, asking `algorithm_for` for the
    /// algorithm programming each flash region.
    ///
    /// Stops at the first region that is rejected; regions added before it
    /// stay registered.
    pub fn add_description(
        &mut self,
        description: &TargetDescription,
        mut algorithm_for: impl FnMut(&NvmRegion) -> Box<dyn FlashAlgorithm>,
    ) -> Result<(), Error> {
        for ram in &description.ram {
            self.add_ram(ram.clone())?;
        }

        for flash in &description.flash {
            let algorithm = algorithm_for(flash);
            self.add_flash_region(FlashRegion::from_boxed(flash.clone(), algorithm))?;
        }

        Ok(())
    }

    /// Claims the target for a new owner.
    ///
    /// The destroy callback of the previous owner, if any, runs first. The new
    /// callback is installed even if the driver then fails to attach.
    pub fn attach(&mut self, destroy_callback: Option<DestroyCallback>) -> Result<(), Error> {
        if let Some(previous) = self.destroy_callback.take() {
            tracing::debug!("Releasing previous owner of {}", self.driver_name());
            previous(self);
        }

        self.destroy_callback = destroy_callback;

        self.driver.attach()?;
        self.attached = true;

        tracing::debug!("Attached to {}", self.driver_name());
        Ok(())
    }

    /// Releases the target at the end of a session.
    ///
    /// The target counts as detached afterwards even if the driver reported
    /// an error.
    pub fn detach(&mut self) -> Result<(), Error> {
        let result = self.driver.detach();
        self.attached = false;

        tracing::debug!("Detached from {}", self.driver_name());
        result
    }

    /// Returns and clears the sticky error flag of the link.
    pub fn check_error(&mut self) -> bool {
        self.driver.check_error()
    }

    /// Read target memory starting at `address` into `data`.
    pub fn mem_read(&mut self, address: u32, data: &mut [u8]) -> Result<(), Error> {
        self.driver.mem_read(address, data)
    }

    /// Write `data` to target memory starting at `address`.
    pub fn mem_write(&mut self, address: u32, data: &[u8]) -> Result<(), Error> {
        self.driver.mem_write(address, data)
    }

    /// Read a little-endian 32 bit word.
    pub fn mem_read32(&mut self, address: u32) -> Result<u32, Error> {
        let mut bytes = [0u8; 4];
        self.mem_read(address, &mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Read a little-endian 16 bit word.
    pub fn mem_read16(&mut self, address: u32) -> Result<u16, Error> {
        let mut bytes = [0u8; 2];
        self.mem_read(address, &mut bytes)?;
        Ok(u16::from_le_bytes(bytes))
    }

    /// Read a single byte.
    pub fn mem_read8(&mut self, address: u32) -> Result<u8, Error> {
        let mut byte = 0;
        self.mem_read(address, std::slice::from_mut(&mut byte))?;
        Ok(byte)
    }

    /// Write a little-endian 32 bit word.
    pub fn mem_write32(&mut self, address: u32, value: u32) -> Result<(), Error> {
        self.mem_write(address, &value.to_le_bytes())
    }

    /// Write a little-endian 16 bit word.
    pub fn mem_write16(&mut self, address: u32, value: u16) -> Result<(), Error> {
        self.mem_write(address, &value.to_le_bytes())
    }

    /// Write a single byte.
    pub fn mem_write8(&mut self, address: u32, value: u8) -> Result<(), Error> {
        self.mem_write(address, &[value])
    }

    /// Read the register file into `data`, which should be [`Target::regs_size`] bytes long.
    pub fn regs_read(&mut self, data: &mut [u8]) -> Result<(), Error> {
        self.driver.regs_read(data)
    }

    /// Write the register file from `data`.
    pub fn regs_write(&mut self, data: &[u8]) -> Result<(), Error> {
        self.driver.regs_write(data)
    }

    /// Reset the target.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.driver.reset()
    }

    /// Ask the target to halt without waiting for it.
    pub fn halt_request(&mut self) -> Result<(), Error> {
        self.driver.halt_request()
    }

    /// Poll whether the target has halted and why.
    pub fn halt_wait(&mut self) -> Result<HaltReason, Error> {
        self.driver.halt_wait()
    }

    /// Resume execution, or execute a single instruction if `step` is set.
    pub fn halt_resume(&mut self, step: bool) -> Result<(), Error> {
        self.driver.halt_resume(step)
    }

    /// Complete a pending semihosting request of the target.
    pub fn hostio_reply(&mut self, retcode: i32, errcode: u32) -> Result<(), Error> {
        self.driver.hostio_reply(retcode, errcode)
    }

    /// Set a hardware breakpoint covering `len` bytes at `address`.
    pub fn set_hw_bp(&mut self, address: u32, len: u8) -> Result<Support<()>, Error> {
        match self.driver.hw_breakpoints() {
            Some(breakpoints) => breakpoints.set_hw_bp(address, len).map(Support::Supported),
            None => Ok(Support::Unsupported),
        }
    }

    /// Remove a hardware breakpoint set by [`Target::set_hw_bp`].
    pub fn clear_hw_bp(&mut self, address: u32, len: u8) -> Result<Support<()>, Error> {
        match self.driver.hw_breakpoints() {
            Some(breakpoints) => breakpoints.clear_hw_bp(address, len).map(Support::Supported),
            None => Ok(Support::Unsupported),
        }
    }

    /// Set a hardware watchpoint of the given kind covering `len` bytes at `address`.
    pub fn set_hw_wp(
        &mut self,
        kind: WatchKind,
        address: u32,
        len: u8,
    ) -> Result<Support<()>, Error> {
        match self.driver.hw_watchpoints() {
            Some(watchpoints) => watchpoints
                .set_hw_wp(kind, address, len)
                .map(Support::Supported),
            None => Ok(Support::Unsupported),
        }
    }

    /// Remove a hardware watchpoint set by [`Target::set_hw_wp`].
    pub fn clear_hw_wp(
        &mut self,
        kind: WatchKind,
        address: u32,
        len: u8,
    ) -> Result<Support<()>, Error> {
        match self.driver.hw_watchpoints() {
            Some(watchpoints) => watchpoints
                .clear_hw_wp(kind, address, len)
                .map(Support::Supported),
            None => Ok(Support::Unsupported),
        }
    }

    /// Returns the data address of the last watchpoint hit.
    pub fn check_hw_wp(&mut self) -> Result<Support<Option<u32>>, Error> {
        match self.driver.hw_watchpoints() {
            Some(watchpoints) => watchpoints.check_hw_wp().map(Support::Supported),
            None => Ok(Support::Unsupported),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("driver", &self.driver_name())
            .field("attached", &self.attached)
            .field("ram", &self.ram)
            .field("flash", &self.flash)
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

impl Drop for Target {
    fn drop(&mut self) {
        if let Some(destroy) = self.destroy_callback.take() {
            destroy(self);
        }

        for flash in &self.flash {
            if let Some(address) = flash.pending_sector() {
                tracing::warn!(
                    "Discarding unwritten flash sector at {:#010x} of {}",
                    address,
                    self.driver_name()
                );
            }
        }

        tracing::debug!("Destroyed target {}", self.driver_name());
    }
}
