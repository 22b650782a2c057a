use crate::Error;

/// The reason a target reported when it stopped, as returned by
/// [`TargetDriver::halt_wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HaltReason {
    /// The target is still running.
    Running,
    /// The driver lost track of the target.
    Error,
    /// The target stopped because a halt was requested.
    Request,
    /// A single step completed.
    Stepping,
    /// A breakpoint was hit.
    Breakpoint,
    /// A watchpoint was hit.
    Watchpoint,
    /// The target faulted.
    Fault,
}

/// The kind of access a hardware watchpoint triggers on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKind {
    /// Trigger on writes.
    Write,
    /// Trigger on reads.
    Read,
    /// Trigger on reads and writes.
    Access,
}

/// Outcome of an optional capability.
///
/// A driver without the capability is not an error: the call simply had no
/// effect, which callers can tell apart from a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support<T> {
    /// The driver implements the capability and the call succeeded.
    Supported(T),
    /// The driver does not implement the capability.
    Unsupported,
}

impl<T> Support<T> {
    /// Returns `true` if the driver implements the capability.
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported(_))
    }

    /// Converts into an `Option`, mapping [`Support::Unsupported`] to `None`.
    pub fn supported(self) -> Option<T> {
        match self {
            Self::Supported(value) => Some(value),
            Self::Unsupported => None,
        }
    }
}

/// The capability table every MCU driver implements.
///
/// All methods block until the underlying transport operation has finished.
/// Optional capabilities are exposed through the `hw_*` accessors, which
/// return `None` unless the driver overrides them.
pub trait TargetDriver {
    /// Name of the driver, shown to the user when targets are listed.
    fn driver_name(&self) -> &str;

    /// Target description XML handed to the debugger, if the driver has one.
    fn target_description(&self) -> Option<&str> {
        None
    }

    /// Size of the register file in bytes, as read by [`TargetDriver::regs_read`].
    fn regs_size(&self) -> usize;

    /// Claim the target for a debug session.
    fn attach(&mut self) -> Result<(), Error>;

    /// Release the target at the end of a debug session.
    fn detach(&mut self) -> Result<(), Error>;

    /// Returns and clears the sticky error flag of the link.
    fn check_error(&mut self) -> bool;

    /// Read target memory starting at `address` into `data`.
    fn mem_read(&mut self, address: u32, data: &mut [u8]) -> Result<(), Error>;

    /// Write `data` to target memory starting at `address`.
    fn mem_write(&mut self, address: u32, data: &[u8]) -> Result<(), Error>;

    /// Read the whole register file into `data`.
    fn regs_read(&mut self, data: &mut [u8]) -> Result<(), Error>;

    /// Write the whole register file from `data`.
    fn regs_write(&mut self, data: &[u8]) -> Result<(), Error>;

    /// Reset the target.
    fn reset(&mut self) -> Result<(), Error>;

    /// Ask the target to halt, without waiting for it.
    fn halt_request(&mut self) -> Result<(), Error>;

    /// Poll whether the target has halted and why.
    fn halt_wait(&mut self) -> Result<HaltReason, Error>;

    /// Resume execution, or execute a single instruction if `step` is set.
    fn halt_resume(&mut self, step: bool) -> Result<(), Error>;

    /// Complete a pending semihosting request of the target.
    fn hostio_reply(&mut self, retcode: i32, errcode: u32) -> Result<(), Error>;

    /// Hardware breakpoint support, if the target has comparators for it.
    fn hw_breakpoints(&mut self) -> Option<&mut dyn HwBreakpoints> {
        None
    }

    /// Hardware watchpoint support, if the target has comparators for it.
    fn hw_watchpoints(&mut self) -> Option<&mut dyn HwWatchpoints> {
        None
    }
}

/// Optional hardware breakpoint capability of a [`TargetDriver`].
pub trait HwBreakpoints {
    /// Set a breakpoint covering `len` bytes at `address`.
    fn set_hw_bp(&mut self, address: u32, len: u8) -> Result<(), Error>;

    /// Remove a breakpoint previously set at `address`.
    fn clear_hw_bp(&mut self, address: u32, len: u8) -> Result<(), Error>;
}

/// Optional hardware watchpoint capability of a [`TargetDriver`].
pub trait HwWatchpoints {
    /// Set a watchpoint of the given kind covering `len` bytes at `address`.
    fn set_hw_wp(&mut self, kind: WatchKind, address: u32, len: u8) -> Result<(), Error>;

    /// Remove a watchpoint previously set at `address`.
    fn clear_hw_wp(&mut self, kind: WatchKind, address: u32, len: u8) -> Result<(), Error>;

    /// Returns the data address that triggered the last watchpoint hit, if any.
    fn check_hw_wp(&mut self) -> Result<Option<u32>, Error>;
}
