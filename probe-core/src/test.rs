//! Helpers for testing the crate

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use probe_core_target::NvmRegion;

use crate::driver::{HaltReason, HwBreakpoints, HwWatchpoints, TargetDriver, WatchKind};
use crate::flashing::{FlashAlgorithm, FlashError};
use crate::Error;

/// A call made on a [`MockDriver`]. Memory accesses are not recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DriverCall {
    Attach,
    Detach,
    RegsRead,
    RegsWrite,
    Reset,
    HaltRequest,
    HaltWait,
    HaltResume { step: bool },
    HostioReply { retcode: i32, errcode: u32 },
    SetHwBp { address: u32, len: u8 },
    ClearHwBp { address: u32, len: u8 },
    SetHwWp { kind: WatchKind, address: u32, len: u8 },
    ClearHwWp { kind: WatchKind, address: u32, len: u8 },
    CheckHwWp,
}

#[derive(Debug, Default)]
struct DriverState {
    calls: Vec<DriverCall>,
    memory: HashMap<u32, u8>,
    fail_attach: bool,
    last_watchpoint: Option<u32>,
}

/// A driver backed by simulated memory which records every other call.
///
/// Clones share their state, so a test can keep a clone to inspect the
/// driver after handing it to a target.
#[derive(Debug, Clone)]
pub(crate) struct MockDriver {
    name: String,
    hardware_debug: bool,
    state: Rc<RefCell<DriverState>>,
}

impl MockDriver {
    const REGS_SIZE: usize = 17 * 4;

    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hardware_debug: false,
            state: Rc::default(),
        }
    }

    /// A driver which also offers hardware breakpoints and watchpoints.
    pub(crate) fn with_hardware_debug(name: impl Into<String>) -> Self {
        Self {
            hardware_debug: true,
            ..Self::new(name)
        }
    }

    pub(crate) fn fail_attach(&self) {
        self.state.borrow_mut().fail_attach = true;
    }

    pub(crate) fn calls(&self) -> Vec<DriverCall> {
        self.state.borrow().calls.clone()
    }

    /// Returns `true` once every other clone of this driver has been dropped.
    pub(crate) fn dropped(&self) -> bool {
        Rc::strong_count(&self.state) == 1
    }

    fn record(&self, call: DriverCall) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl TargetDriver for MockDriver {
    fn driver_name(&self) -> &str {
        &self.name
    }

    fn regs_size(&self) -> usize {
        Self::REGS_SIZE
    }

    fn attach(&mut self) -> Result<(), Error> {
        self.record(DriverCall::Attach);
        if self.state.borrow().fail_attach {
            return Err(anyhow::anyhow!("{} did not respond", self.name).into());
        }
        Ok(())
    }

    fn detach(&mut self) -> Result<(), Error> {
        self.record(DriverCall::Detach);
        Ok(())
    }

    fn check_error(&mut self) -> bool {
        false
    }

    fn mem_read(&mut self, address: u32, data: &mut [u8]) -> Result<(), Error> {
        let state = self.state.borrow();
        for (offset, byte) in data.iter_mut().enumerate() {
            let address = address.wrapping_add(offset as u32);
            *byte = state.memory.get(&address).copied().unwrap_or(0);
        }
        Ok(())
    }

    fn mem_write(&mut self, address: u32, data: &[u8]) -> Result<(), Error> {
        let mut state = self.state.borrow_mut();
        for (offset, byte) in data.iter().enumerate() {
            state
                .memory
                .insert(address.wrapping_add(offset as u32), *byte);
        }
        Ok(())
    }

    fn regs_read(&mut self, data: &mut [u8]) -> Result<(), Error> {
        self.record(DriverCall::RegsRead);
        data.fill(0);
        Ok(())
    }

    fn regs_write(&mut self, _data: &[u8]) -> Result<(), Error> {
        self.record(DriverCall::RegsWrite);
        Ok(())
    }

    fn reset(&mut self) -> Result<(), Error> {
        self.record(DriverCall::Reset);
        Ok(())
    }

    fn halt_request(&mut self) -> Result<(), Error> {
        self.record(DriverCall::HaltRequest);
        Ok(())
    }

    fn halt_wait(&mut self) -> Result<HaltReason, Error> {
        self.record(DriverCall::HaltWait);
        Ok(HaltReason::Request)
    }

    fn halt_resume(&mut self, step: bool) -> Result<(), Error> {
        self.record(DriverCall::HaltResume { step });
        Ok(())
    }

    fn hostio_reply(&mut self, retcode: i32, errcode: u32) -> Result<(), Error> {
        self.record(DriverCall::HostioReply { retcode, errcode });
        Ok(())
    }

    fn hw_breakpoints(&mut self) -> Option<&mut dyn HwBreakpoints> {
        if self.hardware_debug {
            Some(self)
        } else {
            None
        }
    }

    fn hw_watchpoints(&mut self) -> Option<&mut dyn HwWatchpoints> {
        if self.hardware_debug {
            Some(self)
        } else {
            None
        }
    }
}

impl HwBreakpoints for MockDriver {
    fn set_hw_bp(&mut self, address: u32, len: u8) -> Result<(), Error> {
        self.record(DriverCall::SetHwBp { address, len });
        Ok(())
    }

    fn clear_hw_bp(&mut self, address: u32, len: u8) -> Result<(), Error> {
        self.record(DriverCall::ClearHwBp { address, len });
        Ok(())
    }
}

impl HwWatchpoints for MockDriver {
    fn set_hw_wp(&mut self, kind: WatchKind, address: u32, len: u8) -> Result<(), Error> {
        self.record(DriverCall::SetHwWp { kind, address, len });
        self.state.borrow_mut().last_watchpoint = Some(address);
        Ok(())
    }

    fn clear_hw_wp(&mut self, kind: WatchKind, address: u32, len: u8) -> Result<(), Error> {
        self.record(DriverCall::ClearHwWp { kind, address, len });
        Ok(())
    }

    /// Reports a hit on the most recently set watchpoint.
    fn check_hw_wp(&mut self) -> Result<Option<u32>, Error> {
        self.record(DriverCall::CheckHwWp);
        Ok(self.state.borrow().last_watchpoint)
    }
}

/// A call made on a [`MockFlash`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FlashCall {
    Erase { address: u32, length: u32 },
    Write { address: u32, length: u32 },
    WriteSector { address: u32, length: u32 },
    Done,
}

#[derive(Debug, Default)]
struct FlashState {
    /// Programmed bytes; everything else reads as erased.
    memory: BTreeMap<u32, u8>,
    calls: Vec<FlashCall>,
    failing: Vec<u32>,
    fail_done: bool,
}

impl FlashState {
    fn check(&self, name: &'static str, address: u32) -> Result<(), FlashError> {
        if self.failing.contains(&address) {
            Err(FlashError::RoutineCallFailed {
                name,
                error_code: 1,
            })
        } else {
            Ok(())
        }
    }

    fn program(&mut self, address: u32, data: &[u8]) {
        for (offset, byte) in data.iter().enumerate() {
            self.memory.insert(address + offset as u32, *byte);
        }
    }
}

/// A flash algorithm programming a simulated backing store.
///
/// Clones share the backing store, so one store can serve several regions.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockFlash {
    state: Rc<RefCell<FlashState>>,
}

impl MockFlash {
    const ERASED: u8 = 0xff;

    /// Makes every routine called with `address` as its start address fail.
    pub(crate) fn fail_at(&self, address: u32) {
        self.state.borrow_mut().failing.push(address);
    }

    pub(crate) fn fail_done(&self) {
        self.state.borrow_mut().fail_done = true;
    }

    /// Fills a range with non-erased content without recording a call.
    pub(crate) fn program_garbage(&self, address: u32, length: u32) {
        let garbage: Vec<u8> = (0..length).map(|i| (i as u8) ^ 0xa5).collect();
        self.state.borrow_mut().program(address, &garbage);
    }

    pub(crate) fn read(&self, address: u32, length: usize) -> Vec<u8> {
        let state = self.state.borrow();
        (0..length as u32)
            .map(|offset| {
                state
                    .memory
                    .get(&(address + offset))
                    .copied()
                    .unwrap_or(Self::ERASED)
            })
            .collect()
    }

    pub(crate) fn calls(&self) -> Vec<FlashCall> {
        self.state.borrow().calls.clone()
    }

    /// Start addresses of every committed sector, in order.
    pub(crate) fn sector_writes(&self) -> Vec<u32> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                FlashCall::WriteSector { address, .. } => Some(*address),
                _ => None,
            })
            .collect()
    }
}

impl FlashAlgorithm for MockFlash {
    fn erase(&mut self, _region: &NvmRegion, address: u32, length: u32) -> Result<(), FlashError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(FlashCall::Erase { address, length });
        state.check("erase", address)?;

        let end = address + length;
        let programmed: Vec<u32> = state.memory.range(address..end).map(|(a, _)| *a).collect();
        for address in programmed {
            state.memory.remove(&address);
        }
        Ok(())
    }

    fn write(&mut self, _region: &NvmRegion, address: u32, data: &[u8]) -> Result<(), FlashError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(FlashCall::Write {
            address,
            length: data.len() as u32,
        });
        state.check("write", address)?;
        state.program(address, data);
        Ok(())
    }

    fn write_sector(
        &mut self,
        region: &NvmRegion,
        address: u32,
        data: &[u8],
    ) -> Result<(), FlashError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(FlashCall::WriteSector {
            address,
            length: data.len() as u32,
        });
        assert_eq!(Some(data.len() as u32), region.sector_size);
        state.check("write_sector", address)?;
        state.program(address, data);
        Ok(())
    }

    fn done(&mut self, _region: &NvmRegion) -> Result<(), FlashError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(FlashCall::Done);
        if state.fail_done {
            return Err(FlashError::RoutineCallFailed {
                name: "done",
                error_code: 1,
            });
        }
        Ok(())
    }
}
