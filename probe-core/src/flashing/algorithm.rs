use probe_core_target::NvmRegion;

use super::FlashError;

/// The programming routines a driver provides for one flash region.
///
/// The engine only ever calls these with ranges that lie completely inside
/// `region`. Addresses are absolute target addresses.
pub trait FlashAlgorithm {
    /// Erase `length` bytes starting at `address`.
    fn erase(&mut self, region: &NvmRegion, address: u32, length: u32) -> Result<(), FlashError>;

    /// Program `data` starting at `address`.
    ///
    /// For regions with an alignment above one, `address` and `data.len()`
    /// are multiples of that alignment.
    fn write(&mut self, region: &NvmRegion, address: u32, data: &[u8]) -> Result<(), FlashError>;

    /// Program one whole sector of a sector-buffered region.
    fn write_sector(
        &mut self,
        _region: &NvmRegion,
        _address: u32,
        _data: &[u8],
    ) -> Result<(), FlashError> {
        Err(FlashError::RoutineNotSupported("write_sector"))
    }

    /// Finish a programming session, e.g. verify or re-enable write protection.
    fn done(&mut self, _region: &NvmRegion) -> Result<(), FlashError> {
        Ok(())
    }
}
