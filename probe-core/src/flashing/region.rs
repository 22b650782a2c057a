use std::fmt::{Debug, Formatter};

use probe_core_target::NvmRegion;

use super::{FlashAlgorithm, FlashError};

/// The sector currently being collected by a buffered write session.
struct SectorBuffer {
    data: Vec<u8>,
    /// Base address of the sector held in `data`, `None` until the first write.
    address: Option<u32>,
}

/// A flash region of a target: its description, the algorithm programming
/// it and, while a buffered write session is open, the sector buffer.
pub struct FlashRegion {
    region: NvmRegion,
    algorithm: Box<dyn FlashAlgorithm>,
    buffer: Option<SectorBuffer>,
}

impl Debug for FlashRegion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashRegion")
            .field("region", &self.region)
            .field("pending_sector", &self.pending_sector())
            .finish_non_exhaustive()
    }
}

/// Allocates a buffer of `size` bytes filled with `value`, reporting
/// allocation failure instead of aborting.
pub(super) fn filled_buffer(size: usize, value: u8) -> Result<Vec<u8>, FlashError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(size)
        .map_err(|_| FlashError::OutOfMemory { size })?;
    buffer.resize(size, value);
    Ok(buffer)
}

impl FlashRegion {
    /// Creates a flash region programmed through `algorithm`.
    pub fn new(region: NvmRegion, algorithm: impl FlashAlgorithm + 'static) -> Self {
        Self::from_boxed(region, Box::new(algorithm))
    }

    /// Creates a flash region from an already boxed algorithm.
    pub fn from_boxed(region: NvmRegion, algorithm: Box<dyn FlashAlgorithm>) -> Self {
        Self {
            region,
            algorithm,
            buffer: None,
        }
    }

    /// Returns the description of the region.
    pub fn region(&self) -> &NvmRegion {
        &self.region
    }

    /// Returns `true` if writes to this region are collected into whole sectors.
    pub fn is_buffered(&self) -> bool {
        self.region.sector_size.is_some()
    }

    /// Base address of the sector waiting in the buffer, if any.
    pub fn pending_sector(&self) -> Option<u32> {
        self.buffer.as_ref().and_then(|buffer| buffer.address)
    }

    pub(super) fn erase(&mut self, address: u32, length: u32) -> Result<(), FlashError> {
        tracing::trace!("Erasing {:#x} bytes at {:#010x}", length, address);
        self.algorithm.erase(&self.region, address, length)
    }

    /// Programs data that lies completely inside this region, either directly
    /// or through the sector buffer.
    pub(super) fn program(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError> {
        if self.is_buffered() {
            return self.write_buffered(address, data);
        }

        let align = self.region.align;
        if align <= 1 {
            tracing::trace!("Writing {:#x} bytes at {:#010x}", data.len(), address);
            return self.algorithm.write(&self.region, address, data);
        }

        // Pad both ends up to the alignment with the erased value, so bytes
        // outside the request stay untouched on the device.
        let offset = (address % align) as usize;
        let size = (offset + data.len()).next_multiple_of(align as usize);
        let mut padded = filled_buffer(size, self.region.erased_byte_value)?;
        padded[offset..offset + data.len()].copy_from_slice(data);

        let start = address - offset as u32;
        tracing::trace!("Writing {:#x} padded bytes at {:#010x}", size, start);
        self.algorithm.write(&self.region, start, &padded)
    }

    /// Collects `data` into the sector buffer, committing a sector through
    /// [`FlashAlgorithm::write_sector`] whenever the data moves on to a
    /// different sector.
    ///
    /// The last sector is only committed by [`FlashRegion::done_buffered`].
    /// If committing a sector fails, the remaining data is still collected
    /// and the first error is returned.
    pub fn write_buffered(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError> {
        let Some(sector_size) = self.region.sector_size else {
            return Err(FlashError::RoutineNotSupported("write_buffered"));
        };

        let end = u64::from(address) + data.len() as u64;
        if !self.region.contains(address) || end > u64::from(self.region.range.end) {
            let address = if self.region.contains(address) {
                u64::from(self.region.range.end)
            } else {
                u64::from(address)
            };
            return Err(FlashError::AddressNotMapped { address });
        }

        if self.buffer.is_none() {
            self.buffer = Some(SectorBuffer {
                data: filled_buffer(sector_size as usize, self.region.erased_byte_value)?,
                address: None,
            });
        }

        let mut first_error = None;
        let mut address = address;
        let mut remaining = data;

        while !remaining.is_empty() {
            let offset = address % sector_size;
            let base = address - offset;

            if self.pending_sector() != Some(base) {
                if let Err(error) = self.flush_sector() {
                    first_error.get_or_insert(error);
                }
                if let Some(buffer) = self.buffer.as_mut() {
                    buffer.data.fill(self.region.erased_byte_value);
                    buffer.address = Some(base);
                }
            }

            let length = ((sector_size - offset) as usize).min(remaining.len());
            if let Some(buffer) = self.buffer.as_mut() {
                buffer.data[offset as usize..offset as usize + length]
                    .copy_from_slice(&remaining[..length]);
            }

            address = address.wrapping_add(length as u32);
            remaining = &remaining[length..];
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Commits the buffered sector, if there is one, and leaves the buffer
    /// without a current sector.
    fn flush_sector(&mut self) -> Result<(), FlashError> {
        let Some(buffer) = self.buffer.as_mut() else {
            return Ok(());
        };
        let Some(address) = buffer.address.take() else {
            return Ok(());
        };

        tracing::trace!("Committing sector at {:#010x}", address);
        self.algorithm
            .write_sector(&self.region, address, &buffer.data)
    }

    /// Commits the last buffered sector and releases the buffer.
    ///
    /// Does nothing if no buffered write session is open.
    pub fn done_buffered(&mut self) -> Result<(), FlashError> {
        let result = self.flush_sector();
        self.buffer = None;
        result
    }

    /// Ends a programming session on this region: commits the buffered
    /// sector and runs the algorithm's `done` routine.
    pub(super) fn finish(&mut self) -> Result<(), FlashError> {
        self.done_buffered()?;
        self.algorithm.done(&self.region)
    }
}
