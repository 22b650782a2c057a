/// Describes any error that happened while erasing or programming flash.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum FlashError {
    /// Address {address:#010x} is not mapped to any flash region.
    AddressNotMapped {
        /// The first address of the request not claimed by a flash region.
        address: u64,
    },

    /// The execution of '{name}' failed with code {error_code}.
    RoutineCallFailed {
        /// Name of the flash routine.
        name: &'static str,
        /// The code the driver reported.
        error_code: u32,
    },

    /// The '{0}' routine is not supported by this flash algorithm.
    RoutineNotSupported(&'static str),

    /// Failed to allocate a {size} byte flash buffer.
    OutOfMemory {
        /// Requested buffer size in bytes.
        size: usize,
    },

    /// The flash driver reported an error.
    Driver(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl FlashError {
    /// Wraps an error reported by a flash driver.
    pub fn driver(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Driver(Box::new(e))
    }
}
