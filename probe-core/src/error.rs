use crate::command::CommandError;
use crate::flashing::FlashError;
use crate::registry::TargetId;
use probe_core_target::RegionError;

/// The overarching error type which contains all possible errors as variants.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum Error {
    /// No target is registered with ordinal {0}.
    TargetNotFound(usize),
    /// The target {0:?} is no longer registered.
    UnknownTarget(TargetId),
    /// The memory region was rejected.
    Region(#[from] RegionError),
    /// A flash operation failed.
    Flash(#[from] FlashError),
    /// A target command failed.
    Command(#[from] CommandError),
    /// The target driver reported an error.
    Driver(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Some uncategorized error occurred.
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Wraps an error reported by a target driver.
    pub fn driver(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Driver(Box::new(e))
    }
}
