use thiserror::Error;

use crate::SlotId;

/// Errors that can occur when operating a [`Pool`][crate::Pool].
///
/// Running out of free slots or acquiring from a closed pool are not errors; those are reported
/// as `None` by the acquire methods.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A pooled object refused to initialize. The pool has been rolled back: every slot was torn
    /// down and the pool is closed until the next successful `init()`.
    #[error("failed to initialize pooled object in slot {slot}")]
    Initialize {
        /// The slot whose object failed to initialize. Slots before it had initialized
        /// successfully; slots after it were not attempted.
        slot: SlotId,

        /// The error reported by the pooled object.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
