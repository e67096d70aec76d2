use thiserror::Error;

/// Errors that can occur while logging or draining. Marked as non-exhaustive to allow for future
/// additions without breaking the API. Recoverable transport conditions (full outbound buffer, no
/// collector attached) never surface here, they are absorbed by the playback engine.
#[derive(Error, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// `start_page` has to be less than or equal to `end_page`
    #[error("invalid page range")]
    InvalidPageRange,

    /// The page range exceeds the flash capacity or the 32-bit address space
    #[error("page range out of bounds")]
    PageRangeOutOfBounds,

    /// The erase unit has to hold a whole number of records and a record has to be a multiple of
    /// the flash read and write sizes.
    #[error("unsupported flash geometry")]
    UnsupportedGeometry,

    /// The internal error value is returned from the provided `NorFlash`. Once seen, the log stays
    /// faulted until it is recreated.
    #[error("internal flash error")]
    FlashError,

    /// A storage request was issued while the previous one has not signalled completion yet.
    #[error("storage request already in flight")]
    GateBusy,

    /// Appending is not possible while a drain cycle is running.
    #[error("drain in progress")]
    DrainInProgress,

    /// The transport rejected a delivery for a reason other than backpressure.
    #[error("transport failed")]
    TransportFailed,

    /// A drain-completion signal was still rejected after all configured retries.
    #[error("control signal undelivered")]
    ControlSignalUndelivered,
}
