//! Single-flight synchronization for erase/program requests.
//!
//! The store reports completion out-of-band (usually from an interrupt handler) through a
//! [`CompletionFlag`]. The gate clears the flag, issues exactly one request and parks the core
//! until the flag is set again.

use crate::error::Error;
use crate::platform::Platform;
use core::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "defmt")]
use defmt::{trace, warn};

/// True iff the most recently issued erase/program request has finished.
///
/// Usually placed in a `static` so the store's completion interrupt can reach it:
///
/// ```
/// use flash_ringlog::CompletionFlag;
///
/// static FLASH_DONE: CompletionFlag = CompletionFlag::new();
///
/// // in the completion interrupt handler
/// FLASH_DONE.signal();
/// assert!(FLASH_DONE.is_complete());
/// ```
#[derive(Debug)]
pub struct CompletionFlag(AtomicBool);

impl CompletionFlag {
    /// Creates an idle flag: nothing is outstanding, so it reads as complete.
    pub const fn new() -> Self {
        Self(AtomicBool::new(true))
    }

    /// Marks the outstanding request as finished. Safe to call from interrupt context.
    pub fn signal(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_complete(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    // must happen strictly before the request that will eventually set it again
    pub(crate) fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for CompletionFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub(crate) enum StoreOp<'a> {
    Erase { page: u32 },
    Program { address: u32, data: &'a [u8] },
}

pub(crate) struct Gate<'f> {
    flag: &'f CompletionFlag,
}

impl<'f> Gate<'f> {
    pub(crate) fn new(flag: &'f CompletionFlag) -> Self {
        Self { flag }
    }

    /// Issues `op` and blocks in the platform's low-power wait until the store signals completion.
    /// There is no timeout: an unresponsive store blocks forever.
    pub(crate) fn request<T: Platform>(&self, hal: &mut T, op: StoreOp<'_>) -> Result<(), Error> {
        if !self.flag.is_complete() {
            #[cfg(feature = "defmt")]
            warn!("gate: request while busy");
            return Err(Error::GateBusy);
        }

        #[cfg(feature = "debug-logs")]
        println!("  gate: request {op:?}");

        self.flag.clear();
        let issued = match op {
            StoreOp::Erase { page } => {
                #[cfg(feature = "defmt")]
                trace!("gate: erase page {}", page);

                let from = page * T::ERASE_SIZE as u32;
                hal.erase(from, from + T::ERASE_SIZE as u32)
            }
            StoreOp::Program { address, data } => {
                #[cfg(feature = "defmt")]
                trace!("gate: program @{:#08x}[{}]", address, data.len());

                hal.write(address, data)
            }
        };

        if issued.is_err() {
            // the store rejected the request, no completion is going to arrive
            self.flag.signal();
            return Err(Error::FlashError);
        }

        while !self.flag.is_complete() {
            hal.wait_for_event();
        }

        Ok(())
    }
}
