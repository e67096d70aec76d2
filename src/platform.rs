use embedded_storage::nor_flash::NorFlash;

/// A page-erasable store together with the low-power wait primitive used while a storage request
/// is in flight. See README.md for an example implementation.
pub trait Platform: NorFlash {
    /// Parks the core until the next event or interrupt arrives (`wfe` on Cortex-M). Spurious
    /// wakeups are fine, the caller re-checks its condition.
    fn wait_for_event(&mut self);
}

impl<T: Platform> Platform for &mut T {
    fn wait_for_event(&mut self) {
        T::wait_for_event(self)
    }
}

pub trait AlignedOps: Platform {
    fn is_read_aligned(size: usize) -> bool {
        align_ceil(size, Self::READ_SIZE) == size
    }

    fn is_write_aligned(size: usize) -> bool {
        align_ceil(size, Self::WRITE_SIZE) == size
    }
}

#[inline(always)]
const fn align_ceil(size: usize, alignment: usize) -> usize {
    if alignment.is_power_of_two() {
        size.saturating_add(alignment - 1) & !(alignment - 1)
    } else {
        size.saturating_add(alignment - 1) / alignment * alignment
    }
}

impl<T: Platform> AlignedOps for T {}

#[cfg(any(
    feature = "esp32",
    feature = "esp32s2",
    feature = "esp32s3",
    feature = "esp32c2",
    feature = "esp32c3",
    feature = "esp32c6",
    feature = "esp32h2",
))]
mod chip {
    use crate::gate::CompletionFlag;
    use crate::platform::Platform;
    use embedded_storage::nor_flash::{ErrorType, NorFlash, ReadNorFlash};
    use esp_storage::{FlashStorage, FlashStorageError};

    /// The ESP flash driver blocks until an erase or program has finished, so completion is
    /// signalled as soon as the call returns.
    pub struct EspStore<'d, 'f> {
        inner: FlashStorage<'d>,
        completion: &'f CompletionFlag,
    }

    impl<'d, 'f> EspStore<'d, 'f> {
        pub fn new(inner: FlashStorage<'d>, completion: &'f CompletionFlag) -> Self {
            Self { inner, completion }
        }
    }

    impl ErrorType for EspStore<'_, '_> {
        type Error = FlashStorageError;
    }

    impl NorFlash for EspStore<'_, '_> {
        const WRITE_SIZE: usize = FlashStorage::WRITE_SIZE;
        const ERASE_SIZE: usize = FlashStorage::ERASE_SIZE;

        fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
            self.inner.erase(from, to)?;
            self.completion.signal();
            Ok(())
        }

        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            self.inner.write(offset, bytes)?;
            self.completion.signal();
            Ok(())
        }
    }

    impl ReadNorFlash for EspStore<'_, '_> {
        const READ_SIZE: usize = FlashStorage::READ_SIZE;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            self.inner.read(offset, bytes)
        }

        fn capacity(&self) -> usize {
            self.inner.capacity()
        }
    }

    impl Platform for EspStore<'_, '_> {
        fn wait_for_event(&mut self) {
            core::hint::spin_loop();
        }
    }
}

#[cfg(any(
    feature = "esp32",
    feature = "esp32s2",
    feature = "esp32s3",
    feature = "esp32c2",
    feature = "esp32c3",
    feature = "esp32c6",
    feature = "esp32h2",
))]
pub use chip::*;
