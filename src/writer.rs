use crate::error::Error;
use crate::gate::{Gate, StoreOp};
use crate::geometry::{Cursor, Geometry};
use crate::platform::Platform;
use crate::record::{RECORD_WORDS, Record};
#[cfg(feature = "defmt")]
use defmt::{debug, trace};

/// Emitted whenever the writer erases a page before writing into it. Whatever the drain anchor
/// pointed at on `page` is gone; the oldest surviving data now starts at `oldest_valid`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PageErased {
    pub page: u32,
    pub oldest_valid: u32,
}

#[derive(Copy, Clone, Debug)]
struct WriteState {
    cursor: Cursor,
    wrap_count: u32,
}

/// Appends fixed-size records, rotating through the page range. The cursor lives in RAM only and
/// is set up lazily by the first append since boot.
pub(crate) struct Writer {
    state: Option<WriteState>,
}

impl Writer {
    pub(crate) fn new() -> Self {
        Self { state: None }
    }

    pub(crate) fn cursor(&self) -> Option<Cursor> {
        self.state.map(|state| state.cursor)
    }

    pub(crate) fn wrap_count(&self) -> u32 {
        self.state.map_or(0, |state| state.wrap_count)
    }

    pub(crate) fn append<T: Platform>(
        &mut self,
        hal: &mut T,
        gate: &Gate<'_>,
        geometry: &Geometry,
        record: &Record,
    ) -> Result<Option<PageErased>, Error> {
        let mut erased = None;

        let mut state = match self.state {
            Some(state) => state,
            None => {
                #[cfg(feature = "defmt")]
                debug!("writer: first append since boot");

                let state = WriteState {
                    cursor: Cursor::page_start(geometry.start_page),
                    wrap_count: 0,
                };
                gate.request(hal, StoreOp::Erase { page: state.cursor.page })?;
                erased = Some(PageErased {
                    page: state.cursor.page,
                    oldest_valid: geometry.start_page,
                });
                state
            }
        };

        if geometry.is_page_full(&state.cursor) {
            let (page, wrapped) = geometry.next_page(state.cursor.page);
            if wrapped {
                state.wrap_count = state.wrap_count.saturating_add(1);
            }

            #[cfg(feature = "defmt")]
            debug!("writer: rotate to page {} (wraps: {})", page, state.wrap_count);

            #[cfg(feature = "debug-logs")]
            println!("  writer: rotate to page {page} (wraps: {})", state.wrap_count);

            gate.request(hal, StoreOp::Erase { page })?;
            state.cursor = Cursor::page_start(page);

            let oldest_valid = if state.wrap_count > 0 {
                geometry.next_page(page).0
            } else {
                geometry.start_page
            };
            erased = Some(PageErased { page, oldest_valid });
        }

        #[cfg(feature = "defmt")]
        trace!("writer: append #{} @{}", record.sequence, state.cursor);

        let address = geometry.address(&state.cursor);
        gate.request(
            hal,
            StoreOp::Program {
                address,
                data: &record.encode(),
            },
        )?;

        state.cursor.offset += RECORD_WORDS as u32;
        self.state = Some(state);

        Ok(erased)
    }
}
