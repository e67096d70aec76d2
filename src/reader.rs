use crate::error::Error;
use crate::geometry::{Cursor, Geometry};
use crate::platform::Platform;
use crate::record::{RECORD_SIZE, RECORD_WORDS, Record};
#[cfg(feature = "defmt")]
use defmt::trace;

/// Read side of the log. Owns the read cursor, which is independent of the writer's and wraps on
/// its own. The cursor is unset until the first `next` of a drain cycle places it on the anchor.
pub(crate) struct Reader {
    anchor: Cursor,
    // write cursor snapshot taken at drain start, `None` if nothing was appended since boot
    limit: Option<Cursor>,
    cursor: Option<Cursor>,
    drained: bool,
}

impl Reader {
    pub(crate) fn new(anchor: Cursor, limit: Option<Cursor>) -> Self {
        Self {
            anchor,
            limit,
            cursor: None,
            drained: false,
        }
    }

    pub(crate) fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    /// Puts the cursor back to a snapshot taken before a record was handed out.
    pub(crate) fn restore(&mut self, snapshot: Option<Cursor>) {
        self.cursor = snapshot;
        self.drained = false;
    }

    /// Returns the next record, or `None` once the cursor caught up with the writer. `None` is
    /// sticky for the rest of the cycle.
    pub(crate) fn next<T: Platform>(
        &mut self,
        hal: &mut T,
        geometry: &Geometry,
    ) -> Result<Option<Record>, Error> {
        if self.drained {
            return Ok(None);
        }

        let Some(limit) = self.limit else {
            self.drained = true;
            return Ok(None);
        };

        let mut cursor = self.cursor.unwrap_or(self.anchor);
        let words_per_page = geometry.words_per_page();

        loop {
            if cursor.page <= limit.page {
                if geometry.address(&cursor) >= geometry.address(&limit) {
                    #[cfg(feature = "defmt")]
                    trace!("reader: caught up @{}", cursor);

                    self.cursor = Some(cursor);
                    self.drained = true;
                    return Ok(None);
                }
                if cursor.offset + RECORD_WORDS as u32 > words_per_page {
                    cursor = Cursor::page_start(cursor.page + 1);
                    continue;
                }
            } else if cursor.offset + RECORD_WORDS as u32 > words_per_page {
                // the writer lapped us: run to the end of the store, then wrap
                cursor = Cursor::page_start(geometry.next_page(cursor.page).0);
                continue;
            }
            break;
        }

        let mut buf = [0u8; RECORD_SIZE];
        hal.read(geometry.address(&cursor), &mut buf)
            .map_err(|_| Error::FlashError)?;

        #[cfg(feature = "debug-logs")]
        println!("  reader: read @{cursor:?}");

        cursor.offset += RECORD_WORDS as u32;
        self.cursor = Some(cursor);

        Ok(Some(Record::decode(&buf)))
    }
}
