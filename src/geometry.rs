use crate::Config;
use crate::error::Error;
use crate::platform::{AlignedOps, Platform};
use crate::record::{RECORD_SIZE, RECORD_WORDS, WORD_SIZE};

/// Position inside the store: a page number and a word offset into that page.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cursor {
    pub page: u32,
    /// Offset in 4-byte words from the start of `page`
    pub offset: u32,
}

impl Cursor {
    pub const fn new(page: u32, offset: u32) -> Self {
        Self { page, offset }
    }

    pub const fn page_start(page: u32) -> Self {
        Self { page, offset: 0 }
    }

    /// Offset expressed in whole records.
    pub const fn records(&self) -> u32 {
        self.offset / RECORD_WORDS as u32
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct Geometry {
    pub(crate) start_page: u32,
    pub(crate) end_page: u32,
    page_size: u32,
}

impl Geometry {
    pub(crate) fn new<T: Platform>(config: &Config, hal: &T) -> Result<Self, Error> {
        if config.start_page > config.end_page {
            return Err(Error::InvalidPageRange);
        }

        if T::ERASE_SIZE == 0
            || !T::ERASE_SIZE.is_multiple_of(RECORD_SIZE)
            || !T::is_write_aligned(RECORD_SIZE)
            || !T::is_read_aligned(RECORD_SIZE)
        {
            return Err(Error::UnsupportedGeometry);
        }

        let end = (config.end_page as usize + 1)
            .checked_mul(T::ERASE_SIZE)
            .ok_or(Error::PageRangeOutOfBounds)?;
        if end > hal.capacity() || end > u32::MAX as usize {
            return Err(Error::PageRangeOutOfBounds);
        }

        Ok(Self {
            start_page: config.start_page,
            end_page: config.end_page,
            page_size: T::ERASE_SIZE as u32,
        })
    }

    pub(crate) fn pages(&self) -> u32 {
        self.end_page - self.start_page + 1
    }

    pub(crate) fn words_per_page(&self) -> u32 {
        self.page_size / WORD_SIZE as u32
    }

    pub(crate) fn records_per_page(&self) -> u32 {
        self.words_per_page() / RECORD_WORDS as u32
    }

    pub(crate) fn address(&self, cursor: &Cursor) -> u32 {
        cursor.page * self.page_size + cursor.offset * WORD_SIZE as u32
    }

    pub(crate) fn is_page_full(&self, cursor: &Cursor) -> bool {
        cursor.offset + RECORD_WORDS as u32 > self.words_per_page()
    }

    /// The page following `page`, and whether getting there wrapped around the end of the store.
    pub(crate) fn next_page(&self, page: u32) -> (u32, bool) {
        if page >= self.end_page {
            (self.start_page, true)
        } else {
            (page + 1, false)
        }
    }

    /// Index of `cursor` in records, counted from the start of the store.
    pub(crate) fn record_index(&self, cursor: &Cursor) -> u32 {
        (cursor.page - self.start_page) * self.records_per_page() + cursor.records()
    }
}
