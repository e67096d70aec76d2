#![doc = include_str!("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

pub mod error;
mod gate;
mod geometry;
mod host;
pub mod platform;
mod playback;
mod reader;
mod record;
pub mod transport;
mod writer;

pub use gate::CompletionFlag;
pub use geometry::Cursor;
pub use host::{Host, Tick};
pub use playback::PlaybackState;
pub use record::{RECORD_SIZE, RECORD_WORDS, Record, SequenceId};
pub use writer::PageErased;

use crate::error::Error;
use crate::gate::Gate;
use crate::geometry::Geometry;
use crate::platform::Platform;
use crate::playback::Playback;
use crate::transport::{ControlField, DeliveryError, Transport};
use crate::writer::Writer;
#[cfg(feature = "defmt")]
use defmt::{debug, warn};

const DEFAULT_CONTROL_RETRIES: u16 = 16;

/// Where the log lives and how hard to push the drain-completion signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// First page of the log, in units of the flash erase size.
    pub start_page: u32,
    /// Last page of the log, inclusive.
    pub end_page: u32,
    /// How often each control field is retried after the transport pushed back.
    pub control_retries: u16,
}

impl Config {
    pub const fn new(start_page: u32, end_page: u32) -> Self {
        Self {
            start_page,
            end_page,
            control_retries: DEFAULT_CONTROL_RETRIES,
        }
    }

    pub const fn with_control_retries(mut self, control_retries: u16) -> Self {
        self.control_retries = control_retries;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LogStatistics {
    pub pages: u32,
    pub records_per_page: u32,
    pub wrap_count: u32,
    /// Records between the drain anchor and the write cursor.
    pub pending: u32,
}

/// A circular record log spanning `[start_page, end_page]` of a page-erasable store.
///
/// Single producer, single consumer: records are appended by [`RingLog::append`] and drained
/// oldest-first to a [`Transport`] by [`RingLog::drain`]. Cursors are kept in RAM; the first append
/// since boot starts over at `start_page`.
pub struct RingLog<'f, T: Platform> {
    pub(crate) hal: T,
    pub(crate) gate: Gate<'f>,
    pub(crate) geometry: Geometry,
    pub(crate) control_retries: u16,
    pub(crate) faulted: bool,

    pub(crate) writer: Writer,
    // oldest record not yet delivered by a completed drain cycle
    pub(crate) anchor: Cursor,
    pub(crate) playback: Option<Playback>,
    // edge detection for the collaborator's drain request
    pub(crate) last_drain_request: bool,
}

impl<'f, T: Platform> RingLog<'f, T> {
    /// Validates the page range against the flash geometry. Nothing is erased or written until the
    /// first append.
    ///
    /// `completion` has to be signalled by the store whenever an erase or program finishes.
    pub fn new(config: Config, hal: T, completion: &'f CompletionFlag) -> Result<Self, Error> {
        let geometry = Geometry::new(&config, &hal)?;

        Ok(Self {
            hal,
            gate: Gate::new(completion),
            geometry,
            control_retries: config.control_retries,
            faulted: false,
            writer: Writer::new(),
            anchor: Cursor::page_start(config.start_page),
            playback: None,
            last_drain_request: false,
        })
    }

    /// Appends one record, erasing the next page first whenever the current one is full.
    pub fn append(&mut self, record: &Record) -> Result<(), Error> {
        if self.faulted {
            return Err(Error::FlashError);
        }

        if self.playback.is_some() {
            return Err(Error::DrainInProgress);
        }

        match self
            .writer
            .append(&mut self.hal, &self.gate, &self.geometry, record)
        {
            Ok(Some(erased)) => {
                self.apply(erased);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(Error::FlashError) => {
                self.faulted = true;
                Err(Error::FlashError)
            }
            Err(e) => Err(e),
        }
    }

    fn apply(&mut self, erased: PageErased) {
        if self.anchor.page == erased.page {
            #[cfg(feature = "defmt")]
            debug!("anchor: page {} erased, oldest valid {}", erased.page, erased.oldest_valid);

            #[cfg(feature = "debug-logs")]
            println!("anchor: {erased:?}");

            self.anchor = Cursor::page_start(erased.oldest_valid);
        }
    }

    /// Starts a new drain cycle unless one is already running. The write cursor is snapshotted
    /// here; the cycle delivers everything between the anchor and that snapshot.
    pub fn start_drain(&mut self) {
        if self.playback.is_none() {
            #[cfg(feature = "defmt")]
            debug!("drain: start @{}", self.anchor);

            self.playback = Some(Playback::new(self.anchor, self.writer.cursor()));
        }
    }

    /// Advances the current drain cycle by one state transition, starting a cycle if none is
    /// running. Once `Done` is returned the cycle is finished and the delivered records are
    /// consumed; follow up with [`RingLog::signal_drain_complete`].
    pub fn drain_step<X: Transport>(&mut self, transport: &mut X) -> Result<PlaybackState, Error> {
        if self.faulted {
            return Err(Error::FlashError);
        }

        self.start_drain();
        let Some(playback) = self.playback.as_mut() else {
            return Ok(PlaybackState::Done);
        };

        let state = match playback.step(&mut self.hal, &self.geometry, transport) {
            Ok(state) => state,
            Err(Error::FlashError) => {
                self.faulted = true;
                return Err(Error::FlashError);
            }
            Err(e) => return Err(e),
        };

        if state == PlaybackState::Done {
            if let Some(cursor) = playback.read_cursor() {
                self.anchor = cursor;
            }
        }

        Ok(state)
    }

    /// Runs a drain cycle to completion and pushes the completion signal. Returns the number of
    /// records delivered in this cycle.
    ///
    /// Blocks in the transport's wait primitive while it pushes back. A transport failure leaves
    /// the cycle in place, calling `drain` again resumes with the undelivered record.
    pub fn drain<X: Transport>(&mut self, transport: &mut X) -> Result<u32, Error> {
        let delivered = self.play_out(transport)?;
        self.signal_drain_complete(transport)?;

        Ok(delivered)
    }

    // steps the cycle to `Done` and reports how many records it delivered
    pub(crate) fn play_out<X: Transport>(&mut self, transport: &mut X) -> Result<u32, Error> {
        while self.drain_step(transport)? != PlaybackState::Done {}

        Ok(self.playback.as_ref().map_or(0, Playback::delivered))
    }

    /// Resets the collaborator's `enable` and `drain_request` fields and ends the drain cycle so
    /// the next request starts fresh. Each field is retried up to `control_retries` times while
    /// the transport pushes back; resending the same value is harmless.
    pub fn signal_drain_complete<X: Transport>(&mut self, transport: &mut X) -> Result<(), Error> {
        let result = [ControlField::Enable, ControlField::DrainRequest]
            .into_iter()
            .try_for_each(|field| self.push_control(&mut *transport, field));

        self.playback = None;
        result
    }

    fn push_control<X: Transport>(&self, transport: &mut X, field: ControlField) -> Result<(), Error> {
        let mut retries = 0;
        loop {
            match transport.deliver_control(field, &[0]) {
                Ok(()) => return Ok(()),
                Err(DeliveryError::BufferFull | DeliveryError::NotConnected) => {
                    if retries >= self.control_retries {
                        #[cfg(feature = "defmt")]
                        warn!("drain: {} reset undelivered", field);

                        return Err(Error::ControlSignalUndelivered);
                    }
                    retries += 1;

                    #[cfg(feature = "debug-logs")]
                    println!("drain: {field} reset retry {retries}");

                    transport.wait_for_tx_complete();
                }
                Err(DeliveryError::Failed(_)) => return Err(Error::TransportFailed),
            }
        }
    }

    /// Next slot the writer programs, `None` before the first append.
    pub fn write_cursor(&self) -> Option<Cursor> {
        self.writer.cursor()
    }

    /// Where the next drain cycle starts reading.
    pub fn anchor(&self) -> Cursor {
        self.anchor
    }

    /// How often the writer has come back around to `start_page`.
    pub fn wrap_count(&self) -> u32 {
        self.writer.wrap_count()
    }

    /// Whether a drain cycle is open.
    pub fn is_draining(&self) -> bool {
        self.playback.is_some()
    }

    /// State of the open drain cycle, if any.
    pub fn playback_state(&self) -> Option<PlaybackState> {
        self.playback.as_ref().map(Playback::state)
    }

    /// Set once the store reported an error; the log refuses further work.
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    pub fn statistics(&self) -> LogStatistics {
        let geometry = &self.geometry;
        let pending = match self.writer.cursor() {
            None => 0,
            Some(write) => {
                let head = geometry.record_index(&write);
                let tail = geometry.record_index(&self.anchor);
                if self.anchor.page <= write.page {
                    head - tail
                } else {
                    geometry.pages() * geometry.records_per_page() - tail + head
                }
            }
        };

        LogStatistics {
            pages: geometry.pages(),
            records_per_page: geometry.records_per_page(),
            wrap_count: self.writer.wrap_count(),
            pending,
        }
    }

    /// Hands back the underlying store.
    pub fn release(self) -> T {
        self.hal
    }
}
