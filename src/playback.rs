use crate::error::Error;
use crate::geometry::{Cursor, Geometry};
use crate::platform::Platform;
use crate::reader::Reader;
use crate::transport::{DeliveryError, Transport};
#[cfg(feature = "defmt")]
use defmt::{debug, trace, warn};

#[derive(strum::Display, Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlaybackState {
    /// Read the next record and try to hand it to the transport.
    Read,
    /// The transport pushed back; wait for a transmit completion, then retry the same record.
    TransmitWait,
    /// Caught up with the writer. Terminal for this drain cycle.
    Done,
}

/// One drain cycle. Can be driven step by step and resumes exactly where it left off.
pub(crate) struct Playback {
    state: PlaybackState,
    reader: Reader,
    delivered: u32,
}

impl Playback {
    pub(crate) fn new(anchor: Cursor, write_snapshot: Option<Cursor>) -> Self {
        Self {
            state: PlaybackState::Read,
            reader: Reader::new(anchor, write_snapshot),
            delivered: 0,
        }
    }

    pub(crate) fn state(&self) -> PlaybackState {
        self.state
    }

    pub(crate) fn delivered(&self) -> u32 {
        self.delivered
    }

    /// Final read cursor, only meaningful once `Done`.
    pub(crate) fn read_cursor(&self) -> Option<Cursor> {
        self.reader.cursor()
    }

    /// Performs a single state transition and returns the new state.
    pub(crate) fn step<T: Platform, X: Transport>(
        &mut self,
        hal: &mut T,
        geometry: &Geometry,
        transport: &mut X,
    ) -> Result<PlaybackState, Error> {
        match self.state {
            PlaybackState::Read => {
                let snapshot = self.reader.cursor();

                let Some(record) = self.reader.next(hal, geometry)? else {
                    #[cfg(feature = "defmt")]
                    debug!("playback: done after {} records", self.delivered);

                    #[cfg(feature = "debug-logs")]
                    println!("  playback: done, {} delivered", self.delivered);

                    self.state = PlaybackState::Done;
                    return Ok(self.state);
                };

                match transport.deliver(&record.encode()) {
                    Ok(()) => {
                        #[cfg(feature = "defmt")]
                        trace!("playback: delivered #{}", record.sequence);

                        self.delivered += 1;
                    }
                    Err(DeliveryError::BufferFull | DeliveryError::NotConnected) => {
                        #[cfg(feature = "defmt")]
                        trace!("playback: rollback #{}", record.sequence);

                        #[cfg(feature = "debug-logs")]
                        println!("  playback: rollback {record:?}");

                        self.reader.restore(snapshot);
                        self.state = PlaybackState::TransmitWait;
                    }
                    Err(DeliveryError::Failed(_e)) => {
                        #[cfg(feature = "defmt")]
                        warn!("playback: transport failed on #{}", record.sequence);

                        #[cfg(feature = "debug-logs")]
                        println!("  playback: transport failed: {_e:?}");

                        // keep the record for whoever resumes this cycle
                        self.reader.restore(snapshot);
                        return Err(Error::TransportFailed);
                    }
                }
            }
            PlaybackState::TransmitWait => {
                transport.wait_for_tx_complete();

                #[cfg(feature = "defmt")]
                trace!("playback: transmit wait over");

                #[cfg(feature = "debug-logs")]
                println!("  playback: transmit wait over, reading again");

                self.state = PlaybackState::Read;
            }
            PlaybackState::Done => {}
        }

        Ok(self.state)
    }
}
