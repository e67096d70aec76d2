//! Glue towards the surrounding firmware: control fields, the record producer and the scheduler
//! that pauses periodic logging while a drain cycle runs.

use crate::error::Error;
use crate::platform::Platform;
use crate::record::Record;
use crate::transport::Transport;
use crate::RingLog;
#[cfg(feature = "defmt")]
use defmt::debug;

pub trait Host {
    /// Remotely settable: logging enabled.
    fn enable(&self) -> bool;

    /// Remotely settable: drain the log.
    fn drain_request(&self) -> bool;

    /// Supplies the record for the current logging tick.
    fn produce_record(&mut self) -> Record;

    /// A drain cycle is about to run, pause periodic logging timers.
    fn drain_started(&mut self) {}

    /// The drain cycle finished, resume periodic logging timers.
    fn drain_done(&mut self, _delivered: u32) {}
}

impl<H: Host> Host for &mut H {
    fn enable(&self) -> bool {
        H::enable(self)
    }

    fn drain_request(&self) -> bool {
        H::drain_request(self)
    }

    fn produce_record(&mut self) -> Record {
        H::produce_record(self)
    }

    fn drain_started(&mut self) {
        H::drain_started(self)
    }

    fn drain_done(&mut self, delivered: u32) {
        H::drain_done(self, delivered)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tick {
    Idle,
    Appended { sequence: u16 },
    Drained { delivered: u32 },
}

impl<T: Platform> RingLog<'_, T> {
    /// One logging tick. Appends a fresh record while `enable && !drain_request`; a rising edge of
    /// `drain_request` runs a whole drain cycle instead. A cycle left behind by a transport
    /// failure is resumed on the next tick.
    pub fn tick<H: Host, X: Transport>(
        &mut self,
        host: &mut H,
        transport: &mut X,
    ) -> Result<Tick, Error> {
        let drain_request = host.drain_request();
        let rising = drain_request && !self.last_drain_request;
        self.last_drain_request = drain_request;

        if rising || self.is_draining() {
            #[cfg(feature = "defmt")]
            debug!("tick: drain (requested: {})", rising);

            if rising {
                host.drain_started();
            }
            let delivered = self.play_out(transport)?;

            // the cycle is closed even when the reset signal could not be pushed
            let signalled = self.signal_drain_complete(transport);
            host.drain_done(delivered);
            signalled?;

            return Ok(Tick::Drained { delivered });
        }

        if host.enable() && !drain_request {
            let record = host.produce_record();
            self.append(&record)?;
            return Ok(Tick::Appended {
                sequence: record.sequence,
            });
        }

        Ok(Tick::Idle)
    }
}
