//! The flow-controlled delivery channel records are drained to.

use crate::record::RECORD_SIZE;

/// Why a delivery attempt was not accepted.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeliveryError<E> {
    /// The outbound buffer is full. Expected under load, the attempt is retried after the next
    /// transmit completion.
    BufferFull,
    /// No collector is attached. Progress stalls until one reconnects.
    NotConnected,
    /// Anything else. Not retried, surfaced as [`crate::error::Error::TransportFailed`].
    Failed(E),
}

/// Collaborator-visible control fields that are reset once a drain cycle is done.
#[derive(strum::Display, strum::FromRepr, Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ControlField {
    Enable = 0,
    DrainRequest = 1,
}

pub trait Transport {
    type Error: core::fmt::Debug;

    /// Hands one encoded record to the outbound buffer.
    fn deliver(&mut self, record: &[u8; RECORD_SIZE]) -> Result<(), DeliveryError<Self::Error>>;

    /// Pushes a new value for one of the control fields to the collector.
    fn deliver_control(
        &mut self,
        field: ControlField,
        value: &[u8],
    ) -> Result<(), DeliveryError<Self::Error>>;

    /// Blocks in the platform wait primitive until a pending delivery completes (or, when
    /// disconnected, until a collector attaches again).
    fn wait_for_tx_complete(&mut self);
}

impl<T: Transport> Transport for &mut T {
    type Error = T::Error;

    fn deliver(&mut self, record: &[u8; RECORD_SIZE]) -> Result<(), DeliveryError<Self::Error>> {
        T::deliver(self, record)
    }

    fn deliver_control(
        &mut self,
        field: ControlField,
        value: &[u8],
    ) -> Result<(), DeliveryError<Self::Error>> {
        T::deliver_control(self, field, value)
    }

    fn wait_for_tx_complete(&mut self) {
        T::wait_for_tx_complete(self)
    }
}
