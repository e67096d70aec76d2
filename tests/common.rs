#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};
use flash_ringlog::transport::{ControlField, DeliveryError, Transport};
use flash_ringlog::{CompletionFlag, RECORD_SIZE, Record};
use std::collections::VecDeque;

pub const PAGE_SIZE: usize = 1024;
pub const WORD_SIZE: usize = 4;
pub const RECORDS_PER_PAGE: usize = PAGE_SIZE / RECORD_SIZE;

pub fn record(sequence: u16) -> Record {
    Record {
        date: 20261018,
        time: sequence as u32 * 60,
        samples: [Some(sequence as i16), None],
        sequence,
    }
}

/// Emulated NOR flash that completes erase/program requests asynchronously: completion is
/// signalled after `latency` calls to `wait_for_event`.
pub struct Flash<'f> {
    pub buf: Vec<u8>,
    pub fail_after_operation: usize,
    pub operations: Vec<Operation>,
    pub latency: usize,
    pub waits: usize,
    completion: &'f CompletionFlag,
    pending: Option<usize>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
    Erase { offset: u32, len: usize },
}

impl<'f> Flash<'f> {
    pub fn new(pages: usize, completion: &'f CompletionFlag) -> Self {
        Self {
            buf: vec![0xffu8; PAGE_SIZE * pages],
            fail_after_operation: usize::MAX,
            operations: vec![],
            latency: 0,
            waits: 0,
            completion,
            pending: None,
        }
    }

    pub fn new_with_latency(pages: usize, completion: &'f CompletionFlag, latency: usize) -> Self {
        Self {
            latency,
            ..Self::new(pages, completion)
        }
    }

    pub fn new_with_fault(
        pages: usize,
        completion: &'f CompletionFlag,
        fail_after_operation: usize,
    ) -> Self {
        Self {
            fail_after_operation,
            ..Self::new(pages, completion)
        }
    }

    pub fn erases(&self) -> Vec<u32> {
        self.operations
            .iter()
            .filter_map(|op| match op {
                Operation::Erase { offset, .. } => Some(offset / PAGE_SIZE as u32),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Write { .. }))
            .count()
    }

    pub fn dump_operations(&self) {
        println!("Operations:");
        for op in &self.operations {
            println!("  {:?}", op);
        }
    }

    fn issue(&mut self) {
        assert!(
            !self.completion.is_complete(),
            "request issued without clearing the completion flag"
        );
        assert!(self.pending.is_none(), "second request in flight");

        if self.latency == 0 {
            self.completion.signal();
        } else {
            self.pending = Some(self.latency);
        }
    }
}

#[derive(Debug)]
pub struct FlashError;

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

impl ErrorType for Flash<'_> {
    type Error = FlashError;
}

impl ReadNorFlash for Flash<'_> {
    const READ_SIZE: usize = WORD_SIZE;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::READ_SIZE as _));
        assert!(self.pending.is_none(), "read while a request is in flight");

        if self.operations.len() >= self.fail_after_operation {
            println!("    flash: FAULT");
            return Err(FlashError);
        }
        self.operations.push(Operation::Read {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl NorFlash for Flash<'_> {
    const WRITE_SIZE: usize = WORD_SIZE;

    const ERASE_SIZE: usize = PAGE_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        assert!(from.is_multiple_of(Self::ERASE_SIZE as _));
        assert!(to.is_multiple_of(Self::ERASE_SIZE as _));

        println!(
            "    flash: erase: {from:04X} - {to:04X} #{:>2}",
            self.operations.len()
        );

        if self.operations.len() >= self.fail_after_operation {
            println!("    flash: FAULT");
            return Err(FlashError);
        }

        self.operations.push(Operation::Erase {
            offset: from,
            len: (to - from) as usize,
        });

        for addr in from..to {
            self.buf[addr as usize] = 0xff;
        }

        self.issue();
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::WRITE_SIZE as _));
        assert!(bytes.len().is_multiple_of(Self::WRITE_SIZE as _));

        println!(
            "    flash: write: 0x{offset:04X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );

        if self.operations.len() >= self.fail_after_operation {
            println!("    flash: FAULT");
            return Err(FlashError);
        }

        let offset = offset as usize;
        assert!(
            self.buf[offset..offset + bytes.len()]
                .iter()
                .all(|&b| b == 0xff),
            "program into non-erased flash @0x{offset:04X}"
        );

        self.operations.push(Operation::Write {
            offset: offset as u32,
            len: bytes.len(),
        });

        for (i, &val) in bytes.iter().enumerate() {
            // NOR flash can only flip bits from 1 to 0
            self.buf[offset + i] &= val;
        }

        self.issue();
        Ok(())
    }
}

impl flash_ringlog::platform::Platform for Flash<'_> {
    fn wait_for_event(&mut self) {
        self.waits += 1;
        match self.pending {
            Some(n) if n <= 1 => {
                self.pending = None;
                self.completion.signal();
            }
            Some(n) => self.pending = Some(n - 1),
            None => {}
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Response {
    Accept,
    BufferFull,
    NotConnected,
    Fail,
}

/// Scripted transport. Responses are taken from the front of the scripts, `Accept` once empty.
#[derive(Default)]
pub struct MockTransport {
    pub script: VecDeque<Response>,
    pub control_script: VecDeque<Response>,
    pub delivered: Vec<Record>,
    pub attempts: usize,
    pub control_applied: Vec<(ControlField, Vec<u8>)>,
    pub control_attempts: usize,
    pub waits: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(script: &[Response]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn delivered_ids(&self) -> Vec<u16> {
        self.delivered.iter().map(|r| r.sequence).collect()
    }

    fn respond(response: Option<Response>) -> Result<(), DeliveryError<&'static str>> {
        match response.unwrap_or(Response::Accept) {
            Response::Accept => Ok(()),
            Response::BufferFull => Err(DeliveryError::BufferFull),
            Response::NotConnected => Err(DeliveryError::NotConnected),
            Response::Fail => Err(DeliveryError::Failed("link lost")),
        }
    }
}

impl Transport for MockTransport {
    type Error = &'static str;

    fn deliver(&mut self, record: &[u8; RECORD_SIZE]) -> Result<(), DeliveryError<Self::Error>> {
        self.attempts += 1;
        Self::respond(self.script.pop_front())?;
        self.delivered.push(Record::decode(record));
        Ok(())
    }

    fn deliver_control(
        &mut self,
        field: ControlField,
        value: &[u8],
    ) -> Result<(), DeliveryError<Self::Error>> {
        self.control_attempts += 1;
        assert_eq!(ControlField::from_repr(field as u8), Some(field));
        Self::respond(self.control_script.pop_front())?;
        self.control_applied.push((field, value.to_vec()));
        Ok(())
    }

    fn wait_for_tx_complete(&mut self) {
        self.waits += 1;
    }
}
