use core::fmt;

pub(crate) const WORD_SIZE: usize = 4;
/// Every logged unit occupies exactly four words on flash.
pub const RECORD_WORDS: usize = 4;
pub const RECORD_SIZE: usize = RECORD_WORDS * WORD_SIZE;

const SAMPLE_PRESENT: [u8; 2] = [0b01, 0b10];
// left unprogrammed so the byte stays at its erased value
const RESERVED: u8 = 0xFF;

/// One logging tick: timestamp, up to two sensor samples and a wrapping sequence id.
///
/// Layout (little endian):
///
/// | word | content                                        |
/// |------|------------------------------------------------|
/// | 0    | date                                           |
/// | 1    | time                                           |
/// | 2    | sample 0 (i16), sample 1 (i16)                 |
/// | 3    | sequence (u16), presence mask (u8), reserved   |
#[derive(Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Record {
    pub date: u32,
    pub time: u32,
    pub samples: [Option<i16>; 2],
    pub sequence: u16,
}

impl Record {
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[0..4].copy_from_slice(&self.date.to_le_bytes());
        buf[4..8].copy_from_slice(&self.time.to_le_bytes());

        let mut mask = 0u8;
        for (i, sample) in self.samples.iter().enumerate() {
            let value = match sample {
                Some(value) => {
                    mask |= SAMPLE_PRESENT[i];
                    *value
                }
                None => 0,
            };
            buf[8 + 2 * i..10 + 2 * i].copy_from_slice(&value.to_le_bytes());
        }

        buf[12..14].copy_from_slice(&self.sequence.to_le_bytes());
        buf[14] = mask;
        buf[15] = RESERVED;
        buf
    }

    pub fn decode(buf: &[u8; RECORD_SIZE]) -> Self {
        let word = |i: usize| [buf[i], buf[i + 1], buf[i + 2], buf[i + 3]];
        let half = |i: usize| [buf[i], buf[i + 1]];
        let mask = buf[14];

        let mut samples = [None; 2];
        for (i, sample) in samples.iter_mut().enumerate() {
            if mask & SAMPLE_PRESENT[i] != 0 {
                *sample = Some(i16::from_le_bytes(half(8 + 2 * i)));
            }
        }

        Self {
            date: u32::from_le_bytes(word(0)),
            time: u32::from_le_bytes(word(4)),
            samples,
            sequence: u16::from_le_bytes(half(12)),
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Record {{ #{:>5}, date: {:#010x}, time: {:#010x}, samples: {:?} }}",
            self.sequence, self.date, self.time, self.samples
        )
    }
}

/// Source of record sequence ids, wrapping from 65535 back to 0.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SequenceId(u16);

impl SequenceId {
    pub const fn new(start: u16) -> Self {
        Self(start)
    }

    /// Returns the current id and advances.
    pub fn next_id(&mut self) -> u16 {
        let id = self.0;
        self.0 = self.0.wrapping_add(1);
        id
    }
}
