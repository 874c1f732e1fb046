use crate::error::ConfigError;
use crate::Duration;

/// Number of event slots in the capture ring. Must be a power of two.
pub const RING_CAPACITY: usize = 1024;

/// Events per outbound packet (16 * 4 = 64 bytes, one full-speed USB packet).
pub const CHUNK_SIZE: usize = 16;

/// Upper bound for [`TransmitConfig::chunk_size`], sizes the packet buffer.
pub const MAX_CHUNK_SIZE: usize = 16;

/// Bytes per encoded event on the wire.
pub const EVENT_BYTES: usize = 4;

pub const MAX_PACKET_BYTES: usize = MAX_CHUNK_SIZE * EVENT_BYTES;

/// Flush whatever is pending at least this often.
pub const SEND_INTERVAL: Duration = Duration::millis(2);

/// While events keep getting dropped, summarize at most this often.
pub const DROP_SUMMARY_INTERVAL: Duration = Duration::millis(1000);

/// Width of the timestamp field in an event word.
pub const TIMESTAMP_BITS: u32 = 29;

/// First tick that no longer fits the timestamp field; capture stops here.
pub const TIMESTAMP_LIMIT: u32 = 1 << TIMESTAMP_BITS;

pub const TIMESTAMP_MASK: u32 = TIMESTAMP_LIMIT - 1;

/// Nominal tick rate of the firmware counter chain: 84 MHz timer clock / 16.
pub const TICK_HZ: u32 = 5_250_000;

/// Transmitter pacing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransmitConfig {
    chunk_size: usize,
    send_interval: Duration,
}

impl TransmitConfig {
    pub fn new(chunk_size: usize, send_interval: Duration) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::EmptyChunk);
        }
        if chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::ChunkTooLarge {
                requested: chunk_size,
                max: MAX_CHUNK_SIZE,
            });
        }
        Ok(Self {
            chunk_size,
            send_interval,
        })
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[inline]
    pub fn send_interval(&self) -> Duration {
        self.send_interval
    }
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            send_interval: SEND_INTERVAL,
        }
    }
}
