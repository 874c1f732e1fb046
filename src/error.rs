/// Rejected configuration values.
///
/// Runtime paths never fail: a full ring drops the event and a busy transport
/// is retried, so configuration is the only thing that returns an error.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A chunk must carry at least one event.
    EmptyChunk,
    /// The packet buffer only holds `max` events.
    ChunkTooLarge { requested: usize, max: usize },
    /// A serial decoder needs a non-zero baud rate.
    ZeroBaud,
    /// UART frames carry 5 to 9 data bits.
    DataBits { bits: u8 },
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::EmptyChunk => write!(f, "chunk size must be non-zero"),
            ConfigError::ChunkTooLarge { requested, max } => {
                write!(f, "chunk size {} exceeds the maximum of {}", requested, max)
            }
            ConfigError::ZeroBaud => write!(f, "baud rate must be non-zero"),
            ConfigError::DataBits { bits } => {
                write!(f, "{} data bits per frame is outside 5..=9", bits)
            }
        }
    }
}

/// A received packet that can't be split into event words.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WireError {
    /// Length is not a multiple of 4 bytes.
    Misaligned { len: usize },
}

impl core::fmt::Display for WireError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            WireError::Misaligned { len } => {
                write!(f, "packet of {} bytes is not a whole number of events", len)
            }
        }
    }
}
