/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame header contains an invalid magic number.
    #[error("invalid frame magic (expected 0x5650 \"VP\")")]
    InvalidMagic,

    /// The frame header carries a flag combination the codec does not know.
    #[error("invalid frame flags 0x{0:02x}")]
    InvalidFlags(u8),

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A message carries more parts than the configured maximum.
    #[error("message has too many parts (max {max})")]
    TooManyParts { max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// True when the error is a read/write timeout on the underlying stream.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Io(err) if matches!(
                err.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            )
        )
    }

    /// The message broke a configured size or part limit. When raised by
    /// [`crate::FrameWriter`] nothing has been written.
    pub fn is_limit(&self) -> bool {
        matches!(self, Self::PayloadTooLarge { .. } | Self::TooManyParts { .. })
    }

    /// The bytes or the message can never be accepted as they are.
    pub fn is_malformed(&self) -> bool {
        self.is_limit() || matches!(self, Self::InvalidMagic | Self::InvalidFlags(_))
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
