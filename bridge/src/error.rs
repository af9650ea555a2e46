use core::fmt;

use crate::sink::SinkError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The request, selector or entity is not handled by this device. Answered with a stall.
    UnsupportedRequest,
    /// The request needs a configured device.
    NotConfigured,
    InvalidAlternateSetting(u8),
    /// A control payload is shorter than its selector requires, or does not fit the control buffer.
    InvalidLength { expected: usize, actual: usize },
    UnsupportedSampleRate(u32),
    Sink(SinkError),
    /// The I2S PLL did not lock (or unlock) in time.
    ClockTimeout,
}

pub type Result<T> = core::result::Result<T, Error>;

impl From<SinkError> for Error {
    fn from(error: SinkError) -> Self {
        Error::Sink(error)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedRequest => write!(f, "unsupported request"),
            Error::NotConfigured => write!(f, "device is not configured"),
            Error::InvalidAlternateSetting(alt) => write!(f, "invalid alternate setting {}", alt),
            Error::InvalidLength { expected, actual } => {
                write!(f, "invalid length {} (expected {})", actual, expected)
            }
            Error::UnsupportedSampleRate(hz) => write!(f, "unsupported sample rate {} Hz", hz),
            Error::Sink(error) => write!(f, "audio sink: {}", error),
            Error::ClockTimeout => write!(f, "I2S PLL timeout"),
        }
    }
}
