//! The audio output behind the I2S peripheral: a codec or DAC, fed by a circular DMA stream.

use audio::SampleRate;
use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SinkState {
    Reset,
    Ready,
    Playing,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SinkError {
    /// Codec or peripheral initialization failed.
    Init,
    /// The DMA transfer could not be started.
    Transfer,
    Busy,
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Init => write!(f, "initialization failed"),
            SinkError::Transfer => write!(f, "transfer failed"),
            SinkError::Busy => write!(f, "busy"),
        }
    }
}

/// Commands that the USB audio class issues towards the output.
pub trait AudioSink {
    fn init(&mut self, sample_rate: SampleRate, volume_percent: u8, options: u8) -> Result<(), SinkError>;

    fn deinit(&mut self, options: u8) -> Result<(), SinkError>;

    /// Starts circular transmission of `buffer`, `size` bytes long.
    ///
    /// The sink keeps reading the region until the next [`AudioSink::deinit`]. Its progress is reported through
    /// [`crate::i2s::DmaMonitor`].
    fn start(&mut self, buffer: &[u16], size: usize) -> Result<(), SinkError>;

    fn set_volume(&mut self, volume_percent: u8) -> Result<(), SinkError>;

    fn set_mute(&mut self, muted: bool) -> Result<(), SinkError>;

    /// Called once per feedback update while streaming. `margin_alarm` is set while the producer is within the safe
    /// zone of the consumer.
    fn periodic_tick(&mut self, _margin_alarm: bool) {}

    fn state(&self) -> SinkState;
}
