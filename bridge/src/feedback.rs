//! Explicit feedback for the asynchronous streaming endpoint.
//!
//! The device clock runs independently of the USB frame clock. The host learns the actual consumption rate from the
//! feedback endpoint, and adjusts its packet sizes accordingly. The rate is steered around the nominal rate of the
//! I2S clock, so that buffer occupancy settles at half of the capacity.
//!
//! Values are kept as Q10.22 samples per frame (kHz), of which the upper 24 bits are sent in 10.14 format, as
//! required for full-speed devices.

use audio::SampleRate;
use heapless::HistoryBuffer;

use crate::i2s::ClockConfig;
use crate::FEEDBACK_PACKET_SIZE;

const FRACTIONAL_BITS: u32 = 22;

/// The reported rate never leaves nominal +/- 1 kHz.
pub const MAX_FEEDBACK_DELTA: u32 = 1 << FRACTIONAL_BITS;

/// Rate correction per frame of occupancy error. Excess occupancy lowers the reported rate.
///
/// The error is counted in stereo frames of four storage words. Counted in six-word groups instead, the same
/// slope would be about 256 per frame.
pub const FEEDBACK_GAIN: i32 = -384;

pub const FEEDBACK_HISTORY_LEN: usize = 64;

/// Formats a Q10.22 value for the feedback endpoint.
pub const fn encode_feedback(value: u32) -> [u8; FEEDBACK_PACKET_SIZE] {
    [(value >> 8) as u8, (value >> 16) as u8, (value >> 24) as u8]
}

/// Converts a Q10.22 value to samples per second.
pub const fn feedback_to_hz(value: u32) -> u32 {
    ((value as u64 * 1000) >> FRACTIONAL_BITS) as u32
}

/// Proportional controller from buffer occupancy to the reported sample rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeedbackController {
    nominal: u32,
    value: u32,
}

impl FeedbackController {
    pub const fn new(sample_rate: SampleRate) -> Self {
        let nominal = ClockConfig::for_rate(sample_rate).nominal_feedback;
        Self { nominal, value: nominal }
    }

    /// Resets the controller to the nominal rate of `sample_rate`.
    pub fn select(&mut self, sample_rate: SampleRate) {
        *self = Self::new(sample_rate);
    }

    pub fn nominal(&self) -> u32 {
        self.nominal
    }

    /// The value that is currently reported.
    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn bounds(&self) -> (u32, u32) {
        (
            self.nominal.saturating_sub(MAX_FEEDBACK_DELTA),
            self.nominal.saturating_add(MAX_FEEDBACK_DELTA),
        )
    }

    /// Steers the reported rate by the difference between `occupancy` and `target` (both in frames).
    pub fn update(&mut self, occupancy: usize, target: usize) -> u32 {
        let error = occupancy as i64 - target as i64;
        let (low, high) = self.bounds();

        let value = self.value as i64 + error * FEEDBACK_GAIN as i64;
        self.value = value.clamp(low as i64, high as i64) as u32;
        self.value
    }

    pub fn packet(&self) -> [u8; FEEDBACK_PACKET_SIZE] {
        encode_feedback(self.value)
    }
}

/// Admission of feedback transmissions on the isochronous IN endpoint.
///
/// At most one packet is in flight. The device stack reports a dropped IN transfer as incomplete, with the frame
/// number at that time. Subsequent transfers are then only started in frames of the same parity, which keeps them
/// aligned with the host's polling of the endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeedbackGate {
    busy: bool,
    phase_frame: u16,
}

impl Default for FeedbackGate {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackGate {
    /// Creates a blocked gate.
    pub const fn new() -> Self {
        Self {
            busy: true,
            phase_frame: 0,
        }
    }

    pub fn block(&mut self) {
        self.busy = true;
    }

    pub fn release(&mut self) {
        self.busy = false;
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Claims the endpoint for a transmission in `frame_number`.
    pub fn try_acquire(&mut self, frame_number: u16) -> bool {
        if self.busy || (self.phase_frame & 1) != (frame_number & 1) {
            return false;
        }

        self.busy = true;
        true
    }

    /// The transmission was picked up by the host.
    pub fn complete(&mut self) {
        self.busy = false;
    }

    /// The transmission was not picked up in `frame_number`. Returns `true` if the endpoint must be flushed.
    pub fn abandon(&mut self, frame_number: u16) -> bool {
        self.phase_frame = frame_number;

        let was_busy = self.busy;
        self.busy = false;
        was_busy
    }
}

/// One change of buffer occupancy, as seen by the feedback controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeedbackRecord {
    /// Start-of-frame count since playback started.
    pub frame: u32,
    pub occupancy: u32,
    pub feedback: u32,
}

/// Statistics of the feedback loop, for diagnostics.
pub struct FeedbackMonitor {
    frame_count: u32,
    last_occupancy: usize,
    range: Option<(usize, usize)>,
    history: HistoryBuffer<FeedbackRecord, FEEDBACK_HISTORY_LEN>,
}

impl Default for FeedbackMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackMonitor {
    pub const fn new() -> Self {
        Self {
            frame_count: 0,
            last_occupancy: 0,
            range: None,
            history: HistoryBuffer::new(),
        }
    }

    /// Starts over from `baseline` occupancy.
    pub fn reset(&mut self, baseline: usize) {
        *self = Self::new();
        self.last_occupancy = baseline;
    }

    /// Takes a sample. Only changes of occupancy enter the history.
    pub fn record(&mut self, occupancy: usize, feedback: u32) {
        self.frame_count = self.frame_count.wrapping_add(1);

        self.range = Some(match self.range {
            Some((min, max)) => (min.min(occupancy), max.max(occupancy)),
            None => (occupancy, occupancy),
        });

        if occupancy != self.last_occupancy {
            self.history.write(FeedbackRecord {
                frame: self.frame_count,
                occupancy: occupancy as u32,
                feedback,
            });
            self.last_occupancy = occupancy;
        }
    }

    pub fn baseline(&self) -> usize {
        self.last_occupancy
    }

    /// Lowest and highest occupancy seen.
    pub fn range(&self) -> Option<(usize, usize)> {
        self.range
    }

    /// Recorded changes, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &FeedbackRecord> + '_ {
        self.history.oldest_ordered()
    }
}
