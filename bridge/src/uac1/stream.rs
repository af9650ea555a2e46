//! Session state of the streaming interface.

use audio::{SampleRate, Volume, BIT_RESOLUTION};

/// Lifecycle of the streaming interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamState {
    /// Zero-bandwidth alternate setting, nothing is received.
    Idle,
    /// Packets are buffered until half of the buffer is filled.
    Prefilling,
    /// The output consumes the buffer.
    Streaming,
}

/// Consumer position relative to the buffer halves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OffsetState {
    /// Playback has not started.
    Unknown,
    None,
    Half,
    Full,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamSession {
    pub(crate) alt_setting: u8,
    pub(crate) sample_rate: SampleRate,
    pub(crate) bit_depth: u8,
    pub(crate) offset: OffsetState,
    pub(crate) consumer_enabled: bool,
    pub(crate) playing: bool,
    /// Packets and start-of-frame events are only processed while armed.
    pub(crate) armed: bool,
    pub(crate) volume: Volume,
    pub(crate) muted: bool,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSession {
    pub const fn new() -> Self {
        Self {
            alt_setting: 0,
            sample_rate: SampleRate::DEFAULT,
            bit_depth: BIT_RESOLUTION,
            offset: OffsetState::Unknown,
            consumer_enabled: false,
            playing: false,
            armed: false,
            volume: Volume::DEFAULT,
            muted: false,
        }
    }

    pub fn state(&self) -> StreamState {
        if self.alt_setting == 0 {
            StreamState::Idle
        } else if self.consumer_enabled {
            StreamState::Streaming
        } else {
            StreamState::Prefilling
        }
    }

    pub fn alt_setting(&self) -> u8 {
        self.alt_setting
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    pub fn bit_depth(&self) -> u8 {
        self.bit_depth
    }

    pub fn offset(&self) -> OffsetState {
        self.offset
    }

    pub fn consumer_enabled(&self) -> bool {
        self.consumer_enabled
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    /// Stops processing and forgets the playback position. Settings are kept.
    pub(crate) fn halt(&mut self) {
        self.armed = false;
        self.playing = false;
        self.consumer_enabled = false;
        self.offset = OffsetState::Unknown;
    }

    /// Playback starts once, after the producer has filled half of the buffer.
    pub(crate) fn should_start(&self, write_index: usize, capacity: usize) -> bool {
        self.offset == OffsetState::Unknown && !self.playing && write_index >= capacity / 2
    }

    pub(crate) fn begin_playback(&mut self) {
        self.offset = OffsetState::None;
        self.playing = true;
        self.consumer_enabled = true;
    }
}
