//! Sample formats, rates and the playback buffer shared by the USB side and the I2S side of the bridge.
//!
//! The USB host sends stereo, 24-bit little-endian PCM. The I2S peripheral is fed with 16-bit words by a circular DMA
//! stream, so every 24-bit sample occupies two words of the output buffer.
#![cfg_attr(not(test), no_std)]

pub mod pcm;
pub mod ring_buffer;
pub mod volume;

pub use ring_buffer::SampleRingBuffer;
pub use volume::Volume;

// Stereo input, 24 bit packed in three bytes.
pub const CHANNEL_COUNT: usize = 2;
pub const SUBFRAME_SIZE: usize = 3;
pub const BIT_RESOLUTION: u8 = 24;

/// Bytes per stereo frame on the bus.
pub const FRAME_SIZE: usize = CHANNEL_COUNT * SUBFRAME_SIZE;

/// Output buffer words per stereo frame.
pub const WORDS_PER_FRAME: usize = CHANNEL_COUNT * 2;

pub const MAX_SAMPLE_RATE_HZ: u32 = 96_000;

/// The largest packet a full-speed host sends per 1 ms frame at `sample_rate_hz`.
///
/// One extra frame is allowed, so that the host can catch up when the device reports a higher rate via feedback.
pub const fn max_packet_size(sample_rate_hz: u32) -> usize {
    (sample_rate_hz as usize / 1000 + 1) * FRAME_SIZE
}

pub const MAX_PACKET_SIZE: usize = max_packet_size(MAX_SAMPLE_RATE_HZ);

// The buffer holds eight maximum-size packets.
pub const PACKET_COUNT: usize = 8;
pub const BUFFER_WORD_COUNT: usize = MAX_PACKET_SIZE * PACKET_COUNT;
pub const BUFFER_FRAME_COUNT: usize = BUFFER_WORD_COUNT / WORDS_PER_FRAME;

/// Minimum distance between producer and consumer, in frames. One maximum-size packet.
///
/// Counted in stereo frames of four storage words. A margin of one packet counted in six-word groups would be
/// about 145 frames.
pub const SAFE_ZONE_FRAMES: usize = MAX_PACKET_SIZE / FRAME_SIZE;

static_assertions::const_assert_eq!(BUFFER_WORD_COUNT % WORDS_PER_FRAME, 0);
static_assertions::const_assert!(PACKET_COUNT % 2 == 0);
static_assertions::const_assert!(BUFFER_FRAME_COUNT / 2 > 2 * SAFE_ZONE_FRAMES);

/// The output buffer that is handed to the I2S DMA stream.
pub type OutputBuffer = SampleRingBuffer<BUFFER_WORD_COUNT>;

/// Sample rates that are advertised to the host.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleRate {
    Hz44100,
    Hz48000,
    Hz96000,
}

impl SampleRate {
    pub const ALL: [SampleRate; 3] = [SampleRate::Hz44100, SampleRate::Hz48000, SampleRate::Hz96000];
    pub const DEFAULT: SampleRate = SampleRate::Hz96000;

    pub const fn from_hz(hz: u32) -> Option<Self> {
        match hz {
            44_100 => Some(SampleRate::Hz44100),
            48_000 => Some(SampleRate::Hz48000),
            96_000 => Some(SampleRate::Hz96000),
            _ => None,
        }
    }

    pub const fn hz(self) -> u32 {
        match self {
            SampleRate::Hz44100 => 44_100,
            SampleRate::Hz48000 => 48_000,
            SampleRate::Hz96000 => 96_000,
        }
    }

    pub const fn max_packet_size(self) -> usize {
        max_packet_size(self.hz())
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        SampleRate::DEFAULT
    }
}
