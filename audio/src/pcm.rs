//! Conversion of packed 24-bit little-endian samples into I2S transfer words.
//!
//! The I2S peripheral runs in 24-bit data / 32-bit frame mode and takes every sample as two consecutive 16-bit
//! writes: the upper 16 bits first, then the low byte, left-aligned.

use crate::{SUBFRAME_SIZE, WORDS_PER_FRAME};

/// Splits a sample `[low, mid, high]` into `[high:mid, low:00]`.
#[inline]
pub const fn sample_to_words(sample: [u8; SUBFRAME_SIZE]) -> [u16; 2] {
    let [low, mid, high] = sample;
    [((high as u16) << 8) | mid as u16, (low as u16) << 8]
}

/// Reassembles the signed 24-bit sample from its two transfer words.
#[inline]
pub const fn words_to_sample(words: [u16; 2]) -> i32 {
    let packed = ((words[0] as u32) << 16) | ((words[1] as u32) & 0xFF00);
    (packed as i32) >> 8
}

/// Converts one packed stereo frame (left, then right) into its four transfer words.
#[inline]
pub const fn decode_frame(frame: [u8; 2 * SUBFRAME_SIZE]) -> [u16; WORDS_PER_FRAME] {
    let [left_low, left_mid, left_high, right_low, right_mid, right_high] = frame;
    let left = sample_to_words([left_low, left_mid, left_high]);
    let right = sample_to_words([right_low, right_mid, right_high]);

    [left[0], left[1], right[0], right[1]]
}
