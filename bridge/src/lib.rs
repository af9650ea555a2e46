//! USB Audio Class 1.0 speaker that bridges an asynchronous isochronous stream to an I2S output.
//!
//! The crate is hardware independent. The USB device stack, the audio sink (codec and I2S DMA) and the I2S PLL are
//! accessed through the traits in [`usb`], [`sink`] and [`i2s`], so that the firmware can bind them to its
//! peripherals and the class logic can be tested on the host.
#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod error;
pub mod feedback;
pub mod i2s;
pub mod shared;
pub mod sink;
pub mod uac1;
pub mod usb;

pub use error::{Error, Result};
pub use uac1::{StreamStatus, Uac1Speaker};

/// Isochronous OUT endpoint for audio data.
pub const AUDIO_OUT_EP: u8 = 0x01;

/// Isochronous IN endpoint for rate feedback.
pub const AUDIO_IN_EP: u8 = 0x81;

/// Feedback packets are 24 bit (10.14 format) for full-speed.
pub const FEEDBACK_PACKET_SIZE: usize = 3;

/// Feedback bRefresh exponent: the host polls every 2^2 ms.
pub const FEEDBACK_REFRESH: u8 = 2;

/// Start-of-frame events per feedback update.
pub const FEEDBACK_DECIMATION: u32 = 1;

static_assertions::const_assert!(FEEDBACK_DECIMATION > 0);
static_assertions::const_assert!(FEEDBACK_REFRESH >= 1 && FEEDBACK_REFRESH <= 9);
