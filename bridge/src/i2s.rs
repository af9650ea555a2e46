//! I2S clocking and DMA progress.
//!
//! The I2S bit clock is derived from a dedicated PLL (PLLI2S). Its multiplier, divider and the I2S prescaler are
//! chosen per sample rate. None of the rates is met exactly, so each entry also carries the resulting sample rate as
//! a Q10.22 kHz value, which is the nominal feedback that is reported to the host.

use audio::SampleRate;

use crate::error::{Error, Result};

/// Progress of the circular DMA stream that feeds the I2S peripheral.
pub trait DmaMonitor {
    /// Bytes left in the current pass over the output buffer.
    fn remaining_bytes(&self) -> usize;
}

/// Register level access to the I2S PLL.
pub trait I2sPll {
    fn disable(&mut self);

    fn enable(&mut self);

    fn is_locked(&self) -> bool;

    /// Programs the PLL multiplier and divider, and the I2S prescaler register value.
    fn write_config(&mut self, config: &ClockConfig, prescaler: u16);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// PLLI2S multiplication factor
    pub plln: u16,
    /// PLLI2S division factor
    pub pllr: u8,
    /// I2S linear prescaler
    pub i2s_div: u8,
    /// Odd factor for the prescaler
    pub odd: bool,
    /// The resulting sample rate in Q10.22 kHz
    pub nominal_feedback: u32,
}

pub const MCLK_OUTPUT: bool = cfg!(feature = "mclk-out");

/// Polls of the lock flag before giving up.
pub const PLL_LOCK_ATTEMPTS: u32 = 100_000;

const fn clock_config(plln: u16, pllr: u8, i2s_div: u8, odd: bool, nominal_feedback: u32) -> ClockConfig {
    ClockConfig {
        plln,
        pllr,
        i2s_div,
        odd,
        nominal_feedback,
    }
}

// Sample rates from a 1 MHz PLL input.
#[cfg(not(feature = "mclk-out"))]
const CLOCK_CONFIGS: [ClockConfig; 3] = [
    clock_config(429, 4, 19, false, 0x0B06_5E56), // 44.0995 kHz
    clock_config(384, 5, 12, true, 0x0C00_0000),  // 48.0000 kHz
    clock_config(424, 3, 11, true, 0x1800_ED70),  // 96.0144 kHz
];

#[cfg(feature = "mclk-out")]
const CLOCK_CONFIGS: [ClockConfig; 3] = [
    clock_config(271, 2, 6, false, 0x0B06_EAB0), // 44.1064 kHz
    clock_config(258, 3, 3, true, 0x0BFF_6DB2),  // 47.9911 kHz
    clock_config(344, 2, 3, true, 0x17FE_DB64),  // 95.9821 kHz
];

impl ClockConfig {
    pub const fn for_rate(sample_rate: SampleRate) -> Self {
        match sample_rate {
            SampleRate::Hz44100 => CLOCK_CONFIGS[0],
            SampleRate::Hz48000 => CLOCK_CONFIGS[1],
            SampleRate::Hz96000 => CLOCK_CONFIGS[2],
        }
    }

    /// The SPI_I2SPR register value.
    pub const fn prescaler(&self) -> u16 {
        ((MCLK_OUTPUT as u16) << 9) | ((self.odd as u16) << 8) | self.i2s_div as u16
    }
}

/// Reprograms the I2S PLL for `sample_rate`.
pub fn configure<P: I2sPll>(pll: &mut P, sample_rate: SampleRate) -> Result<()> {
    let config = ClockConfig::for_rate(sample_rate);

    pll.disable();
    wait_for(|| !pll.is_locked())?;

    pll.write_config(&config, config.prescaler());
    pll.enable();
    wait_for(|| pll.is_locked())?;

    debug!("I2S PLL locked for {} Hz", sample_rate.hz());
    Ok(())
}

fn wait_for(mut condition: impl FnMut() -> bool) -> Result<()> {
    for _ in 0..PLL_LOCK_ATTEMPTS {
        if condition() {
            return Ok(());
        }
        core::hint::spin_loop();
    }

    warn!("I2S PLL timeout");
    Err(Error::ClockTimeout)
}
