//! Feature unit volume, in 8.8 fixed point dB.

/// A volume level in units of 1/256 dB.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Volume(i16);

impl Volume {
    pub const STEPS_PER_DB: i16 = 256;

    /// -126 dB
    pub const MIN: Volume = Volume(0x8200_u16 as i16);
    /// 0 dB
    pub const MAX: Volume = Volume(0x0000);
    /// 6 dB steps
    pub const RESOLUTION: Volume = Volume(0x0600);
    /// -115 dB
    pub const DEFAULT: Volume = Volume(0x8D00_u16 as i16);

    pub const fn from_raw(raw: i16) -> Self {
        Volume(raw)
    }

    pub const fn raw(self) -> i16 {
        self.0
    }

    pub const fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Volume(i16::from_le_bytes(bytes))
    }

    pub const fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    /// Whole dB, rounded towards zero.
    pub const fn db(self) -> i16 {
        self.0 / Self::STEPS_PER_DB
    }

    /// Position within `MIN..=MAX` as 0 to 100 percent. Levels outside of the range are clamped.
    pub fn percent(self) -> u8 {
        let min = Self::MIN.0 as i32;
        let max = Self::MAX.0 as i32;
        let step = (max - min) / 100;

        ((self.0 as i32).clamp(min, max) - min)
            .checked_div(step)
            .map_or(0, |percent| percent.min(100) as u8)
    }
}

impl Default for Volume {
    fn default() -> Self {
        Volume::DEFAULT
    }
}
