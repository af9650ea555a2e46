//! USB Audio channel configuration (wChannelConfig)

/// Spatial location of a logical channel.
#[repr(u16)]
#[non_exhaustive]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelConfig {
    LeftFront = 0x0001,
    RightFront = 0x0002,
    CenterFront = 0x0004,
    Lfe = 0x0008,
    LeftSurround = 0x0010,
    RightSurround = 0x0020,
}

/// Front left and right.
pub const STEREO: [ChannelConfig; 2] = [ChannelConfig::LeftFront, ChannelConfig::RightFront];

/// Assembles the channel configuration field. Channels must be unique.
pub const fn channel_mask(channels: &[ChannelConfig]) -> u16 {
    let mut mask = 0;
    let mut index = 0;

    while index < channels.len() {
        let channel = channels[index] as u16;
        assert!(mask & channel == 0, "duplicate channel");
        mask |= channel;
        index += 1;
    }

    mask
}

impl From<ChannelConfig> for u16 {
    fn from(t: ChannelConfig) -> u16 {
        t as u16
    }
}
