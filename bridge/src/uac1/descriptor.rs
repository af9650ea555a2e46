//! Configuration descriptor of the speaker function.
//!
//! Topology: USB streaming input terminal -> feature unit (mute, volume) -> speaker output terminal.
//! The streaming interface has a zero-bandwidth alternate setting 0 and the operational alternate setting 1, with the
//! isochronous data endpoint and its explicit feedback endpoint.

use audio::{SampleRate, BIT_RESOLUTION, CHANNEL_COUNT, MAX_PACKET_SIZE, SUBFRAME_SIZE};

use super::channel_config::{channel_mask, STEREO};
use super::class_codes::*;
use super::terminal_type::TerminalType;
use super::{CONTROL_INTERFACE, FEATURE_UNIT_ID, INPUT_TERMINAL_ID, OUTPUT_TERMINAL_ID, STREAMING_INTERFACE};
use crate::{AUDIO_IN_EP, AUDIO_OUT_EP, FEEDBACK_PACKET_SIZE, FEEDBACK_REFRESH};

pub const CONFIG_DESCRIPTOR_SIZE: usize = 124;

const CONFIG_HEADER_SIZE: usize = 9;
const INTERFACE_SIZE: usize = 9;
const AC_HEADER_SIZE: usize = 9;
const INPUT_TERMINAL_SIZE: usize = 12;
const FEATURE_UNIT_SIZE: usize = 9;
const OUTPUT_TERMINAL_SIZE: usize = 9;

/// Offset of the class-specific audio control header.
const AC_HEADER_OFFSET: usize = CONFIG_HEADER_SIZE + INTERFACE_SIZE;

/// Class-specific audio control descriptors: header, terminals and unit.
const AC_TOTAL_LENGTH: u16 = (AC_HEADER_SIZE + INPUT_TERMINAL_SIZE + FEATURE_UNIT_SIZE + OUTPUT_TERMINAL_SIZE) as u16;

pub static CONFIG_DESCRIPTOR: [u8; CONFIG_DESCRIPTOR_SIZE] = configuration_descriptor();

pub static DEVICE_QUALIFIER: [u8; 10] = [
    0x0A,                        // bLength
    DEVICE_QUALIFIER_DESCRIPTOR, // bDescriptorType
    0x00,
    0x02, // bcdUSB (2.00)
    0x00, // bDeviceClass (per interface)
    0x00, // bDeviceSubClass
    0x00, // bDeviceProtocol
    0x40, // bMaxPacketSize0
    0x01, // bNumConfigurations
    0x00, // bReserved
];

/// The class-specific audio control header, as returned for a class descriptor request.
pub fn audio_control_header() -> &'static [u8] {
    &CONFIG_DESCRIPTOR[AC_HEADER_OFFSET..AC_HEADER_OFFSET + AC_HEADER_SIZE]
}

/// Appends descriptor bytes in const context.
struct DescriptorWriter {
    buf: [u8; CONFIG_DESCRIPTOR_SIZE],
    position: usize,
}

impl DescriptorWriter {
    const fn new() -> Self {
        Self {
            buf: [0; CONFIG_DESCRIPTOR_SIZE],
            position: 0,
        }
    }

    /// Writes one descriptor. `bLength` is prepended.
    const fn write(mut self, descriptor_type: u8, bytes: &[u8]) -> Self {
        self.buf[self.position] = (bytes.len() + 2) as u8;
        self.buf[self.position + 1] = descriptor_type;
        self.position += 2;

        let mut index = 0;
        while index < bytes.len() {
            self.buf[self.position] = bytes[index];
            self.position += 1;
            index += 1;
        }

        self
    }

    const fn finish(self) -> [u8; CONFIG_DESCRIPTOR_SIZE] {
        assert!(self.position == CONFIG_DESCRIPTOR_SIZE, "descriptor size mismatch");
        self.buf
    }
}

const fn u16_le(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}

const fn configuration_descriptor() -> [u8; CONFIG_DESCRIPTOR_SIZE] {
    let total_length = u16_le(CONFIG_DESCRIPTOR_SIZE as u16);
    let ac_total_length = u16_le(AC_TOTAL_LENGTH);
    let adc_version = u16_le(ADC_VERSION);
    let streaming = TerminalType::UsbStreaming.to_le_bytes();
    let speaker = TerminalType::OutSpeaker.to_le_bytes();
    let channels = u16_le(channel_mask(&STEREO));
    let pcm = u16_le(PCM);
    let max_packet_size = u16_le(MAX_PACKET_SIZE as u16);
    let feedback_packet_size = u16_le(FEEDBACK_PACKET_SIZE as u16);
    let rate_0 = SampleRate::ALL[0].hz().to_le_bytes();
    let rate_1 = SampleRate::ALL[1].hz().to_le_bytes();
    let rate_2 = SampleRate::ALL[2].hz().to_le_bytes();

    DescriptorWriter::new()
        // Configuration [USB 9.6.3]
        .write(
            CONFIGURATION_DESCRIPTOR,
            &[
                total_length[0],
                total_length[1], // wTotalLength
                0x02,            // bNumInterfaces
                0x01,            // bConfigurationValue
                0x00,            // iConfiguration (none)
                0x80,            // bmAttributes (bus powered)
                0x32,            // bMaxPower (100 mA)
            ],
        )
        // Audio control interface [UAC 4.3.1]
        .write(
            INTERFACE_DESCRIPTOR,
            &[
                CONTROL_INTERFACE,         // bInterfaceNumber
                0x00,                      // bAlternateSetting
                0x00,                      // bNumEndpoints
                USB_AUDIO_CLASS,           // bInterfaceClass
                USB_AUDIOCONTROL_SUBCLASS, // bInterfaceSubClass
                PROTOCOL_NONE,             // bInterfaceProtocol
                0x00,                      // iInterface (none)
            ],
        )
        // Class-specific AC interface header [UAC 4.3.2]
        .write(
            CS_INTERFACE,
            &[
                HEADER_SUBTYPE, // bDescriptorSubtype
                adc_version[0],
                adc_version[1], // bcdADC
                ac_total_length[0],
                ac_total_length[1],  // wTotalLength
                0x01,                // bInCollection (1 streaming interface)
                STREAMING_INTERFACE, // baInterfaceNr
            ],
        )
        // Input terminal [UAC 4.3.2.1]
        .write(
            CS_INTERFACE,
            &[
                INPUT_TERMINAL,    // bDescriptorSubtype
                INPUT_TERMINAL_ID, // bTerminalID
                streaming[0],
                streaming[1],         // wTerminalType
                0x00,                 // bAssocTerminal (none)
                CHANNEL_COUNT as u8,  // bNrChannels
                channels[0],
                channels[1], // wChannelConfig
                0x00,        // iChannelNames (none)
                0x00,        // iTerminal (none)
            ],
        )
        // Feature unit [UAC 4.3.2.5]
        // Mute and volume are master controls, the channels have none.
        .write(
            CS_INTERFACE,
            &[
                FEATURE_UNIT,                         // bDescriptorSubtype
                FEATURE_UNIT_ID,                      // bUnitID
                INPUT_TERMINAL_ID,                    // bSourceID
                0x01,                                 // bControlSize
                FU_CONTROL_MUTE | FU_CONTROL_VOLUME, // bmaControls(0)
                0x00,                                 // bmaControls(1)
                0x00,                                 // iFeature (none)
            ],
        )
        // Output terminal [UAC 4.3.2.2]
        .write(
            CS_INTERFACE,
            &[
                OUTPUT_TERMINAL,    // bDescriptorSubtype
                OUTPUT_TERMINAL_ID, // bTerminalID
                speaker[0],
                speaker[1],      // wTerminalType
                0x00,            // bAssocTerminal (none)
                FEATURE_UNIT_ID, // bSourceID
                0x00,            // iTerminal (none)
            ],
        )
        // Audio streaming interface, zero bandwidth [UAC 4.5.1]
        .write(
            INTERFACE_DESCRIPTOR,
            &[
                STREAMING_INTERFACE,         // bInterfaceNumber
                0x00,                        // bAlternateSetting
                0x00,                        // bNumEndpoints
                USB_AUDIO_CLASS,             // bInterfaceClass
                USB_AUDIOSTREAMING_SUBCLASS, // bInterfaceSubClass
                PROTOCOL_NONE,               // bInterfaceProtocol
                0x00,                        // iInterface (none)
            ],
        )
        // Audio streaming interface, operational [UAC 4.5.1]
        .write(
            INTERFACE_DESCRIPTOR,
            &[
                STREAMING_INTERFACE,         // bInterfaceNumber
                0x01,                        // bAlternateSetting
                0x02,                        // bNumEndpoints (data and feedback)
                USB_AUDIO_CLASS,             // bInterfaceClass
                USB_AUDIOSTREAMING_SUBCLASS, // bInterfaceSubClass
                PROTOCOL_NONE,               // bInterfaceProtocol
                0x00,                        // iInterface (none)
            ],
        )
        // Class-specific AS interface [UAC 4.5.2]
        .write(
            CS_INTERFACE,
            &[
                AS_GENERAL,        // bDescriptorSubtype
                INPUT_TERMINAL_ID, // bTerminalLink
                0x01,              // bDelay (1 frame)
                pcm[0],
                pcm[1], // wFormatTag (PCM)
            ],
        )
        // Type I format [UAC Formats 2.2.5]
        .write(
            CS_INTERFACE,
            &[
                FORMAT_TYPE,                  // bDescriptorSubtype
                FORMAT_TYPE_I,                // bFormatType
                CHANNEL_COUNT as u8,          // bNrChannels
                SUBFRAME_SIZE as u8,          // bSubframeSize
                BIT_RESOLUTION,               // bBitResolution
                SampleRate::ALL.len() as u8,  // bSamFreqType (discrete)
                rate_0[0],
                rate_0[1],
                rate_0[2],
                rate_1[0],
                rate_1[1],
                rate_1[2],
                rate_2[0],
                rate_2[1],
                rate_2[2], // tSamFreq
            ],
        )
        // Streaming endpoint, isochronous asynchronous [UAC 4.6.1.1]
        .write(
            ENDPOINT_DESCRIPTOR,
            &[
                AUDIO_OUT_EP,      // bEndpointAddress
                ISOCHRONOUS_ASYNC, // bmAttributes
                max_packet_size[0],
                max_packet_size[1], // wMaxPacketSize
                0x01,               // bInterval (1 ms)
                0x00,               // bRefresh
                AUDIO_IN_EP,        // bSynchAddress (the feedback endpoint)
            ],
        )
        // Class-specific streaming endpoint [UAC 4.6.1.2]
        .write(
            CS_ENDPOINT,
            &[
                EP_GENERAL, // bDescriptorSubtype
                0x01,       // bmAttributes (sampling frequency control)
                0x00,       // bLockDelayUnits
                0x00,
                0x00, // wLockDelay
            ],
        )
        // Feedback endpoint [UAC 4.6.2.1]
        // Must follow the streaming endpoint.
        .write(
            ENDPOINT_DESCRIPTOR,
            &[
                AUDIO_IN_EP,          // bEndpointAddress
                ISOCHRONOUS_FEEDBACK, // bmAttributes
                feedback_packet_size[0],
                feedback_packet_size[1], // wMaxPacketSize
                0x01,                    // bInterval (1 ms)
                FEEDBACK_REFRESH,        // bRefresh
                0x00,                    // bSynchAddress (none)
            ],
        )
        .finish()
}
