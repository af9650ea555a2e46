//! Audio class codes [UAC 1.0, appendix A]
#![allow(unused)]

// Standard descriptor types
pub const CONFIGURATION_DESCRIPTOR: u8 = 0x02;
pub const INTERFACE_DESCRIPTOR: u8 = 0x04;
pub const ENDPOINT_DESCRIPTOR: u8 = 0x05;
pub const DEVICE_QUALIFIER_DESCRIPTOR: u8 = 0x06;

// Class, subclass and protocol
pub const USB_AUDIO_CLASS: u8 = 0x01;
pub const USB_AUDIOCONTROL_SUBCLASS: u8 = 0x01;
pub const USB_AUDIOSTREAMING_SUBCLASS: u8 = 0x02;
pub const PROTOCOL_NONE: u8 = 0x00;

// Class-specific descriptor types
pub const CS_DEVICE: u8 = 0x21;
pub const CS_INTERFACE: u8 = 0x24;
pub const CS_ENDPOINT: u8 = 0x25;

pub const ADC_VERSION: u16 = 0x0100;

// Audio control interface descriptor subtypes
pub const HEADER_SUBTYPE: u8 = 0x01;
pub const INPUT_TERMINAL: u8 = 0x02;
pub const OUTPUT_TERMINAL: u8 = 0x03;
pub const FEATURE_UNIT: u8 = 0x06;

// Audio streaming interface descriptor subtypes
pub const AS_GENERAL: u8 = 0x01;
pub const FORMAT_TYPE: u8 = 0x02;

pub const FORMAT_TYPE_I: u8 = 0x01;
pub const PCM: u16 = 0x0001;

// Audio class-specific endpoint descriptor subtypes
pub const EP_GENERAL: u8 = 0x01;

// Audio class-specific request codes
pub const SET_CUR: u8 = 0x01;
pub const GET_CUR: u8 = 0x81;
pub const GET_MIN: u8 = 0x82;
pub const GET_MAX: u8 = 0x83;
pub const GET_RES: u8 = 0x84;

// Feature unit control selectors
pub const MUTE_CONTROL: u8 = 0x01;
pub const VOLUME_CONTROL: u8 = 0x02;

// Feature unit bmaControls bits
pub const FU_CONTROL_MUTE: u8 = 1 << 0;
pub const FU_CONTROL_VOLUME: u8 = 1 << 1;

// Endpoint control selectors
pub const SAMPLING_FREQ_CONTROL: u8 = 0x01;

// Endpoint attributes
pub const ISOCHRONOUS_ASYNC: u8 = 0x05;
pub const ISOCHRONOUS_FEEDBACK: u8 = 0x11;
