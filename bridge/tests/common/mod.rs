//! Host-side stand-ins for the USB device stack, the audio sink and the I2S DMA stream.
#![allow(dead_code)]

use audio::{SampleRate, BUFFER_WORD_COUNT, FRAME_SIZE, WORDS_PER_FRAME};
use embassy_usb::control::Request;
use usb_i2s_bridge::i2s::DmaMonitor;
use usb_i2s_bridge::sink::{AudioSink, SinkError, SinkState};
use usb_i2s_bridge::usb::{EndpointType, SetupResponse, UsbDevice};
use usb_i2s_bridge::{Error, Uac1Speaker, AUDIO_IN_EP, AUDIO_OUT_EP};

pub type Speaker = Uac1Speaker<MockSink, MockDma>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UsbEvent {
    Open(u8, EndpointType, u16),
    Close(u8),
    Flush(u8),
    Transmit(u8, Vec<u8>),
    PrepareReceive(u8, usize),
}

pub struct MockUsb {
    pub events: Vec<UsbEvent>,
    pub frame_number: u16,
    pub configured: bool,
}

impl MockUsb {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            frame_number: 0,
            configured: true,
        }
    }

    pub fn transmissions(&self) -> Vec<Vec<u8>> {
        self.events
            .iter()
            .filter_map(|event| match event {
                UsbEvent::Transmit(AUDIO_IN_EP, data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, event: &UsbEvent) -> usize {
        self.events.iter().filter(|e| *e == event).count()
    }
}

impl UsbDevice for MockUsb {
    fn open_endpoint(&mut self, address: u8, ep_type: EndpointType, max_packet_size: u16) {
        self.events.push(UsbEvent::Open(address, ep_type, max_packet_size));
    }

    fn close_endpoint(&mut self, address: u8) {
        self.events.push(UsbEvent::Close(address));
    }

    fn flush_endpoint(&mut self, address: u8) {
        self.events.push(UsbEvent::Flush(address));
    }

    fn transmit(&mut self, address: u8, data: &[u8]) {
        self.events.push(UsbEvent::Transmit(address, data.to_vec()));
    }

    fn prepare_receive(&mut self, address: u8, max_len: usize) {
        self.events.push(UsbEvent::PrepareReceive(address, max_len));
    }

    fn frame_number(&self) -> u16 {
        self.frame_number
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkCall {
    Init(SampleRate, u8),
    Deinit,
    /// Buffer length in words, and the transfer size in bytes.
    Start(usize, usize),
    SetVolume(u8),
    SetMute(bool),
}

pub struct MockSink {
    pub calls: Vec<SinkCall>,
    pub ticks: Vec<bool>,
    pub state: SinkState,
    pub fail_init: bool,
    pub fail_start: bool,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            ticks: Vec::new(),
            state: SinkState::Reset,
            fail_init: false,
            fail_start: false,
        }
    }

    pub fn init_count(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, SinkCall::Init(..))).count()
    }

    pub fn start_count(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, SinkCall::Start(..))).count()
    }
}

impl AudioSink for MockSink {
    fn init(&mut self, sample_rate: SampleRate, volume_percent: u8, _options: u8) -> Result<(), SinkError> {
        self.calls.push(SinkCall::Init(sample_rate, volume_percent));
        if self.fail_init {
            self.state = SinkState::Error;
            return Err(SinkError::Init);
        }
        self.state = SinkState::Ready;
        Ok(())
    }

    fn deinit(&mut self, _options: u8) -> Result<(), SinkError> {
        self.calls.push(SinkCall::Deinit);
        self.state = SinkState::Reset;
        Ok(())
    }

    fn start(&mut self, buffer: &[u16], size: usize) -> Result<(), SinkError> {
        self.calls.push(SinkCall::Start(buffer.len(), size));
        if self.fail_start {
            self.state = SinkState::Error;
            return Err(SinkError::Transfer);
        }
        self.state = SinkState::Playing;
        Ok(())
    }

    fn set_volume(&mut self, volume_percent: u8) -> Result<(), SinkError> {
        self.calls.push(SinkCall::SetVolume(volume_percent));
        Ok(())
    }

    fn set_mute(&mut self, muted: bool) -> Result<(), SinkError> {
        self.calls.push(SinkCall::SetMute(muted));
        Ok(())
    }

    fn periodic_tick(&mut self, margin_alarm: bool) {
        self.ticks.push(margin_alarm);
    }

    fn state(&self) -> SinkState {
        self.state
    }
}

/// A DMA stream whose read position is moved by the test.
pub struct MockDma {
    /// Read position in words.
    pub position: usize,
}

impl MockDma {
    /// Consumes `frames` stereo frames.
    pub fn advance(&mut self, frames: usize) {
        self.position = (self.position + frames * WORDS_PER_FRAME) % BUFFER_WORD_COUNT;
    }
}

impl DmaMonitor for MockDma {
    fn remaining_bytes(&self) -> usize {
        (BUFFER_WORD_COUNT - self.position) * 2
    }
}

pub fn request(setup: [u8; 8]) -> Request {
    Request::parse(&setup)
}

/// A packet of `frames` frames with distinct sample values.
pub fn packet(frames: usize) -> Vec<u8> {
    (0..frames * FRAME_SIZE).map(|i| (i % 251) as u8).collect()
}

/// A speaker after class init.
pub fn speaker() -> (Speaker, MockUsb) {
    let mut usb = MockUsb::new();
    let mut speaker = Uac1Speaker::new(MockSink::new(), MockDma { position: 0 });
    speaker.init(&mut usb).unwrap();
    (speaker, usb)
}

pub fn set_interface(speaker: &mut Speaker, usb: &mut MockUsb, alt_setting: u8) -> Result<(), Error> {
    let mut buf = [0u8; 64];
    let req = request([0x01, 0x0B, alt_setting, 0x00, 0x01, 0x00, 0x00, 0x00]);
    speaker.setup(usb, req, &mut buf).map(|response| {
        assert_eq!(response, SetupResponse::Accepted);
    })
}

/// SET_CUR of the sampling frequency, setup and data stage.
pub fn set_sample_rate(speaker: &mut Speaker, usb: &mut MockUsb, hz: u32) -> Result<(), Error> {
    let mut buf = [0u8; 64];
    let req = request([0x22, 0x01, 0x00, 0x01, AUDIO_OUT_EP, 0x00, 0x03, 0x00]);
    let response = speaker.setup(usb, req, &mut buf)?;
    assert_eq!(response, SetupResponse::ReceiveData(3));

    let bytes = hz.to_le_bytes();
    speaker.ep0_rx_ready(usb, &bytes[..3])
}

/// A speaker that streams, with half of the buffer filled and the consumer at the start.
pub fn streaming_speaker() -> (Speaker, MockUsb) {
    let (mut speaker, mut usb) = speaker();
    set_interface(&mut speaker, &mut usb, 1).unwrap();

    for _ in 0..6 {
        speaker.data_out(&mut usb, AUDIO_OUT_EP, &packet(97)).unwrap();
    }
    assert_eq!(speaker.sink().start_count(), 1);

    usb.events.clear();
    (speaker, usb)
}
