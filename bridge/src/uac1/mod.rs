//! USB Audio Class 1.0 speaker with an asynchronous isochronous stream and explicit feedback.
//!
//! Based on "Universal Serial Bus Device Class Definition for Audio Devices", Release 1.0.
//!
//! A single output streaming interface is supported. Received packets are decoded into the output buffer, which an
//! I2S DMA stream reads in circular mode. Once the buffer is half full, the output is started. From then on, the
//! buffer occupancy is steered towards half of the capacity by the rate that the feedback endpoint reports to the
//! host.
//!
//! [`Uac1Speaker`] has one method per event of the USB device stack: class init/de-init, setup and its data stage,
//! endpoint transfers, start-of-frame and incomplete isochronous IN transfers. The stack calls them from its
//! interrupt context, so none of them block.

use audio::{OutputBuffer, SampleRate, Volume, BIT_RESOLUTION, MAX_PACKET_SIZE, SAFE_ZONE_FRAMES};
use embassy_usb::control::{Request, RequestType};

use crate::error::{Error, Result};
use crate::feedback::{feedback_to_hz, FeedbackController, FeedbackGate, FeedbackMonitor};
use crate::i2s::DmaMonitor;
use crate::sink::{AudioSink, SinkState};
use crate::usb::{endpoint_number, EndpointType, SetupResponse, UsbDevice};
use crate::{AUDIO_IN_EP, AUDIO_OUT_EP, FEEDBACK_DECIMATION, FEEDBACK_PACKET_SIZE};

pub mod channel_config;
pub mod class_codes;
pub mod control;
pub mod descriptor;
pub mod stream;
pub mod terminal_type;

pub use channel_config::ChannelConfig;
use class_codes::*;
use control::{ControlAction, ControlRequest, PendingControl};
pub use stream::{OffsetState, StreamSession, StreamState};
pub use terminal_type::TerminalType;

pub const CONTROL_INTERFACE: u8 = 0;
pub const STREAMING_INTERFACE: u8 = 1;

/// Arbitrary unique identifier for the input terminal
pub const INPUT_TERMINAL_ID: u8 = 0x01;

/// Arbitrary unique identifier for the feature unit
pub const FEATURE_UNIT_ID: u8 = 0x02;

/// Arbitrary unique identifier for the output terminal
pub const OUTPUT_TERMINAL_ID: u8 = 0x03;

/// A snapshot for the application, e.g. for a status display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamStatus {
    pub state: StreamState,
    pub sample_rate: SampleRate,
    pub alt_setting: u8,
    pub volume: Volume,
    pub muted: bool,
    pub sink: SinkState,
    /// The reported feedback value in Q10.22 kHz.
    pub feedback: u32,
    pub margin_alarm: bool,
}

pub struct Uac1Speaker<S: AudioSink, D: DmaMonitor> {
    buffer: OutputBuffer,
    session: StreamSession,
    feedback: FeedbackController,
    gate: FeedbackGate,
    monitor: FeedbackMonitor,
    pending: PendingControl,
    margin_alarm: bool,
    frames_since_update: u32,
    report_requested: bool,
    sink: S,
    dma: D,
}

impl<S: AudioSink, D: DmaMonitor> Uac1Speaker<S, D> {
    pub fn new(sink: S, dma: D) -> Self {
        Self {
            buffer: OutputBuffer::new(),
            session: StreamSession::new(),
            feedback: FeedbackController::new(SampleRate::DEFAULT),
            gate: FeedbackGate::new(),
            monitor: FeedbackMonitor::new(),
            pending: PendingControl::Idle,
            margin_alarm: false,
            frames_since_update: 0,
            report_requested: false,
            sink,
            dma,
        }
    }

    /// The configuration was selected: open the endpoints and bring up the output.
    pub fn init<U: UsbDevice>(&mut self, usb: &mut U) -> Result<()> {
        usb.open_endpoint(AUDIO_OUT_EP, EndpointType::Isochronous, MAX_PACKET_SIZE as u16);
        usb.open_endpoint(AUDIO_IN_EP, EndpointType::Isochronous, FEEDBACK_PACKET_SIZE as u16);
        usb.flush_endpoint(AUDIO_IN_EP);

        // No feedback until streaming is set up.
        self.gate.block();

        self.session = StreamSession::new();
        self.pending = PendingControl::Idle;
        self.buffer.reset();
        self.feedback.select(self.session.sample_rate);
        self.monitor.reset(self.buffer.frame_capacity() / 2);
        self.margin_alarm = false;

        info!(
            "Audio class init: {} Hz, {} bit, volume {}%",
            self.session.sample_rate.hz(),
            self.session.bit_depth,
            self.session.volume.percent()
        );

        self.sink
            .init(self.session.sample_rate, self.session.volume.percent(), 0)
            .inspect_err(|e| warn!("Audio sink init failed: {:?}", e))?;

        Ok(())
    }

    /// The configuration was cleared, or the device was reset.
    pub fn deinit<U: UsbDevice>(&mut self, usb: &mut U) -> Result<()> {
        usb.flush_endpoint(AUDIO_OUT_EP);
        usb.flush_endpoint(AUDIO_IN_EP);
        usb.close_endpoint(AUDIO_OUT_EP);
        usb.close_endpoint(AUDIO_IN_EP);

        self.gate.release();
        self.session.halt();
        self.pending = PendingControl::Idle;

        info!("Audio class de-init");
        self.sink.deinit(0)?;
        Ok(())
    }

    /// Handles a setup stage that is addressed to one of the audio interfaces or endpoints.
    ///
    /// An error is answered with a stall.
    pub fn setup<'r, U: UsbDevice>(
        &mut self,
        usb: &mut U,
        req: Request,
        buf: &'r mut [u8],
    ) -> Result<SetupResponse<'r>> {
        let response = match req.request_type {
            RequestType::Class => self.class_request(req, buf),
            RequestType::Standard => self.standard_request(usb, req, buf),
            _ => Err(Error::UnsupportedRequest),
        };

        if let Err(e) = &response {
            trace!("Stall request {} (value {}, index {}): {:?}", req.request, req.value, req.index, e);
        }

        response
    }

    fn class_request<'r>(&mut self, req: Request, buf: &'r mut [u8]) -> Result<SetupResponse<'r>> {
        match req.request {
            GET_CUR | GET_MIN | GET_MAX | GET_RES => {
                control::get_request(&req, &self.session, buf).map(SetupResponse::Data)
            }
            SET_CUR => match ControlRequest::from_setup(&req)? {
                Some(request) => {
                    self.pending = PendingControl::AwaitingData(request);
                    Ok(SetupResponse::ReceiveData(request.length))
                }
                None => Ok(SetupResponse::Accepted),
            },
            _ => Err(Error::UnsupportedRequest),
        }
    }

    fn standard_request<'r, U: UsbDevice>(
        &mut self,
        usb: &mut U,
        req: Request,
        buf: &'r mut [u8],
    ) -> Result<SetupResponse<'r>> {
        match req.request {
            Request::GET_STATUS => {
                require_configured(usb)?;
                control::respond(buf, &[0x00, 0x00], req.length).map(SetupResponse::Data)
            }
            Request::GET_DESCRIPTOR => {
                let (descriptor_type, _) = req.descriptor_type_index();
                if descriptor_type != CS_DEVICE {
                    return Err(Error::UnsupportedRequest);
                }
                control::respond(buf, descriptor::audio_control_header(), req.length).map(SetupResponse::Data)
            }
            Request::GET_INTERFACE => {
                require_configured(usb)?;
                let alt_setting = match req.index as u8 {
                    STREAMING_INTERFACE => self.session.alt_setting,
                    _ => 0,
                };
                control::respond(buf, &[alt_setting], req.length).map(SetupResponse::Data)
            }
            Request::SET_INTERFACE => {
                require_configured(usb)?;
                let interface_number = req.index as u8;
                let alt_setting = req.value as u8;

                let max_alt_setting = match interface_number {
                    STREAMING_INTERFACE => 1,
                    _ => 0,
                };
                if req.value > max_alt_setting {
                    return Err(Error::InvalidAlternateSetting(alt_setting));
                }

                let result = match interface_number {
                    STREAMING_INTERFACE => self.select_alternate_setting(usb, alt_setting),
                    _ => Ok(()),
                };

                usb.flush_endpoint(AUDIO_IN_EP);
                result.map(|()| SetupResponse::Accepted)
            }
            _ => Err(Error::UnsupportedRequest),
        }
    }

    fn select_alternate_setting<U: UsbDevice>(&mut self, usb: &mut U, alt_setting: u8) -> Result<()> {
        if self.session.alt_setting == alt_setting {
            return Ok(());
        }

        info!("Streaming interface alternate setting {} -> {}", self.session.alt_setting, alt_setting);
        self.session.alt_setting = alt_setting;

        if alt_setting == 0 {
            self.stop_and_reset(usb);
            Ok(())
        } else {
            self.session.bit_depth = BIT_RESOLUTION;
            self.restart(usb)
        }
    }

    /// The data stage of a SET_CUR request was received.
    pub fn ep0_rx_ready<U: UsbDevice>(&mut self, usb: &mut U, data: &[u8]) -> Result<()> {
        let Some(request) = self.pending.take() else {
            return Ok(());
        };

        match request.decode(data)? {
            ControlAction::SetMute(muted) => {
                trace!("Set mute state: {}", muted);
                self.session.muted = muted;
                self.sink.set_mute(muted)?;
            }
            ControlAction::SetVolume(volume) => {
                trace!("Set volume: {} ({}%)", volume.raw(), volume.percent());
                self.session.volume = volume;
                self.sink.set_volume(volume.percent())?;
            }
            ControlAction::SetSampleRate(sample_rate_hz) => self.change_sample_rate(usb, sample_rate_hz)?,
        }

        Ok(())
    }

    fn change_sample_rate<U: UsbDevice>(&mut self, usb: &mut U, sample_rate_hz: u32) -> Result<()> {
        let Some(sample_rate) = SampleRate::from_hz(sample_rate_hz) else {
            warn!("Unsupported sample rate {} Hz", sample_rate_hz);
            return Err(Error::UnsupportedSampleRate(sample_rate_hz));
        };

        if sample_rate == self.session.sample_rate {
            return Ok(());
        }

        info!("Sample rate {} Hz -> {} Hz", self.session.sample_rate.hz(), sample_rate_hz);
        self.session.sample_rate = sample_rate;

        // Without bandwidth, the new rate takes effect with the next alternate setting change.
        if self.session.alt_setting == 0 {
            return Ok(());
        }
        self.restart(usb)
    }

    /// An IN transfer completed.
    pub fn data_in(&mut self, endpoint: u8) {
        if endpoint_number(endpoint) == endpoint_number(AUDIO_IN_EP) {
            self.gate.complete();
        }
    }

    /// An OUT packet was received. Returns the number of frames that were written to the buffer.
    pub fn data_out<U: UsbDevice>(&mut self, usb: &mut U, endpoint: u8, packet: &[u8]) -> Result<usize> {
        if !self.session.armed || endpoint_number(endpoint) != endpoint_number(AUDIO_OUT_EP) {
            return Ok(0);
        }

        let frame_count = self.buffer.write_packet(packet, MAX_PACKET_SIZE);
        if packet.len() > MAX_PACKET_SIZE {
            debug!("Dropped oversized packet of {} bytes", packet.len());
        }

        let started = if self.session.should_start(self.buffer.write_index(), self.buffer.capacity()) {
            self.start_playback()
        } else {
            Ok(())
        };

        usb.prepare_receive(AUDIO_OUT_EP, MAX_PACKET_SIZE);
        started.map(|()| frame_count)
    }

    fn start_playback(&mut self) -> Result<()> {
        // Stays in prefill on failure, the next packet tries again.
        self.sink.start(self.buffer.as_words(), self.buffer.size_bytes())?;
        self.session.begin_playback();

        // The consumer starts at the beginning of the buffer.
        let baseline = self.buffer.occupancy(self.buffer.size_bytes());
        self.monitor.reset(baseline);
        self.frames_since_update = 0;

        info!("Start playback with {} frames buffered", baseline);
        Ok(())
    }

    /// Start-of-frame, once per millisecond.
    pub fn sof<U: UsbDevice>(&mut self, usb: &mut U) {
        if !(self.session.consumer_enabled && self.session.armed) {
            return;
        }

        let occupancy = self.buffer.occupancy(self.dma.remaining_bytes());
        self.update_margin_alarm(occupancy);

        self.frames_since_update += 1;
        if self.frames_since_update >= FEEDBACK_DECIMATION {
            self.frames_since_update = 0;

            let value = self.feedback.update(occupancy, self.buffer.frame_capacity() / 2);
            self.monitor.record(occupancy, value);
            self.sink.periodic_tick(self.margin_alarm);
        }

        if self.gate.try_acquire(usb.frame_number()) {
            usb.transmit(AUDIO_IN_EP, &self.feedback.packet());
        }
    }

    fn update_margin_alarm(&mut self, occupancy: usize) {
        let writable = self.buffer.frame_capacity() - occupancy;
        let alarm = occupancy <= SAFE_ZONE_FRAMES || writable <= SAFE_ZONE_FRAMES;

        if alarm && !self.margin_alarm {
            warn!("Buffer margin low: {} frames buffered, {} writable", occupancy, writable);
        } else if !alarm && self.margin_alarm {
            info!("Buffer margin recovered");
        }

        self.margin_alarm = alarm;
    }

    /// An isochronous IN transfer was not picked up by the host in the current frame.
    pub fn iso_in_incomplete<U: UsbDevice>(&mut self, usb: &mut U) {
        let frame_number = usb.frame_number();
        if self.gate.abandon(frame_number) {
            trace!("Feedback not picked up in frame {}", frame_number);
            usb.flush_endpoint(AUDIO_IN_EP);
        }
    }

    /// An isochronous OUT packet was lost. Reception continues with the next frame.
    pub fn iso_out_incomplete<U: UsbDevice>(&mut self, usb: &mut U) {
        if self.session.armed {
            trace!("Audio packet lost in frame {}", usb.frame_number());
            usb.prepare_receive(AUDIO_OUT_EP, MAX_PACKET_SIZE);
        }
    }

    /// Stops the output and forgets all buffered audio.
    fn stop_and_reset<U: UsbDevice>(&mut self, usb: &mut U) {
        self.session.halt();
        self.gate.block();

        self.buffer.reset();
        self.monitor.reset(self.buffer.frame_capacity() / 2);
        self.margin_alarm = false;
        self.frames_since_update = 0;

        usb.flush_endpoint(AUDIO_IN_EP);
        usb.flush_endpoint(AUDIO_OUT_EP);

        if let Err(e) = self.sink.deinit(0) {
            warn!("Audio sink de-init failed: {:?}", e);
        }
    }

    /// Restarts streaming at the current sample rate.
    fn restart<U: UsbDevice>(&mut self, usb: &mut U) -> Result<()> {
        self.stop_and_reset(usb);

        let sample_rate = self.session.sample_rate;
        self.feedback.select(sample_rate);
        info!(
            "Restart at {} Hz, nominal feedback {} Hz",
            sample_rate.hz(),
            feedback_to_hz(self.feedback.nominal())
        );

        if let Err(e) = self.sink.init(sample_rate, self.session.volume.percent(), 0) {
            // Back to zero bandwidth, so that selecting alternate setting 1 again retries.
            self.session.alt_setting = 0;
            return Err(e.into());
        }

        self.gate.release();
        self.session.armed = true;
        usb.prepare_receive(AUDIO_OUT_EP, MAX_PACKET_SIZE);
        Ok(())
    }

    /// Asks for a dump of the feedback history on the next [`Uac1Speaker::dump_feedback_history`].
    ///
    /// Safe to call from another interrupt, e.g. a button.
    pub fn request_feedback_report(&mut self) {
        self.report_requested = true;
    }

    /// Logs the feedback history, if requested. Returns `true` if it was logged.
    pub fn dump_feedback_history(&mut self) -> bool {
        if !core::mem::take(&mut self.report_requested) {
            return false;
        }

        if let Some((min, max)) = self.monitor.range() {
            info!("Occupancy range {} to {} frames", min, max);
        }
        for record in self.monitor.history() {
            info!(
                "Frame {}: occupancy {}, feedback {} Hz",
                record.frame,
                record.occupancy,
                feedback_to_hz(record.feedback)
            );
        }

        true
    }

    pub fn status(&self) -> StreamStatus {
        StreamStatus {
            state: self.session.state(),
            sample_rate: self.session.sample_rate,
            alt_setting: self.session.alt_setting,
            volume: self.session.volume,
            muted: self.session.muted,
            sink: self.sink.state(),
            feedback: self.feedback.value(),
            margin_alarm: self.margin_alarm,
        }
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    pub fn buffer(&self) -> &OutputBuffer {
        &self.buffer
    }

    pub fn feedback(&self) -> &FeedbackController {
        &self.feedback
    }

    pub fn monitor(&self) -> &FeedbackMonitor {
        &self.monitor
    }

    pub fn margin_alarm(&self) -> bool {
        self.margin_alarm
    }

    /// Frames written but not yet consumed by the output.
    pub fn occupancy(&self) -> usize {
        self.buffer.occupancy(self.dma.remaining_bytes())
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn dma(&self) -> &D {
        &self.dma
    }

    pub fn dma_mut(&mut self) -> &mut D {
        &mut self.dma
    }
}

fn require_configured<U: UsbDevice>(usb: &U) -> Result<()> {
    if usb.is_configured() {
        Ok(())
    } else {
        Err(Error::NotConfigured)
    }
}
