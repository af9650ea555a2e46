//! Audio class control requests: feature unit mute and volume, and the streaming endpoint's sampling frequency.
//!
//! Value-reading requests are answered in the setup stage. SET_CUR carries its value in a data stage, so the
//! request is kept as [`PendingControl`] until the payload arrives.

use audio::Volume;
use embassy_usb::control::{Recipient, Request};

use super::class_codes::*;
use super::stream::StreamSession;
use super::{CONTROL_INTERFACE, FEATURE_UNIT_ID};
use crate::error::{Error, Result};
use crate::AUDIO_OUT_EP;

/// The largest data stage that the class accepts.
pub const MAX_CONTROL_PAYLOAD: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlTarget {
    /// The feature unit of the audio control interface.
    Interface,
    /// The streaming endpoint.
    Endpoint,
}

/// A class request that awaits its data stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlRequest {
    pub command: u8,
    pub target: ControlTarget,
    pub control_selector: u8,
    pub channel: u8,
    pub unit: u8,
    pub length: u16,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PendingControl {
    #[default]
    Idle,
    AwaitingData(ControlRequest),
}

impl PendingControl {
    pub fn take(&mut self) -> Option<ControlRequest> {
        match core::mem::take(self) {
            PendingControl::Idle => None,
            PendingControl::AwaitingData(request) => Some(request),
        }
    }
}

/// The effect of a completed SET_CUR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlAction {
    SetMute(bool),
    SetVolume(Volume),
    SetSampleRate(u32),
}

/// Resolves the addressed entity. Requests for other interfaces, units or endpoints are not handled.
fn target(req: &Request) -> Result<ControlTarget> {
    match req.recipient {
        Recipient::Interface => {
            let interface_number = req.index as u8;
            let entity_index = (req.index >> 8) as u8;

            if interface_number != CONTROL_INTERFACE || entity_index != FEATURE_UNIT_ID {
                trace!("Unhandled request for interface {} entity {}", interface_number, entity_index);
                return Err(Error::UnsupportedRequest);
            }
            Ok(ControlTarget::Interface)
        }
        Recipient::Endpoint => {
            let endpoint_address = req.index as u8;

            if endpoint_address != AUDIO_OUT_EP {
                trace!("Unhandled request for endpoint {}", endpoint_address);
                return Err(Error::UnsupportedRequest);
            }
            Ok(ControlTarget::Endpoint)
        }
        _ => Err(Error::UnsupportedRequest),
    }
}

pub(crate) fn respond<'r>(buf: &'r mut [u8], value: &[u8], length: u16) -> Result<&'r [u8]> {
    if buf.len() < value.len() {
        return Err(Error::InvalidLength {
            expected: value.len(),
            actual: buf.len(),
        });
    }

    let length = value.len().min(length as usize);
    buf[..length].copy_from_slice(&value[..length]);
    Ok(&buf[..length])
}

/// Answers GET_CUR, GET_MIN, GET_MAX and GET_RES.
pub fn get_request<'r>(req: &Request, session: &StreamSession, buf: &'r mut [u8]) -> Result<&'r [u8]> {
    let control_selector = (req.value >> 8) as u8;

    match (target(req)?, req.request, control_selector) {
        (ControlTarget::Interface, GET_CUR, MUTE_CONTROL) => {
            trace!("Get mute state: {}", session.muted());
            respond(buf, &[session.muted() as u8], req.length)
        }
        (ControlTarget::Interface, GET_CUR, VOLUME_CONTROL) => {
            trace!("Get volume: {}", session.volume().raw());
            respond(buf, &session.volume().to_le_bytes(), req.length)
        }
        (ControlTarget::Interface, GET_MIN, VOLUME_CONTROL) => respond(buf, &Volume::MIN.to_le_bytes(), req.length),
        (ControlTarget::Interface, GET_MAX, VOLUME_CONTROL) => respond(buf, &Volume::MAX.to_le_bytes(), req.length),
        (ControlTarget::Interface, GET_RES, VOLUME_CONTROL) => {
            respond(buf, &Volume::RESOLUTION.to_le_bytes(), req.length)
        }
        (ControlTarget::Endpoint, GET_CUR, SAMPLING_FREQ_CONTROL) => {
            let sample_rate_hz = session.sample_rate().hz();
            trace!("Get sample rate: {} Hz", sample_rate_hz);
            respond(buf, &sample_rate_hz.to_le_bytes()[..3], req.length)
        }
        _ => {
            trace!("Unsupported get request {} for selector {}", req.request, control_selector);
            Err(Error::UnsupportedRequest)
        }
    }
}

impl ControlRequest {
    /// Validates a SET_CUR setup stage. Returns `None` if there is no data stage to wait for.
    pub fn from_setup(req: &Request) -> Result<Option<Self>> {
        let target = target(req)?;
        let control_selector = (req.value >> 8) as u8;

        let supported = match target {
            ControlTarget::Interface => matches!(control_selector, MUTE_CONTROL | VOLUME_CONTROL),
            ControlTarget::Endpoint => control_selector == SAMPLING_FREQ_CONTROL,
        };

        if req.request != SET_CUR || !supported {
            trace!("Unsupported set request {} for selector {}", req.request, control_selector);
            return Err(Error::UnsupportedRequest);
        }

        if req.length as usize > MAX_CONTROL_PAYLOAD {
            return Err(Error::InvalidLength {
                expected: MAX_CONTROL_PAYLOAD,
                actual: req.length as usize,
            });
        }

        if req.length == 0 {
            return Ok(None);
        }

        Ok(Some(ControlRequest {
            command: req.request,
            target,
            control_selector,
            channel: req.value as u8,
            unit: (req.index >> 8) as u8,
            length: req.length,
        }))
    }

    /// Interprets the data stage.
    pub fn decode(&self, data: &[u8]) -> Result<ControlAction> {
        match (self.target, self.control_selector) {
            (ControlTarget::Interface, MUTE_CONTROL) => {
                let [muted, ..] = *payload::<1>(data)?;
                Ok(ControlAction::SetMute(muted != 0))
            }
            (ControlTarget::Interface, VOLUME_CONTROL) => {
                Ok(ControlAction::SetVolume(Volume::from_le_bytes(*payload::<2>(data)?)))
            }
            (ControlTarget::Endpoint, SAMPLING_FREQ_CONTROL) => {
                let [low, mid, high] = *payload::<3>(data)?;
                Ok(ControlAction::SetSampleRate(u32::from_le_bytes([low, mid, high, 0])))
            }
            _ => Err(Error::UnsupportedRequest),
        }
    }
}

fn payload<const N: usize>(data: &[u8]) -> Result<&[u8; N]> {
    data.get(..N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(Error::InvalidLength {
            expected: N,
            actual: data.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(setup: [u8; 8]) -> Request {
        Request::parse(&setup)
    }

    #[test]
    fn set_volume_awaits_data() {
        // SET_CUR, feature unit 2, volume, master channel, 2 bytes
        let req = request([0x21, SET_CUR, 0x00, VOLUME_CONTROL, 0x00, FEATURE_UNIT_ID, 0x02, 0x00]);
        let pending = ControlRequest::from_setup(&req).unwrap().unwrap();

        assert_eq!(pending.target, ControlTarget::Interface);
        assert_eq!(pending.unit, FEATURE_UNIT_ID);
        assert_eq!(pending.length, 2);
        assert_eq!(
            pending.decode(&[0x00, 0xC1]),
            Ok(ControlAction::SetVolume(Volume::from_raw(-16128)))
        );
    }

    #[test]
    fn set_sample_rate_decodes_u24() {
        let req = request([0x22, SET_CUR, 0x00, SAMPLING_FREQ_CONTROL, AUDIO_OUT_EP, 0x00, 0x03, 0x00]);
        let pending = ControlRequest::from_setup(&req).unwrap().unwrap();

        assert_eq!(pending.decode(&[0x80, 0xBB, 0x00]), Ok(ControlAction::SetSampleRate(48_000)));
        assert_eq!(
            pending.decode(&[0x80, 0xBB]),
            Err(Error::InvalidLength { expected: 3, actual: 2 })
        );
    }

    #[test]
    fn set_without_data_stage() {
        let req = request([0x21, SET_CUR, 0x00, MUTE_CONTROL, 0x00, FEATURE_UNIT_ID, 0x00, 0x00]);
        assert_eq!(ControlRequest::from_setup(&req), Ok(None));
    }

    #[test]
    fn unknown_entity_is_rejected() {
        let req = request([0x21, SET_CUR, 0x00, MUTE_CONTROL, 0x00, 0x05, 0x01, 0x00]);
        assert_eq!(ControlRequest::from_setup(&req), Err(Error::UnsupportedRequest));

        let req = request([0x22, SET_CUR, 0x00, SAMPLING_FREQ_CONTROL, 0x02, 0x00, 0x03, 0x00]);
        assert_eq!(ControlRequest::from_setup(&req), Err(Error::UnsupportedRequest));
    }

    #[test]
    fn volume_range() {
        let session = StreamSession::new();
        let mut buf = [0u8; 8];

        let req = request([0xA1, GET_MIN, 0x00, VOLUME_CONTROL, 0x00, FEATURE_UNIT_ID, 0x02, 0x00]);
        assert_eq!(get_request(&req, &session, &mut buf), Ok(&[0x00, 0x82][..]));

        let req = request([0xA1, GET_MAX, 0x00, VOLUME_CONTROL, 0x00, FEATURE_UNIT_ID, 0x02, 0x00]);
        assert_eq!(get_request(&req, &session, &mut buf), Ok(&[0x00, 0x00][..]));

        let req = request([0xA1, GET_RES, 0x00, VOLUME_CONTROL, 0x00, FEATURE_UNIT_ID, 0x02, 0x00]);
        assert_eq!(get_request(&req, &session, &mut buf), Ok(&[0x00, 0x06][..]));

        let req = request([0xA1, GET_CUR, 0x00, VOLUME_CONTROL, 0x00, FEATURE_UNIT_ID, 0x02, 0x00]);
        assert_eq!(get_request(&req, &session, &mut buf), Ok(&[0x00, 0x8D][..]));
    }

    #[test]
    fn current_sample_rate() {
        let session = StreamSession::new();
        let mut buf = [0u8; 8];

        let req = request([0xA2, GET_CUR, 0x00, SAMPLING_FREQ_CONTROL, AUDIO_OUT_EP, 0x00, 0x03, 0x00]);
        assert_eq!(get_request(&req, &session, &mut buf), Ok(&[0x00, 0x77, 0x01][..]));
    }

    #[test]
    fn mute_has_no_range() {
        let session = StreamSession::new();
        let mut buf = [0u8; 8];

        let req = request([0xA1, GET_MIN, 0x00, MUTE_CONTROL, 0x00, FEATURE_UNIT_ID, 0x01, 0x00]);
        assert_eq!(get_request(&req, &session, &mut buf), Err(Error::UnsupportedRequest));
    }

    #[test]
    fn pending_is_taken_once() {
        let req = request([0x21, SET_CUR, 0x00, MUTE_CONTROL, 0x00, FEATURE_UNIT_ID, 0x01, 0x00]);
        let mut pending = PendingControl::AwaitingData(ControlRequest::from_setup(&req).unwrap().unwrap());

        assert!(pending.take().is_some());
        assert_eq!(pending, PendingControl::Idle);
        assert_eq!(pending.take(), None);
    }
}
