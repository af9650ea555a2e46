//! The low-level USB device stack, as seen by the audio class.
//!
//! The stack owns the hardware endpoints and dispatches setup, data and frame events to the class. Here, the class
//! only needs the small set of operations below, which keeps it independent of a particular USB peripheral.

pub use embassy_usb::driver::EndpointType;

pub trait UsbDevice {
    fn open_endpoint(&mut self, address: u8, ep_type: EndpointType, max_packet_size: u16);

    fn close_endpoint(&mut self, address: u8);

    /// Discards any pending transfer on the endpoint.
    fn flush_endpoint(&mut self, address: u8);

    /// Queues `data` for the next IN transaction on the endpoint.
    fn transmit(&mut self, address: u8, data: &[u8]);

    /// Arms the endpoint to receive up to `max_len` bytes.
    fn prepare_receive(&mut self, address: u8, max_len: usize);

    /// The 11-bit frame number of the current start-of-frame.
    fn frame_number(&self) -> u16;

    fn is_configured(&self) -> bool;
}

/// How the device stack shall complete a setup stage.
#[derive(Debug, PartialEq, Eq)]
pub enum SetupResponse<'r> {
    /// Send the data stage.
    Data(&'r [u8]),
    /// Receive a data stage of the given length, then call the class' data handler.
    ReceiveData(u16),
    /// Complete with a status stage, no data.
    Accepted,
}

/// The endpoint number, without the direction bit.
pub const fn endpoint_number(address: u8) -> u8 {
    address & 0x0F
}
