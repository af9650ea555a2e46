//! Circular output buffer, written by USB packets and read by a circular DMA stream.
//!
//! Only the write position is stored. The read position is owned by the DMA hardware and is derived from the number
//! of bytes the current transfer pass has left.

use crate::{pcm, FRAME_SIZE, WORDS_PER_FRAME};

pub struct SampleRingBuffer<const N: usize> {
    words: [u16; N],
    write_index: usize,
}

impl<const N: usize> Default for SampleRingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SampleRingBuffer<N> {
    const FRAME_ALIGNED: () = assert!(N > 0 && N % WORDS_PER_FRAME == 0);

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::FRAME_ALIGNED;

        Self {
            words: [0; N],
            write_index: 0,
        }
    }

    /// Capacity in words.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Capacity in stereo frames.
    pub const fn frame_capacity(&self) -> usize {
        N / WORDS_PER_FRAME
    }

    /// Size of the storage in bytes, as programmed into the DMA stream.
    pub const fn size_bytes(&self) -> usize {
        N * core::mem::size_of::<u16>()
    }

    pub fn write_index(&self) -> usize {
        self.write_index
    }

    pub fn as_words(&self) -> &[u16] {
        &self.words
    }

    /// Decodes a packet of stereo frames into the buffer and returns the number of frames written.
    ///
    /// Packets longer than `max_packet_size` are dropped as a whole. Trailing bytes that do not form a complete frame
    /// are ignored.
    pub fn write_packet(&mut self, packet: &[u8], max_packet_size: usize) -> usize {
        if packet.len() > max_packet_size {
            return 0;
        }

        let mut frame_count = 0;
        for chunk in packet.chunks_exact(FRAME_SIZE) {
            let frame = pcm::decode_frame([chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5]]);

            let start = self.write_index;
            self.words[start..start + WORDS_PER_FRAME].copy_from_slice(&frame);

            self.write_index = start + WORDS_PER_FRAME;
            if self.write_index >= N {
                self.write_index = 0;
            }

            frame_count += 1;
        }

        frame_count
    }

    /// The consumer position, from the bytes that remain in the current DMA pass.
    pub fn read_index(&self, remaining_bytes: usize) -> usize {
        let remaining_words = (remaining_bytes / core::mem::size_of::<u16>()).min(N);
        (N - remaining_words) % N
    }

    /// Frames written but not yet consumed.
    pub fn occupancy(&self, remaining_bytes: usize) -> usize {
        let read_index = self.read_index(remaining_bytes);
        ((self.write_index + N - read_index) % N) / WORDS_PER_FRAME
    }

    /// Frames that can be written before the producer reaches the consumer.
    pub fn writable(&self, remaining_bytes: usize) -> usize {
        self.frame_capacity() - self.occupancy(remaining_bytes)
    }

    /// Rewinds the producer and silences the storage.
    pub fn reset(&mut self) {
        self.write_index = 0;
        self.words.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Buffer = SampleRingBuffer<16>;

    fn packet(frames: usize) -> Vec<u8> {
        (0..frames * FRAME_SIZE).map(|i| i as u8).collect()
    }

    #[test]
    fn write_advances_by_frames() {
        let mut buffer = Buffer::new();

        assert_eq!(buffer.write_packet(&packet(2), 64), 2);
        assert_eq!(buffer.write_index(), 8);
        assert_eq!(&buffer.as_words()[..4], &pcm::decode_frame([0, 1, 2, 3, 4, 5]));
    }

    #[test]
    fn write_wraps_at_capacity() {
        let mut buffer = Buffer::new();

        assert_eq!(buffer.write_packet(&packet(3), 64), 3);
        assert_eq!(buffer.write_packet(&packet(2), 64), 2);
        assert_eq!(buffer.write_index(), 4);
    }

    #[test]
    fn oversized_packet_is_dropped() {
        let mut buffer = Buffer::new();

        assert_eq!(buffer.write_packet(&packet(3), 12), 0);
        assert_eq!(buffer.write_index(), 0);
        assert!(buffer.as_words().iter().all(|&w| w == 0));
    }

    #[test]
    fn partial_frame_is_ignored() {
        let mut buffer = Buffer::new();

        assert_eq!(buffer.write_packet(&[1, 2, 3, 4, 5, 6, 7, 8], 64), 1);
        assert_eq!(buffer.write_index(), 4);
    }

    #[test]
    fn occupancy_follows_consumer() {
        let mut buffer = Buffer::new();
        buffer.write_packet(&packet(3), 64);

        // Consumer at the start of a pass.
        assert_eq!(buffer.read_index(buffer.size_bytes()), 0);
        assert_eq!(buffer.occupancy(buffer.size_bytes()), 3);

        // Consumer two frames in.
        assert_eq!(buffer.read_index(buffer.size_bytes() - 16), 8);
        assert_eq!(buffer.occupancy(buffer.size_bytes() - 16), 1);
        assert_eq!(buffer.writable(buffer.size_bytes() - 16), 3);

        // Consumer caught up with the producer.
        assert_eq!(buffer.occupancy(8), 0);
        assert_eq!(buffer.writable(8), 4);

        // End of a pass is the start of the next one.
        assert_eq!(buffer.read_index(0), 0);
    }

    #[test]
    fn reset_silences() {
        let mut buffer = Buffer::new();
        buffer.write_packet(&packet(2), 64);
        buffer.reset();

        assert_eq!(buffer.write_index(), 0);
        assert!(buffer.as_words().iter().all(|&w| w == 0));
    }
}
