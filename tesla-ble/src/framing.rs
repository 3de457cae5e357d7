/*!
    Length-prefixed BLE transport framing.

    Every message in either direction is `BE-u16 length || payload`, carried
    in write chunks of at most 20 bytes. Reassembly tolerates arbitrary
    chunk boundaries; anything oversized or stalled is discarded wholesale
    and the sender's retry rebuilds it.
*/

use tracing::{trace, warn};

use crate::command::time_since;
use crate::constants::{BLOCK_LENGTH, MAX_MESSAGE_SIZE, RX_TIMEOUT_MS};
use crate::error::{ClientResult, ProtocolError};

#[derive(Debug, Default)]
pub struct Framer {
    write_queue: std::collections::VecDeque<Vec<u8>>,
    read_buffer: Vec<u8>,
    last_rx_at_ms: u32,
}

impl Framer {
    pub fn new() -> Self {
        Self::default()
    }

    /**
        Fragment a serialized message into transmit chunks: prepend the
        big-endian length, split into ≤20-byte pieces, queue them.
    */
    pub fn enqueue_message(&mut self, message: &[u8]) -> ClientResult<()> {
        let framed_len = message.len() + 2;
        if framed_len > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge(framed_len));
        }

        let mut framed = Vec::with_capacity(framed_len);
        framed.extend_from_slice(&(message.len() as u16).to_be_bytes());
        framed.extend_from_slice(message);

        for chunk in framed.chunks(BLOCK_LENGTH) {
            self.write_queue.push_back(chunk.to_vec());
        }
        trace!(
            len = message.len(),
            chunks = framed_len.div_ceil(BLOCK_LENGTH),
            "message fragmented"
        );
        Ok(())
    }

    /// One chunk for the transport to write, when it is ready for one.
    pub fn take_next_chunk(&mut self) -> Option<Vec<u8>> {
        self.write_queue.pop_front()
    }

    pub fn pending_chunks(&self) -> usize {
        self.write_queue.len()
    }

    /**
        Absorb a received notify payload. Returns a complete de-framed
        message as soon as the length prefix is satisfied.
    */
    pub fn push_chunk(&mut self, data: &[u8], now_ms: u32) -> Option<Vec<u8>> {
        if data.is_empty() {
            return None;
        }

        // A stalled partial message will never complete; start over.
        if !self.read_buffer.is_empty()
            && time_since(now_ms, self.last_rx_at_ms) > RX_TIMEOUT_MS
        {
            warn!(
                buffered = self.read_buffer.len(),
                "reassembly stalled, discarding partial message"
            );
            self.read_buffer.clear();
        }

        if self.read_buffer.len() + data.len() > MAX_MESSAGE_SIZE {
            warn!(
                buffered = self.read_buffer.len(),
                incoming = data.len(),
                "reassembly buffer overflow, discarding"
            );
            self.read_buffer.clear();
            return None;
        }

        self.read_buffer.extend_from_slice(data);
        self.last_rx_at_ms = now_ms;

        if self.read_buffer.len() < 2 {
            return None;
        }

        let expected = u16::from_be_bytes([self.read_buffer[0], self.read_buffer[1]]) as usize;
        if expected + 2 > MAX_MESSAGE_SIZE {
            warn!(claimed = expected, "length prefix exceeds maximum, discarding");
            self.read_buffer.clear();
            return None;
        }

        if self.read_buffer.len() < expected + 2 {
            trace!(
                have = self.read_buffer.len(),
                want = expected + 2,
                "waiting for more chunks"
            );
            return None;
        }

        let message = self.read_buffer[2..expected + 2].to_vec();
        self.read_buffer.clear();
        Some(message)
    }

    /// Drop everything in flight. Used on disconnect and cancellation.
    pub fn clear(&mut self) {
        self.write_queue.clear();
        self.read_buffer.clear();
    }
}
