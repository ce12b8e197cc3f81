//! Scripted in-memory transport for tests and bench runs without a camera

use std::collections::VecDeque;
use std::io;

use super::port_trait::Transport;

/// Produces the camera's reply bytes for a frame that was just written
pub type Responder = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>> + Send>;

/// Mock transport: records written frames and serves queued receive bytes
#[derive(Default)]
pub struct MockTransport {
    /// Every frame passed to `write`, in order
    pub written: Vec<Vec<u8>>,
    rx: VecDeque<u8>,
    read_chunk: Option<usize>,
    write_error: Option<io::ErrorKind>,
    responder: Option<Responder>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("written", &self.written)
            .field("rx", &self.rx)
            .finish_non_exhaustive()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make bytes available to the next `read` calls
    pub fn push_rx(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    /// Limit how many bytes a single `read` hands out
    pub fn set_read_chunk(&mut self, chunk: usize) {
        self.read_chunk = Some(chunk.max(1));
    }

    /// Fail every subsequent `write` with `kind`
    pub fn set_write_error(&mut self, kind: io::ErrorKind) {
        self.write_error = Some(kind);
    }

    /// Answer written frames automatically
    pub fn set_responder<F>(&mut self, responder: F)
    where
        F: FnMut(&[u8]) -> Option<Vec<u8>> + Send + 'static,
    {
        self.responder = Some(Box::new(responder));
    }

    /// Stop answering written frames
    pub fn clear_responder(&mut self) {
        self.responder = None;
    }

    /// Frames written since the last call
    pub fn take_written(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.written)
    }

    pub fn pending_rx(&self) -> usize {
        self.rx.len()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if let Some(kind) = self.write_error {
            return Err(io::Error::new(kind, "Mock write error"));
        }
        self.written.push(data.to_vec());

        if let Some(responder) = self.responder.as_mut() {
            if let Some(reply) = responder(data) {
                self.rx.extend(reply);
            }
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = self.read_chunk.unwrap_or(buf.len()).min(buf.len());
        let count = limit.min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }
}
