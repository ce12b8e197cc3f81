//! Trait abstraction for the camera link to enable testing

use std::io;

/// Non-blocking byte transport to the camera
///
/// Neither method may wait for the device. `read` returns however many bytes
/// are already buffered, which is zero most of the time.
pub trait Transport {
    /// Queue `data` for transmission
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Copy up to `buf.len()` already-received bytes into `buf`
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Throw away everything received so far
    fn discard_input(&mut self) -> io::Result<()> {
        let mut scratch = [0u8; 32];
        while self.read(&mut scratch)? > 0 {}
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        (**self).discard_input()
    }
}
