//! Adapters from `embedded-io` blocking traits
//!
//! Most HALs (embassy buffered UARTs, USB CDC classes) already implement
//! `embedded_io::Read`, `ReadReady` and `Write`. These wrappers turn them
//! into a [`ByteSource`] / [`ByteSink`] pair.

use embedded_io::{ErrorType, Read, ReadReady, Write};

use crate::serial::{ByteSink, ByteSource};

/// Error from an adapted reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoError<E> {
    /// Underlying I/O error
    Io(E),
    /// Reader reported ready but returned no data
    EndOfStream,
}

/// [`ByteSource`] over an `embedded_io` reader
pub struct IoSource<R> {
    inner: R,
}

impl<R> IoSource<R> {
    /// Wrap a reader
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Return the wrapped reader
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + ReadReady> ByteSource for IoSource<R> {
    type Error = IoError<<R as ErrorType>::Error>;

    fn bytes_available(&mut self) -> Result<usize, Self::Error> {
        // ReadReady only distinguishes "some" from "none"
        let ready = self.inner.read_ready().map_err(IoError::Io)?;
        Ok(usize::from(ready))
    }

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        let mut buf = [0u8; 1];
        match self.inner.read(&mut buf).map_err(IoError::Io)? {
            0 => Err(IoError::EndOfStream),
            _ => Ok(buf[0]),
        }
    }
}

/// [`ByteSink`] over an `embedded_io` writer
pub struct IoSink<W> {
    inner: W,
}

impl<W> IoSink<W> {
    /// Wrap a writer
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Return the wrapped writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ByteSink for IoSink<W> {
    type Error = <W as ErrorType>::Error;

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.inner.write_all(data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.inner.flush()
    }
}
