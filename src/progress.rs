//! Byte-based progress tracking.
//!
//! The insert pass wraps its file handle in a `ProgressReader` so a progress
//! bar can follow physical bytes consumed, which stays meaningful for
//! compressed dumps where line counts are unknown up front.

use std::io::Read;

/// A reader wrapper that reports cumulative bytes read to a callback.
pub struct ProgressReader<R: Read> {
    reader: R,
    callback: Box<dyn Fn(u64)>,
    bytes_read: u64,
}

impl<R: Read> ProgressReader<R> {
    /// Wrap a reader. The callback receives the running byte total after
    /// each non-empty read.
    pub fn new<F>(reader: R, callback: F) -> Self
    where
        F: Fn(u64) + 'static,
    {
        Self {
            reader,
            callback: Box::new(callback),
            bytes_read: 0,
        }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.reader.read(buf)?;
        if n > 0 {
            self.bytes_read += n as u64;
            (self.callback)(self.bytes_read);
        }
        Ok(n)
    }
}
