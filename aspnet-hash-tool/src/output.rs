use std::io::{self, BufWriter, Stdout, Write};
use std::sync::{Mutex, PoisonError};

/// Serializes output records from concurrent workers.
///
/// Each record is written in full, newline included, while the lock is held,
/// so lines from different workers may interleave but never mix.
#[derive(Debug)]
pub struct LineSink<W: Write> {
    out: Mutex<W>,
}

impl LineSink<BufWriter<Stdout>> {
    pub fn stdout() -> Self {
        Self::new(BufWriter::new(io::stdout()))
    }
}

impl<W: Write> LineSink<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn emit(&self, line: &[u8]) -> io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_all(line)?;
        out.write_all(b"\n")
    }

    pub fn flush(&self) -> io::Result<()> {
        self.out.lock().unwrap_or_else(PoisonError::into_inner).flush()
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}
