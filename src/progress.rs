//! Terminal progress reporting for the builder.
//!
//! Progress is a lossy side channel; nothing here carries a correctness
//! requirement. Bars render only when stderr is a terminal, so batch builds
//! log cleanly.

use std::io::Read;

use indicatif::{ProgressBar, ProgressStyle};

/// Bar tracking compressed bytes read from a dump file.
pub fn byte_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template("{bar:30} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
            .unwrap()
            .progress_chars("=> "),
    );
    bar
}

/// Reader proxy that advances a bar by the number of bytes read through it.
pub struct Reader<R> {
    inner: R,
    bar: ProgressBar,
}

impl<R: Read> Reader<R> {
    pub fn new(inner: R, bar: ProgressBar) -> Self {
        Self { inner, bar }
    }
}

impl<R: Read> Read for Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bar.inc(n as u64);
        Ok(n)
    }
}
