//! Entry codecs.
//!
//! Streaming compression for entry bodies, one variant per
//! [`CompressionMethod`]. Encoders wrap the container writer so a segment is
//! never held in memory; decoders wrap a reader bounded to the entry body.

use std::io::{self, Read, Write};
use walzip_core::CompressionMethod;

/// Version of the linked zstd library, e.g. `1.5.5`.
pub fn zstd_version() -> &'static str {
    zstd::zstd_safe::version_string()
}

/// Streaming encoder for one entry body.
pub enum EntryEncoder<W: Write> {
    /// Stored: bytes pass through
    Stored(W),
    /// Raw deflate
    Deflate(flate2::write::DeflateEncoder<W>),
    /// bzip2
    Bzip2(bzip2::write::BzEncoder<W>),
    /// xz
    Xz(xz2::write::XzEncoder<W>),
    /// Zstandard
    Zstd(zstd::stream::write::Encoder<'static, W>),
}

impl<W: Write> EntryEncoder<W> {
    /// Create an encoder writing into `inner`.
    ///
    /// `level` must already be valid for `method`; it is ignored for stored
    /// entries.
    pub fn new(method: CompressionMethod, level: u32, inner: W) -> io::Result<Self> {
        let encoder = match method {
            CompressionMethod::Uncompressed => EntryEncoder::Stored(inner),
            CompressionMethod::Zlib => EntryEncoder::Deflate(flate2::write::DeflateEncoder::new(
                inner,
                flate2::Compression::new(level),
            )),
            CompressionMethod::Bzip2 => EntryEncoder::Bzip2(bzip2::write::BzEncoder::new(
                inner,
                bzip2::Compression::new(level),
            )),
            CompressionMethod::Xz => EntryEncoder::Xz(xz2::write::XzEncoder::new(inner, level)),
            CompressionMethod::Zstd => {
                let level = i32::try_from(level).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "zstd level out of range")
                })?;
                EntryEncoder::Zstd(zstd::stream::write::Encoder::new(inner, level)?)
            }
        };
        Ok(encoder)
    }

    /// Flush the final block and return the inner writer.
    pub fn finish(self) -> io::Result<W> {
        match self {
            EntryEncoder::Stored(inner) => Ok(inner),
            EntryEncoder::Deflate(encoder) => encoder.finish(),
            EntryEncoder::Bzip2(encoder) => encoder.finish(),
            EntryEncoder::Xz(encoder) => encoder.finish(),
            EntryEncoder::Zstd(encoder) => encoder.finish(),
        }
    }
}

impl<W: Write> Write for EntryEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            EntryEncoder::Stored(inner) => inner.write(buf),
            EntryEncoder::Deflate(encoder) => encoder.write(buf),
            EntryEncoder::Bzip2(encoder) => encoder.write(buf),
            EntryEncoder::Xz(encoder) => encoder.write(buf),
            EntryEncoder::Zstd(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            EntryEncoder::Stored(inner) => inner.flush(),
            EntryEncoder::Deflate(encoder) => encoder.flush(),
            EntryEncoder::Bzip2(encoder) => encoder.flush(),
            EntryEncoder::Xz(encoder) => encoder.flush(),
            EntryEncoder::Zstd(encoder) => encoder.flush(),
        }
    }
}

/// Wrap a reader over a compressed entry body with the matching decoder.
pub fn entry_decoder<'a, R: Read + 'a>(
    method: CompressionMethod,
    inner: R,
) -> io::Result<Box<dyn Read + 'a>> {
    let decoder: Box<dyn Read + 'a> = match method {
        CompressionMethod::Uncompressed => Box::new(inner),
        CompressionMethod::Zlib => Box::new(flate2::read::DeflateDecoder::new(inner)),
        CompressionMethod::Bzip2 => Box::new(bzip2::read::BzDecoder::new(inner)),
        CompressionMethod::Xz => Box::new(xz2::read::XzDecoder::new(inner)),
        CompressionMethod::Zstd => Box::new(zstd::stream::read::Decoder::new(inner)?),
    };
    Ok(decoder)
}

/// Writer adapter counting the bytes that pass through it.
pub struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    /// Wrap `inner` with a zero count.
    pub fn new(inner: W) -> Self {
        CountingWriter { inner, count: 0 }
    }

    /// Bytes written so far.
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Writer adapter computing the CRC-32 and length of the bytes it forwards.
pub struct CrcWriter<W> {
    inner: W,
    hasher: crc32fast::Hasher,
    count: u64,
}

impl<W: Write> CrcWriter<W> {
    /// Wrap `inner`.
    pub fn new(inner: W) -> Self {
        CrcWriter {
            inner,
            hasher: crc32fast::Hasher::new(),
            count: 0,
        }
    }

    /// Return the inner writer with the CRC-32 and byte count of everything
    /// written.
    pub fn finish(self) -> (W, u32, u64) {
        (self.inner, self.hasher.finalize(), self.count)
    }
}

impl<W: Write> Write for CrcWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
