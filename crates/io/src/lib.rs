//! IQ sample file input and output.
//!
//! Samples on disk are interleaved I/Q pairs in one of three little-endian
//! formats; in memory every stage works in f32 with full scale at 1.0.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use crossbeam::channel::Sender;

/// IQ sample format on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Complex int8: pairs of i8
    Ci8,
    /// Complex int16: pairs of i16, little-endian
    Ci16,
    /// Complex float32: pairs of f32, little-endian
    Cf32,
}

impl SampleFormat {
    /// Bytes per complex sample (one I/Q pair).
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::Ci8 => 2,
            SampleFormat::Ci16 => 4,
            SampleFormat::Cf32 => 8,
        }
    }

    /// Parse a format name as given on the command line.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ci8" => Some(SampleFormat::Ci8),
            "ci16" => Some(SampleFormat::Ci16),
            "cf32" => Some(SampleFormat::Cf32),
            _ => None,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleFormat::Ci8 => "ci8",
            SampleFormat::Ci16 => "ci16",
            SampleFormat::Cf32 => "cf32",
        };
        f.write_str(name)
    }
}

/// A block of interleaved f32 IQ samples.
pub struct SampleBlock {
    /// Interleaved I,Q,I,Q,... in [-1, 1]
    pub data: Vec<f32>,
    /// Number of complex samples (data.len() / 2)
    pub num_samples: usize,
}

fn i8_to_f32(value: i8) -> f32 {
    value as f32 / 128.0
}

fn i16_to_f32(value: i16) -> f32 {
    value as f32 / 32768.0
}

fn f32_to_i8(value: f32) -> i8 {
    (value * 127.0).clamp(-128.0, 127.0) as i8
}

fn f32_to_i16(value: f32) -> i16 {
    (value * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// IQ file reader: reads blocks of samples and sends them as
/// [`SampleBlock`]s until EOF or until the receiver drops.
pub struct FileSource {
    path: String,
    format: SampleFormat,
    /// Number of complex samples per block
    block_size: usize,
}

impl FileSource {
    pub fn new(path: impl Into<String>, format: SampleFormat) -> Self {
        Self {
            path: path.into(),
            format,
            block_size: 65536,
        }
    }

    pub fn set_block_size(&mut self, size: usize) {
        self.block_size = size;
    }

    /// Read one block, converting to f32. Returns None at EOF.
    fn read_block(
        reader: &mut BufReader<File>,
        format: SampleFormat,
        num_samples: usize,
    ) -> io::Result<Option<Vec<f32>>> {
        let bytes_needed = num_samples * format.bytes_per_sample();
        let mut buf = vec![0u8; bytes_needed];
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }

        let out = match format {
            SampleFormat::Ci8 => buf[..n].iter().map(|&b| i8_to_f32(b as i8)).collect(),
            SampleFormat::Ci16 => {
                let values = n / 2;
                let mut out = Vec::with_capacity(values);
                for k in 0..values {
                    let base = k * 2;
                    out.push(i16_to_f32(i16::from_le_bytes([buf[base], buf[base + 1]])));
                }
                out
            }
            SampleFormat::Cf32 => {
                let values = n / 4;
                let mut out = Vec::with_capacity(values);
                for k in 0..values {
                    let base = k * 4;
                    out.push(f32::from_le_bytes([
                        buf[base],
                        buf[base + 1],
                        buf[base + 2],
                        buf[base + 3],
                    ]));
                }
                out
            }
        };
        Ok(Some(out))
    }

    /// Stream the file into the channel. Runs until EOF, a read error,
    /// or the receiver dropping.
    pub fn start(&self, tx: Sender<SampleBlock>) -> Result<(), String> {
        let file = File::open(Path::new(&self.path))
            .map_err(|e| format!("failed to open {}: {}", self.path, e))?;
        let mut reader = BufReader::with_capacity(1024 * 1024, file);

        log::info!("reading IQ from {} ({})", self.path, self.format);

        loop {
            match Self::read_block(&mut reader, self.format, self.block_size) {
                Ok(Some(mut data)) => {
                    // Drop a trailing half pair from a truncated file.
                    if data.len() % 2 != 0 {
                        data.pop();
                    }
                    let num_samples = data.len() / 2;
                    if num_samples == 0 || tx.send(SampleBlock { data, num_samples }).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    log::info!("end of file: {}", self.path);
                    break;
                }
                Err(e) => {
                    return Err(format!("read error on {}: {}", self.path, e));
                }
            }
        }

        Ok(())
    }
}

/// IQ file writer: converts interleaved f32 samples to the target format.
pub struct FileSink<W: Write> {
    writer: W,
    format: SampleFormat,
}

impl FileSink<BufWriter<File>> {
    /// Create a sink writing to a new file at `path`.
    pub fn create(path: impl AsRef<Path>, format: SampleFormat) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), format))
    }
}

impl<W: Write> FileSink<W> {
    pub fn new(writer: W, format: SampleFormat) -> Self {
        Self { writer, format }
    }

    /// Write a slice of interleaved f32 samples.
    pub fn write(&mut self, samples: &[f32]) -> io::Result<()> {
        match self.format {
            SampleFormat::Ci8 => {
                for &value in samples {
                    self.writer.write_i8(f32_to_i8(value))?;
                }
            }
            SampleFormat::Ci16 => {
                for &value in samples {
                    self.writer.write_i16::<LittleEndian>(f32_to_i16(value))?;
                }
            }
            SampleFormat::Cf32 => {
                for &value in samples {
                    self.writer.write_f32::<LittleEndian>(value)?;
                }
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel;

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(f32_to_i16(1.0), 32767);
        assert_eq!(f32_to_i16(-1.0), -32767);
        assert_eq!(f32_to_i16(2.0), 32767, "overdrive clamps");
        assert_eq!(f32_to_i8(0.0), 0);
        assert!((i16_to_f32(16384) - 0.5).abs() < 1e-3);
        assert!((i8_to_f32(-64) + 0.5).abs() < 1e-2);
    }

    #[test]
    fn test_format_parse_and_size() {
        assert_eq!(SampleFormat::parse("ci16"), Some(SampleFormat::Ci16));
        assert_eq!(SampleFormat::parse("wav"), None);
        assert_eq!(SampleFormat::Cf32.bytes_per_sample(), 8);
        assert_eq!(SampleFormat::Ci8.bytes_per_sample(), 2);
    }

    #[test]
    fn test_sink_ci16_little_endian() {
        let mut raw = Vec::new();
        {
            let mut sink = FileSink::new(&mut raw, SampleFormat::Ci16);
            sink.write(&[0.5, -0.5]).unwrap();
        }
        let i_val = i16::from_le_bytes([raw[0], raw[1]]);
        let q_val = i16::from_le_bytes([raw[2], raw[3]]);
        assert_eq!(i_val, 16383);
        assert_eq!(q_val, -16383);
    }

    #[test]
    fn test_file_round_trip_cf32() {
        let path = std::env::temp_dir().join(format!("trx_io_test_{}.cf32", std::process::id()));
        let samples: Vec<f32> = (0..256).map(|n| (n as f32 / 128.0) - 1.0).collect();

        {
            let mut sink = FileSink::create(&path, SampleFormat::Cf32).unwrap();
            sink.write(&samples).unwrap();
            sink.flush().unwrap();
        }

        let source = FileSource::new(path.to_string_lossy().to_string(), SampleFormat::Cf32);
        let (tx, rx) = channel::unbounded();
        source.start(tx).unwrap();

        let mut read_back = Vec::new();
        for block in rx.iter() {
            assert_eq!(block.data.len(), block.num_samples * 2);
            read_back.extend(block.data);
        }
        assert_eq!(read_back, samples);

        let _ = std::fs::remove_file(&path);
    }
}
