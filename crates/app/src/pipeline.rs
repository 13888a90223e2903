use std::path::Path;
use std::time::Instant;

use crossbeam::channel::{self, Receiver};

use trx_decode::sync::{FLEETSYNC2_MESSAGE_LENGTH, FLEETSYNC2_SYNC};
use trx_decode::{BitSlicer, FmDiscriminator, Message, MessageFramer};
use trx_dsp::{LowPhaseNoiseOscillator, Oscillator, PhasorOscillator};
use trx_io::{FileSink, FileSource, SampleFormat};
use trx_sample::{BufferPool, ComplexBuffer, SampleBuffer};

/// Complex samples per processing block.
const BLOCK_SIZE: usize = 8192;

/// Buffers in each pool; enough to keep the writer fed without growth.
const POOL_DEPTH: usize = 4;

/// Commands a control thread may submit to a running mix pipeline. They
/// are drained between sample blocks, so the oscillator is only ever
/// touched from the processing thread.
pub enum TunerCommand {
    SetShift(f64),
}

fn parse_format(name: &str) -> Result<SampleFormat, String> {
    SampleFormat::parse(name)
        .ok_or_else(|| format!("unknown sample format: {} (use ci8, ci16, or cf32)", name))
}

fn build_oscillator(
    kind: &str,
    frequency: f64,
    sample_rate: f64,
) -> Result<Box<dyn Oscillator>, String> {
    match kind {
        "lpn" => Ok(Box::new(
            LowPhaseNoiseOscillator::new(frequency, sample_rate).map_err(|e| e.to_string())?,
        )),
        "phasor" => Ok(Box::new(
            PhasorOscillator::new(frequency, sample_rate).map_err(|e| e.to_string())?,
        )),
        other => Err(format!(
            "unknown oscillator algorithm: {} (use lpn or phasor)",
            other
        )),
    }
}

/// Generate `seconds` of tone into `output`.
pub fn run_tone(
    output: &Path,
    frequency: f64,
    sample_rate: f64,
    seconds: f64,
    format: &str,
    real: bool,
    oscillator_kind: &str,
) -> Result<(), String> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("invalid duration: {} s", seconds));
    }
    let format = parse_format(format)?;
    let mut oscillator = build_oscillator(oscillator_kind, frequency, sample_rate)?;
    let mut sink = FileSink::create(output, format)
        .map_err(|e| format!("failed to create {}: {}", output.display(), e))?;

    let total_samples = (seconds * sample_rate) as u64;
    log::info!(
        "generating {} samples at {} Hz ({} Hz sample rate, {}, {})",
        total_samples,
        frequency,
        sample_rate,
        if real { "real" } else { "complex" },
        oscillator_kind,
    );

    let started = Instant::now();
    let mut remaining = total_samples;

    if real {
        let pool: BufferPool<SampleBuffer> = BufferPool::new(POOL_DEPTH, BLOCK_SIZE);
        while remaining > 0 {
            let count = remaining.min(BLOCK_SIZE as u64) as usize;
            let mut buffer = pool.take();
            oscillator.fill_real(&mut buffer);
            sink.write(&buffer.samples()[..count])
                .map_err(|e| format!("write error: {}", e))?;
            remaining -= count as u64;
        }
    } else {
        let pool: BufferPool<ComplexBuffer> = BufferPool::new(POOL_DEPTH, BLOCK_SIZE);
        while remaining > 0 {
            let count = remaining.min(BLOCK_SIZE as u64) as usize;
            let mut buffer = pool.take();
            oscillator.fill_complex(&mut buffer);
            sink.write(&buffer.samples()[..count * 2])
                .map_err(|e| format!("write error: {}", e))?;
            remaining -= count as u64;
        }
    }

    sink.flush().map_err(|e| format!("flush error: {}", e))?;
    log::info!(
        "wrote {} samples to {} in {:.2}s",
        total_samples,
        output.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Frequency-translate `input` by `shift` hertz into `output`, draining
/// retune commands between blocks.
pub fn run_mix(
    input: &Path,
    output: &Path,
    shift: f64,
    sample_rate: f64,
    format: &str,
    commands: Receiver<TunerCommand>,
) -> Result<(), String> {
    let format = parse_format(format)?;
    let mut oscillator =
        LowPhaseNoiseOscillator::new(shift, sample_rate).map_err(|e| e.to_string())?;
    let mut sink = FileSink::create(output, format)
        .map_err(|e| format!("failed to create {}: {}", output.display(), e))?;

    let mut source = FileSource::new(input.to_string_lossy().to_string(), format);
    source.set_block_size(BLOCK_SIZE);
    let (tx, rx) = channel::bounded(8);
    let reader = std::thread::spawn(move || {
        if let Err(e) = source.start(tx) {
            log::error!("file reader error: {}", e);
        }
    });

    log::info!("mixing by {} Hz at {} Hz sample rate", shift, sample_rate);
    let started = Instant::now();
    let mut total: u64 = 0;

    for block in rx.iter() {
        for command in commands.try_iter() {
            match command {
                TunerCommand::SetShift(hz) => match oscillator.set_frequency(hz) {
                    Ok(()) => log::info!("retuned shift to {} Hz", hz),
                    Err(e) => log::warn!("retune rejected: {}", e),
                },
            }
        }

        let mixed = oscillator.mix_complex(&block.data).map_err(|e| e.to_string())?;
        sink.write(&mixed).map_err(|e| format!("write error: {}", e))?;
        total += block.num_samples as u64;
    }

    sink.flush().map_err(|e| format!("flush error: {}", e))?;
    let _ = reader.join();
    log::info!(
        "mixed {} samples in {:.2}s",
        total,
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Down-convert `input` by `offset` hertz, FM-discriminate, slice bits,
/// and run the Fleetsync II framer over the result.
pub fn run_decode(
    input: &Path,
    offset: f64,
    sample_rate: f64,
    format: &str,
    sps: usize,
) -> Result<(), String> {
    if sps == 0 {
        return Err("samples per symbol must be non-zero".to_string());
    }
    let format = parse_format(format)?;
    let mut oscillator =
        LowPhaseNoiseOscillator::new(-offset, sample_rate).map_err(|e| e.to_string())?;
    let mut discriminator = FmDiscriminator::new();
    let mut slicer = BitSlicer::new(sps);

    let message_count = std::cell::Cell::new(0u64);
    let mut framer = MessageFramer::new(
        FLEETSYNC2_SYNC,
        FLEETSYNC2_MESSAGE_LENGTH,
        |message: Message| {
            message_count.set(message_count.get() + 1);
            let bytes = message.to_bytes();
            let preview = &bytes[..bytes.len().min(8)];
            log::info!(
                "framed {} bit message at {}: {:02x?}...",
                message.len(),
                message.timestamp(),
                preview
            );
        },
    );

    let mut source = FileSource::new(input.to_string_lossy().to_string(), format);
    source.set_block_size(BLOCK_SIZE);
    let (tx, rx) = channel::bounded(8);
    let reader = std::thread::spawn(move || {
        if let Err(e) = source.start(tx) {
            log::error!("file reader error: {}", e);
        }
    });

    log::info!(
        "decoding {} (offset {} Hz, {} samples/symbol)",
        input.display(),
        offset,
        sps
    );
    let started = Instant::now();
    let mut total_samples: u64 = 0;
    let mut total_bits: u64 = 0;

    for block in rx.iter() {
        let baseband = if oscillator.is_enabled() {
            oscillator.mix_complex(&block.data).map_err(|e| e.to_string())?
        } else {
            block.data
        };

        for value in discriminator.process_interleaved(&baseband) {
            if let Some(bit) = slicer.process(value) {
                total_bits += 1;
                framer.process(bit);
            }
        }
        total_samples += block.num_samples as u64;
    }

    let _ = reader.join();
    log::info!(
        "done in {:.2}s: {} samples, {} bits, {} messages",
        started.elapsed().as_secs_f64(),
        total_samples,
        total_bits,
        message_count.get()
    );
    Ok(())
}
