mod pipeline;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "trunked-rx")]
#[command(about = "Quadrature oscillator tone generator, heterodyne mixer, and message framer")]
struct Cli {
    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a tone into a sample file
    Tone {
        /// Output file
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Tone frequency in Hz (negative rotates clockwise)
        #[arg(short = 'f', long, default_value = "1000", allow_hyphen_values = true)]
        frequency: f64,

        /// Sample rate in Hz
        #[arg(short = 'r', long, default_value = "48000")]
        sample_rate: f64,

        /// Duration in seconds
        #[arg(short = 'd', long, default_value = "1.0")]
        seconds: f64,

        /// Sample format: ci8, ci16, cf32
        #[arg(long, default_value = "cf32")]
        format: String,

        /// Write real samples instead of interleaved I/Q
        #[arg(long)]
        real: bool,

        /// Oscillator algorithm: lpn (gain-corrected recursive) or phasor
        #[arg(long, default_value = "lpn")]
        oscillator: String,
    },

    /// Frequency-translate an IQ file
    Mix {
        /// Input IQ file
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Output IQ file
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Frequency shift in Hz (positive shifts the spectrum up)
        #[arg(short = 's', long, allow_hyphen_values = true)]
        shift: f64,

        /// Sample rate in Hz
        #[arg(short = 'r', long, default_value = "48000")]
        sample_rate: f64,

        /// Sample format: ci8, ci16, cf32
        #[arg(long, default_value = "cf32")]
        format: String,
    },

    /// Down-convert an IQ file, FM-discriminate, and frame messages
    Decode {
        /// Input IQ file
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Channel offset from center in Hz, mixed out before demodulation
        #[arg(short = 'O', long, default_value = "0", allow_hyphen_values = true)]
        offset: f64,

        /// Sample rate in Hz
        #[arg(short = 'r', long, default_value = "48000")]
        sample_rate: f64,

        /// Sample format: ci8, ci16, cf32
        #[arg(long, default_value = "cf32")]
        format: String,

        /// Samples per symbol for the bit slicer (48 kHz / 1200 baud = 40)
        #[arg(long, default_value = "40")]
        sps: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let result = match cli.command {
        Command::Tone {
            output,
            frequency,
            sample_rate,
            seconds,
            format,
            real,
            oscillator,
        } => pipeline::run_tone(
            &output,
            frequency,
            sample_rate,
            seconds,
            &format,
            real,
            &oscillator,
        ),
        Command::Mix {
            input,
            output,
            shift,
            sample_rate,
            format,
        } => {
            // Retune commands are marshaled onto the processing thread
            // through this channel; the CLI has no control surface yet,
            // so the sender is simply held open for the run.
            let (_tx, rx) = crossbeam::channel::unbounded();
            pipeline::run_mix(&input, &output, shift, sample_rate, &format, rx)
        }
        Command::Decode {
            input,
            offset,
            sample_rate,
            format,
            sps,
        } => pipeline::run_decode(&input, offset, sample_rate, &format, sps),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
