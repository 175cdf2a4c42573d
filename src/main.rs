use anyhow::{bail, Context, Result};
use clap::Parser;

mod classify;
mod config;
mod frame;
mod media;
mod output;
mod playback;
mod player;
mod protocol;
mod sampler;
mod tracker;
mod transport;

use config::Config;
use media::RawMediaClock;
use output::StripOutput;
use player::Player;

#[derive(Parser)]
#[command(name = "midiline")]
#[command(about = "midiline player\n\nSamples key states from a pre-rendered video and streams changes to a key strip over serial.", long_about = None)]
struct Cli {
    /// Raw RGB24 media file (ffmpeg -f rawvideo -pix_fmt rgb24)
    media: Option<String>,

    /// Serial device path
    port: Option<String>,

    /// Number of white keys in the video
    white_keys: Option<usize>,

    /// Leading keys excluded from sampling and transmission
    offset: Option<usize>,

    /// Frame size as WIDTHxHEIGHT, required with positional arguments
    #[arg(long)]
    size: Option<String>,

    /// Media frame rate
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Path to configuration file (JSON) replacing the positional arguments
    #[arg(long, conflicts_with_all = ["media", "port", "white_keys", "offset", "size"])]
    config: Option<String>,

    /// Enable progress and statistics output
    #[arg(long)]
    debug: bool,

    /// Enable detailed debug (hex dump of every serial write)
    #[arg(long)]
    ddebug: bool,
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    if let Some(path) = &cli.config {
        return Config::load(path);
    }

    let (Some(media), Some(port), Some(white_keys)) = (&cli.media, &cli.port, cli.white_keys)
    else {
        bail!("expected <media> <port> <white_keys> [offset], or --config <file>");
    };
    let size = cli
        .size
        .as_deref()
        .context("--size WIDTHxHEIGHT is required with positional arguments")?;
    let (width, height) = config::parse_size(size)?;

    Ok(Config {
        media: media.clone(),
        port: port.clone(),
        white_keys,
        offset: cli.offset.unwrap_or(0),
        width,
        height,
        fps: cli.fps,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = resolve_config(&cli)?;
    config.validate()?;

    // ddebug implies debug
    let debug = cli.debug || cli.ddebug;

    // Media failure is fatal here, before the decode loop starts; a missing
    // serial device only disables transmission.
    let clock = RawMediaClock::open(&config.media, config.width, config.height, config.fps)?;
    let output = StripOutput::open(&config.port, debug, cli.ddebug);

    if debug {
        println!(
            "✓ Playing {} ({}x{} @ {} fps, {} keys, offset {})",
            config.media, config.width, config.height, config.fps, config.white_keys, config.offset
        );
        if !output.is_enabled() {
            println!("Running decode-only (no serial output)");
        }
        println!("(p pause/play, left/right seek, s/f speed, q quit, Ctrl-C stop)");
    }

    let mut player = Player::new(clock, output, config.white_keys, config.offset, debug);

    // Set up Ctrl-C handler with graceful shutdown
    let running = player.running_flag();
    let debug_for_handler = debug;
    let result = ctrlc::set_handler(move || {
        if debug_for_handler {
            println!("\nShutting down...");
        }
        running.store(false, std::sync::atomic::Ordering::Relaxed);
    });

    if let Err(e) = result {
        eprintln!("Warning: Could not set Ctrl-C handler: {}", e);
    }

    let commands = transport::spawn_stdin_reader();

    // Run decode loop (blocks until shutdown)
    player.run(&commands);

    // Graceful shutdown - reset frame out, link released
    player.shutdown();

    Ok(())
}
