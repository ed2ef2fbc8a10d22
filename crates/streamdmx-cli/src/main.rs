use std::net::{Ipv4Addr, SocketAddr};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use streamdmx_core::{
    DMX_CHANNELS, EngineError, ReceiverConfig, SacnInput, SacnOutput, SenderConfig, SharedLogger,
    TracingLogger, UniverseStatus,
};
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("STREAMDMX_BUILD_COMMIT"),
    " ",
    env!("STREAMDMX_BUILD_DATE"),
    ")"
);

const UNIVERSE_HINT: &str = "universes are numbered 1..=63999";

#[derive(Parser, Debug)]
#[command(name = "streamdmx")]
#[command(version = VERSION)]
#[command(
    about = "Send and receive DMX512 over sACN (E1.31).",
    long_about = None,
    after_help = "Examples:\n  streamdmx send -u 1 --set 0=255 --set 1=128\n  streamdmx send -u 1 -u 2 --ramp --duration 10\n  streamdmx receive -u 1 --interval-ms 500 --pretty"
)]
struct Cli {
    /// Suppress informational output on stderr
    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stream one or more universes until the duration elapses.
    Send(SendArgs),
    /// Join one or more universes and print their status as JSON lines.
    Receive(ReceiveArgs),
}

#[derive(Args, Debug)]
struct SendArgs {
    /// Universe to send (repeatable)
    #[arg(short = 'u', long = "universe", required = true)]
    universes: Vec<u16>,

    /// Source name advertised to receivers
    #[arg(long, default_value = streamdmx_core::DEFAULT_SOURCE_NAME)]
    source_name: String,

    /// Packet priority (0-200)
    #[arg(long, default_value_t = 100)]
    priority: u8,

    /// Keep-alive rate in Hz for unchanged universes
    #[arg(long, default_value_t = streamdmx_core::DEFAULT_UNCHANGED_REFRESH_RATE)]
    refresh_rate: u16,

    /// Channel value as CH=VAL, channels 0-indexed (repeatable)
    #[arg(long = "set", value_name = "CH=VAL")]
    sets: Vec<String>,

    /// Fill every channel with a 0..255 ramp before applying --set
    #[arg(long)]
    ramp: bool,

    /// Also send every packet to this address (repeatable)
    #[arg(long = "unicast", value_name = "ADDR:PORT")]
    unicast: Vec<SocketAddr>,

    /// Only send to --unicast targets
    #[arg(long, requires = "unicast")]
    no_multicast: bool,

    /// Local interface address to send from
    #[arg(long)]
    interface: Option<Ipv4Addr>,

    /// Stop after this many seconds (runs until interrupted otherwise)
    #[arg(long)]
    duration: Option<f64>,
}

#[derive(Args, Debug)]
struct ReceiveArgs {
    /// Universe to receive (repeatable)
    #[arg(short = 'u', long = "universe", required = true)]
    universes: Vec<u16>,

    /// Local interface address used to join multicast groups
    #[arg(long)]
    interface: Option<Ipv4Addr>,

    /// Stop after this many seconds (runs until interrupted otherwise)
    #[arg(long)]
    duration: Option<f64>,

    /// Status print interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);
    let logger: SharedLogger = Arc::new(TracingLogger);

    let result = match cli.command {
        Commands::Send(args) => cmd_send(args, logger),
        Commands::Receive(args) => cmd_receive(args, logger),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_tracing(quiet: bool, verbose: bool) {
    let default = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        let hint = match &err {
            EngineError::Transport(_) => {
                Some("check --interface and that the sACN port is free".to_string())
            }
            EngineError::Packet(_) => Some("check universe, source name and priority".to_string()),
            EngineError::InvalidRefreshRate { .. } => {
                Some("use a --refresh-rate of at least 1".to_string())
            }
            _ => None,
        };
        CliError::new(err.to_string(), hint)
    }
}

fn cmd_send(args: SendArgs, logger: SharedLogger) -> Result<(), CliError> {
    validate_universes(&args.universes)?;
    let deadline = parse_duration(args.duration)?;
    let values = build_levels(args.ramp, &args.sets)?;

    let config = SenderConfig {
        source_name: args.source_name,
        priority: args.priority,
        unchanged_refresh_rate: args.refresh_rate,
        multicast: !args.no_multicast,
        unicast_targets: args.unicast,
        ..SenderConfig::default()
    };
    let mut output = SacnOutput::new(config, Arc::clone(&logger))?;
    for &universe in &args.universes {
        let handle = output.add_universe(universe)?;
        handle
            .dmx()
            .write_from(&values)
            .context("failed to load channel values")?;
    }
    output.start(args.interface)?;
    tracing::info!(universes = ?args.universes, "sending");

    run_until(deadline, Duration::from_millis(100), || {});
    output.stop();
    Ok(())
}

fn cmd_receive(args: ReceiveArgs, logger: SharedLogger) -> Result<(), CliError> {
    validate_universes(&args.universes)?;
    let deadline = parse_duration(args.duration)?;
    if args.interval_ms == 0 {
        return Err(CliError::new(
            "--interval-ms must be at least 1",
            Some("use the default of 1000 ms".to_string()),
        ));
    }

    let mut input = SacnInput::new(ReceiverConfig::default(), Arc::clone(&logger))?;
    let mut handles = Vec::with_capacity(args.universes.len());
    for &universe in &args.universes {
        handles.push(input.add_universe(universe)?);
    }
    input.start(args.interface)?;
    tracing::info!(universes = ?args.universes, "receiving");

    let mut print_error = None;
    run_until(deadline, Duration::from_millis(args.interval_ms), || {
        if print_error.is_some() {
            return;
        }
        for handle in &handles {
            if let Err(err) = print_status(&handle.status(), args.pretty) {
                print_error = Some(err);
                return;
            }
        }
    });
    input.stop();
    match print_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn run_until(deadline: Option<Duration>, interval: Duration, mut every: impl FnMut()) {
    let start = Instant::now();
    loop {
        let elapsed = start.elapsed();
        if deadline.is_some_and(|limit| elapsed >= limit) {
            break;
        }
        let nap = deadline.map_or(interval, |limit| interval.min(limit - elapsed));
        thread::sleep(nap);
        every();
    }
}

fn print_status(status: &UniverseStatus, pretty: bool) -> Result<(), CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(status)
    } else {
        serde_json::to_string(status)
    }
    .context("JSON serialization failed")?;
    println!("{json}");
    Ok(())
}

fn validate_universes(universes: &[u16]) -> Result<(), CliError> {
    for &universe in universes {
        if !(1..=63999).contains(&universe) {
            return Err(CliError::new(
                format!("invalid universe {universe}"),
                Some(UNIVERSE_HINT.to_string()),
            ));
        }
    }
    let mut sorted = universes.to_vec();
    sorted.sort_unstable();
    if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(CliError::new(
            format!("universe {} given more than once", pair[0]),
            Some("pass each --universe once".to_string()),
        ));
    }
    Ok(())
}

fn parse_duration(seconds: Option<f64>) -> Result<Option<Duration>, CliError> {
    seconds
        .map(|secs| {
            Duration::try_from_secs_f64(secs).map_err(|_| {
                CliError::new(
                    format!("invalid duration {secs}"),
                    Some("use a non-negative number of seconds".to_string()),
                )
            })
        })
        .transpose()
}

fn build_levels(ramp: bool, sets: &[String]) -> Result<Vec<u8>, CliError> {
    let mut values = vec![0u8; DMX_CHANNELS];
    if ramp {
        for (channel, value) in values.iter_mut().enumerate() {
            *value = (channel % 256) as u8;
        }
    }
    for entry in sets {
        let (channel, value) = parse_channel_value(entry)?;
        values[channel] = value;
    }
    Ok(values)
}

fn parse_channel_value(entry: &str) -> Result<(usize, u8), CliError> {
    let invalid = || {
        CliError::new(
            format!("invalid --set '{entry}'"),
            Some(format!(
                "use CH=VAL with CH in 0..={} and VAL in 0..=255",
                DMX_CHANNELS - 1
            )),
        )
    };
    let (channel, value) = entry.split_once('=').ok_or_else(invalid)?;
    let channel: usize = channel.trim().parse().map_err(|_| invalid())?;
    let value: u8 = value.trim().parse().map_err(|_| invalid())?;
    if channel >= DMX_CHANNELS {
        return Err(invalid());
    }
    Ok((channel, value))
}
