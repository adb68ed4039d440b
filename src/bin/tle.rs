//! `tle`: encrypt data toward a future drand round.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Write};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tlock::{armor, HttpNetwork, Network};

const DEFAULT_HOST: &str = "https://api.drand.sh";
// quicknet: unchained, 3 second period.
const DEFAULT_CHAIN: &str = "52db9ba70e0cc0f6eaf7803dd07447a1f5477735fd3f661792ba94600c84e971";
const DEFAULT_DURATION: &str = "120d";

#[derive(Parser)]
#[command(name = "tle", about = "Timelock encryption using a drand beacon")]
struct Cli {
    /// Encrypt the input to the output (default if omitted).
    #[arg(short = 'e', long, conflicts_with = "decrypt")]
    encrypt: bool,

    /// Decrypt the input to the output.
    #[arg(short = 'd', long)]
    decrypt: bool,

    /// The drand API endpoint to use.
    #[arg(short = 'n', long, default_value = DEFAULT_HOST)]
    network: String,

    /// The chain hash (64 lowercase hex characters).
    #[arg(short = 'c', long, default_value = DEFAULT_CHAIN)]
    chain: String,

    /// Encrypt toward this specific round. Cannot be used with --duration.
    #[arg(short = 'r', long, conflicts_with = "duration")]
    round: Option<u64>,

    /// How long to wait before the message can be decrypted,
    /// e.g. 30s, 15m, 12h, 30d, 2M, 1y.
    #[arg(short = 'D', long)]
    duration: Option<String>,

    /// Write the result to this file instead of stdout.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Wrap the output in a PEM encoded format.
    #[arg(short = 'a', long)]
    armor: bool,

    /// Input file; stdin if omitted or "-".
    input: Option<PathBuf>,
}

fn main() {
    init_tracing();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("tle: {err:#}");
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr: stdout may be carrying the container or the
/// recovered plaintext. `RUST_LOG` overrides the quiet default.
fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new("warn")
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run(cli: Cli) -> Result<()> {
    let network = HttpNetwork::new(&cli.network, &cli.chain)
        .with_context(|| format!("reaching beacon at {}", cli.network))?;

    let mut src = open_input(cli.input.as_deref())?;
    let mut dst = open_output(cli.output.as_deref())?;

    match (cli.encrypt, cli.decrypt) {
        (true, true) => bail!("--encrypt and --decrypt are mutually exclusive"),
        (_, false) => run_encrypt(&cli, &mut dst, &mut src, &network)?,
        (_, true) => run_decrypt(&mut dst, &mut src, &network)?,
    }
    dst.flush()?;
    Ok(())
}

fn run_encrypt(
    cli: &Cli,
    dst: &mut impl Write,
    src: &mut impl Read,
    network: &impl Network,
) -> Result<()> {
    let round = match (cli.round, cli.duration.as_deref()) {
        (Some(round), None) => round,
        (None, duration) => {
            let duration = parse_duration(duration.unwrap_or(DEFAULT_DURATION))?;
            network.round_at(SystemTime::now() + duration)?
        }
        (Some(_), Some(_)) => bail!("--round cannot be used with --duration"),
    };

    if cli.armor {
        let mut binary = Vec::new();
        tlock::encrypt(&mut binary, src, network, round)?;
        armor::armor(&mut Cursor::new(binary), dst)?;
    } else {
        tlock::encrypt(dst, src, network, round)?;
    }
    Ok(())
}

fn run_decrypt(dst: &mut impl Write, src: &mut impl Read, network: &impl Network) -> Result<()> {
    // Buffer the input so an armored container can be detected and unwrapped.
    let mut raw = Vec::new();
    src.read_to_end(&mut raw)?;

    let binary = if raw.starts_with(armor::BEGIN_LINE.as_bytes()) {
        armor::unarmor(&mut BufReader::new(Cursor::new(raw)))?
    } else {
        raw
    };

    tlock::decrypt(dst, &mut Cursor::new(binary), network)?;
    Ok(())
}

fn open_input(path: Option<&std::path::Path>) -> Result<Box<dyn Read>> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            let file =
                File::open(path).with_context(|| format!("opening input {}", path.display()))?;
            Ok(Box::new(file))
        }
        _ => Ok(Box::new(io::stdin())),
    }
}

fn open_output(path: Option<&std::path::Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            let file =
                File::create(path).with_context(|| format!("creating output {}", path.display()))?;
            Ok(Box::new(file))
        }
        _ => Ok(Box::new(io::stdout())),
    }
}

/// Parse a duration with the extended units `d` (days), `M` (months,
/// 30 days) and `y` (years, 365 days) on top of `s`, `m`, `h`. Segments
/// concatenate, so `1h30m` works.
fn parse_duration(input: &str) -> Result<Duration> {
    let mut total = Duration::ZERO;
    let mut digits = String::new();
    let mut seen_segment = false;

    for ch in input.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let count: u64 = digits
            .parse()
            .map_err(|_| anyhow!("invalid duration {input:?}"))?;
        digits.clear();
        let unit_secs = match ch {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 24 * 60 * 60,
            'M' => 30 * 24 * 60 * 60,
            'y' => 365 * 24 * 60 * 60,
            other => bail!("unknown duration unit {other:?} in {input:?}"),
        };
        let secs = count
            .checked_mul(unit_secs)
            .ok_or_else(|| anyhow!("duration {input:?} is out of range"))?;
        total += Duration::from_secs(secs);
        seen_segment = true;
    }

    if !digits.is_empty() || !seen_segment {
        bail!("invalid duration {input:?}");
    }
    Ok(total)
}
