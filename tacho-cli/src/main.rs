//! Tachograph Reader CLI Application
//!
//! Command-line front end for the tacho-decoder library. It reads `.ddd`
//! downloads from files or stdin, decodes them and writes JSON:
//! - one input to a file or stdout
//! - a list of inputs, each written next to its source as `<file>.json`

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use rayon::prelude::*;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tacho_decoder::{CertificateStore, Decoded, Decoder, Generation};

mod config;

/// Tachograph Reader - Decode EU tachograph downloads (DDD) to JSON
#[derive(Parser, Debug)]
#[command(name = "tacho-cli")]
#[command(about = "Decode EU tachograph card and VU downloads to JSON", long_about = None)]
#[command(version)]
#[command(group(ArgGroup::new("kind").required(true).args(["card", "vu"])))]
struct Args {
    /// Input is a card download
    #[arg(long)]
    card: bool,

    /// Input is a vehicle unit download
    #[arg(long)]
    vu: bool,

    /// Input file (default: stdin)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output file (default: stdout, `-` for stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// File listing inputs, one per line; each is written to `<file>.json`
    #[arg(long, value_name = "FILE", conflicts_with_all = ["input", "output"])]
    input_list: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(short, long)]
    format: bool,

    /// Check signatures against the certificate store
    #[arg(long)]
    verify: bool,

    /// Certificate dataset (JSON) to use instead of the bundled one
    #[arg(long, value_name = "FILE")]
    certificates: Option<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Card,
    Vu,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::debug!("Tachograph Reader CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using decoder library v{}", tacho_decoder::VERSION);

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::AppConfig::default(),
    };
    if args.verify {
        config.decoder.verify_signatures = true;
    }
    if args.format {
        config.output.pretty = true;
    }

    if args.certificates.is_some() {
        config.certificates = args.certificates.clone();
    }

    let store = match &config.certificates {
        Some(path) => Arc::new(
            CertificateStore::from_path(path)
                .with_context(|| format!("Failed to load certificate dataset: {:?}", path))?,
        ),
        None => CertificateStore::shared().context("Failed to load certificate store")?,
    };
    if config.decoder.verify_signatures && store.is_empty() {
        log::warn!("Certificate store has no keys; every signature will be reported as key not found");
    }
    log::info!(
        "Certificate store {}: {} first generation key(s), {} second generation key(s)",
        store.version(),
        store.len(Generation::Gen1),
        store.len(Generation::Gen2V1)
    );
    let decoder = Decoder::with_store(store).with_config(config.decoder.clone());
    let kind = if args.card { Kind::Card } else { Kind::Vu };

    match &args.input_list {
        Some(list) => batch_mode(&decoder, kind, list, config.output.pretty),
        None => single_mode(&decoder, kind, &args, config.output.pretty),
    }
}

/// Decode one input; any failure aborts
fn single_mode(decoder: &Decoder, kind: Kind, args: &Args, pretty: bool) -> Result<()> {
    let bytes = match &args.input {
        Some(path) => {
            fs::read(path).with_context(|| format!("Failed to read input file: {:?}", path))?
        }
        None => {
            let mut buffer = Vec::new();
            io::stdin()
                .read_to_end(&mut buffer)
                .context("Failed to read stdin")?;
            buffer
        }
    };

    let json = decode_to_json(decoder, kind, &bytes, pretty)?;

    match args.output.as_deref() {
        Some(path) if path != Path::new("-") => fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write output file: {:?}", path))?,
        _ => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json).context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

/// Decode every file named in `list`; failures are logged and skipped
fn batch_mode(decoder: &Decoder, kind: Kind, list: &Path, pretty: bool) -> Result<()> {
    let content = fs::read_to_string(list)
        .with_context(|| format!("Failed to read input list: {:?}", list))?;
    let inputs = parse_input_list(&content)?;
    log::info!("Decoding {} file(s) from {:?}", inputs.len(), list);

    let failures = inputs
        .par_iter()
        .filter(|input| match decode_file(decoder, kind, input, pretty) {
            Ok(output) => {
                log::info!("{:?} -> {:?}", input, output);
                false
            }
            Err(e) => {
                log::warn!("Skipping {:?}: {:#}", input, e);
                true
            }
        })
        .count();

    log::info!(
        "Batch finished: {} decoded, {} skipped",
        inputs.len() - failures,
        failures
    );
    Ok(())
}

/// One path per line, blank lines ignored
fn parse_input_list(content: &str) -> Result<Vec<PathBuf>> {
    let inputs: Vec<PathBuf> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect();
    if inputs.is_empty() {
        bail!("no input files found in list");
    }
    Ok(inputs)
}

fn decode_file(decoder: &Decoder, kind: Kind, input: &Path, pretty: bool) -> Result<PathBuf> {
    let bytes = fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    let json = decode_to_json(decoder, kind, &bytes, pretty)?;
    let output = output_path(input);
    fs::write(&output, json + "\n").with_context(|| format!("Failed to write {:?}", output))?;
    Ok(output)
}

/// `<input>.json`
fn output_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".json");
    PathBuf::from(name)
}

fn decode_to_json(decoder: &Decoder, kind: Kind, bytes: &[u8], pretty: bool) -> Result<String> {
    match kind {
        Kind::Card => render(decoder.decode_card(bytes)?, |card| card.to_json(pretty)),
        Kind::Vu => render(decoder.decode_vu(bytes)?, |vu| vu.to_json(pretty)),
    }
}

/// Serialize a result, or fail if decoding stopped early
fn render<T>(
    decoded: Decoded<T>,
    to_json: impl FnOnce(&T) -> tacho_decoder::Result<String>,
) -> Result<String> {
    if let Some(terminal) = decoded.terminal() {
        bail!(
            "decoding stopped after {} byte(s): {}",
            decoded.consumed,
            terminal
        );
    }
    Ok(to_json(&decoded.value)?)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_kind_is_required_and_exclusive() {
        assert!(Args::try_parse_from(["tacho-cli"]).is_err());
        assert!(Args::try_parse_from(["tacho-cli", "--card", "--vu"]).is_err());
        let args = Args::try_parse_from(["tacho-cli", "--vu", "-f", "--verify"]).unwrap();
        assert!(args.vu && args.format && args.verify);
    }

    #[test]
    fn test_input_list_excludes_input() {
        let parsed =
            Args::try_parse_from(["tacho-cli", "--card", "--input", "a.ddd", "--input-list", "l"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_input_list_parsing() {
        let inputs = parse_input_list("a.ddd\n\n  b.ddd  \n").unwrap();
        assert_eq!(inputs, vec![PathBuf::from("a.ddd"), PathBuf::from("b.ddd")]);

        let err = parse_input_list("\n   \n").unwrap_err();
        assert_eq!(err.to_string(), "no input files found in list");
    }

    #[test]
    fn test_empty_input_list_fails_the_batch() {
        let list = std::env::temp_dir().join(format!("tacho-cli-empty-{}.txt", std::process::id()));
        fs::write(&list, "\n").unwrap();
        let decoder = Decoder::with_store(Arc::new(CertificateStore::empty()));
        let result = batch_mode(&decoder, Kind::Card, &list, false);
        fs::remove_file(&list).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_certificates_flag() {
        let args = Args::try_parse_from(["tacho-cli", "--vu", "--certificates", "erca.json"]).unwrap();
        assert_eq!(args.certificates, Some(PathBuf::from("erca.json")));
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("downloads/driver.ddd")),
            PathBuf::from("downloads/driver.ddd.json")
        );
    }

    #[test]
    fn test_terminal_diagnostic_fails() {
        let decoder = Decoder::with_store(Arc::new(CertificateStore::empty()));
        // a card element claiming more bytes than are present
        let bytes = [0x05, 0x20, 0x00, 0x00, 0x63, 0x01, 0x02];
        assert!(decode_to_json(&decoder, Kind::Card, &bytes, false).is_err());
        assert_eq!(
            decode_to_json(&decoder, Kind::Vu, &[], false).unwrap(),
            "{}"
        );
    }
}
