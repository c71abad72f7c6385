//! p12crack: recover the passphrase of a PKCS#12 or KDBX file
//!
//! Usage:
//!   p12crack { -d <dictionary> | -b [-m <min>] [-M <max>] [-c <tokens> | -s <alphabet>] }
//!            [-t <threads>] [-v] <file>
//!
//! With both -d and -b the word list is tried first, then brute force.

use anyhow::{Context, Result};
use clap::{error::ErrorKind, Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use p12crack_container::{open_container, ContainerKind};
use p12crack_core::config::{load_config, CrackConfig};
use p12crack_core::{CrackError, CrackResult, ExitCode};
use p12crack_engine::{
    resolve_workers, BruteForceSpace, CandidateSource, Charset, Coordinator, LengthRange, Outcome,
    ProgressSample, SearchOptions, SearchReport,
};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "p12crack",
    version,
    about = "Multithreaded passphrase recovery for PKCS#12 and KeePass files",
    long_about = "p12crack: recover a lost passphrase with dictionary and brute-force attacks.\n\n\
                  Charset tokens (-c), concatenated in the order given:\n  \
                  a = abcdefghijklmnopqrstuvwxyz\n  \
                  A = ABCDEFGHIJKLMNOPQRSTUVWXYZ\n  \
                  n = 0123456789\n  \
                  s = !\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~ (including blank)\n  \
                  x = all previous sets"
)]
struct Cli {
    /// Dictionary attack using this word list
    #[arg(short = 'd', long = "dictionary", value_name = "FILE")]
    dictionary: Option<PathBuf>,

    /// Brute force attack
    #[arg(short = 'b', long = "brute-force")]
    brute_force: bool,

    /// Minimum password length (implies -b)
    #[arg(short = 'm', long = "min-length", value_name = "N")]
    min_length: Option<usize>,

    /// Maximum password length (implies -b)
    #[arg(short = 'M', long = "max-length", value_name = "N")]
    max_length: Option<usize>,

    /// Character set tokens: a, A, n, s, x (requires -b, -m or -M)
    #[arg(short = 'c', long = "charset", value_name = "TOKENS")]
    charset: Option<String>,

    /// Literal alphabet to build passwords from (requires -b, -m or -M)
    #[arg(short = 's', long = "alphabet", value_name = "CHARS")]
    alphabet: Option<String>,

    /// Worker threads (default: number of CPUs)
    #[arg(short = 't', long = "threads", value_name = "N")]
    threads: Option<usize>,

    /// Progress reporting and detailed banners
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Container format of the target file
    #[arg(long, default_value = "auto", value_name = "auto|pkcs12|kdbx")]
    format: ContainerKind,

    /// Path to p12crack.toml configuration file
    #[arg(long, env = "P12CRACK_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "P12CRACK_LOG")]
    log: Option<String>,

    /// Log format (json, text)
    #[arg(long, env = "P12CRACK_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// File to crack
    file: PathBuf,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

/// Validated search parameters
struct Plan {
    dictionary: Option<PathBuf>,
    brute_force: Option<BruteForceSpace>,
    workers: usize,
    report_interval: Duration,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> std::process::ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::Found,
                _ => ExitCode::Usage,
            };
            let _ = e.print();
            return exit(code);
        }
    };

    match run(cli) {
        Ok(code) => exit(code),
        Err(e) => {
            let code = e
                .downcast_ref::<CrackError>()
                .map(CrackError::exit_code)
                .unwrap_or(ExitCode::Runtime);
            eprintln!("Error: {e:#}");
            if code == ExitCode::Usage {
                eprintln!("\nRun `p12crack --help` for usage.");
            }
            exit(code)
        }
    }
}

fn exit(code: ExitCode) -> std::process::ExitCode {
    std::process::ExitCode::from(code.code() as u8)
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;
    init_logging(&cli, &config);

    if let Some(path) = &cli.config {
        if !path.exists() {
            warn!("config file not found: {}  (using defaults)", path.display());
        }
    }

    let plan = build_plan(&cli, &config)?;

    // resources in the order they can fail: word list, then target
    let mut sources = Vec::with_capacity(2);
    if let Some(path) = &plan.dictionary {
        sources.push(CandidateSource::dictionary(path)?);
    }
    let verifier = open_container(&cli.file, cli.format)?;
    info!(target = %verifier.describe(), file = %cli.file.display(), "container loaded");

    if let Some(space) = &plan.brute_force {
        sources.push(CandidateSource::BruteForce(space.clone()));
    }

    let mut coordinator = Coordinator::new(
        verifier,
        SearchOptions {
            workers: plan.workers,
            report_interval: plan.report_interval,
        },
    )?;

    let cancel = coordinator.cancel_token();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        cancel.cancel();
    })
    .context("Failed to set signal handler")?;

    let spinner = cli.verbose.then(|| make_spinner("search"));
    if let Some(pb) = &spinner {
        let pb = pb.clone();
        coordinator = coordinator.with_progress(Box::new(move |s: &ProgressSample| {
            pb.set_message(format!(
                "Performance: {:>20} passwords [{:>8} passwords per second]",
                s.total, s.per_second as u64
            ));
        }));
    }

    if cli.verbose {
        print_start_banner(&cli, &plan);
    }

    let report = coordinator.run(&sources);
    if let Some(pb) = &spinner {
        pb.finish_and_clear();
    }
    let report = report?;

    Ok(print_result(&report, cli.verbose))
}

// ── Plan validation ───────────────────────────────────────────────────────────

fn build_plan(cli: &Cli, config: &CrackConfig) -> CrackResult<Plan> {
    let brute = cli.brute_force || cli.min_length.is_some() || cli.max_length.is_some();

    if cli.dictionary.is_none() && !brute {
        return Err(CrackError::config(
            "choose at least one attack type (-d for dictionary attack or -b for brute force attack)",
        ));
    }
    if !brute && (cli.charset.is_some() || cli.alphabet.is_some()) {
        return Err(CrackError::config("-c and -s flags require -b, -m or -M flags"));
    }

    let brute_force = if brute {
        let charset = Charset::resolve(
            cli.charset.as_deref(),
            cli.alphabet.as_deref(),
            &config.search.charset,
        )?;
        let lengths = LengthRange::normalize(
            cli.min_length,
            cli.max_length,
            config.search.min_length,
            config.search.max_length,
        )?;
        Some(BruteForceSpace::new(charset, lengths))
    } else {
        None
    };

    let workers = match cli.threads {
        Some(0) => return Err(CrackError::config("thread count must be at least 1")),
        Some(n) => n,
        None => resolve_workers(config.search.threads),
    };

    Ok(Plan {
        dictionary: cli.dictionary.clone(),
        brute_force,
        workers,
        report_interval: Duration::from_millis(config.search.report_interval_ms),
    })
}

// ── Output ────────────────────────────────────────────────────────────────────

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn print_start_banner(cli: &Cli, plan: &Plan) {
    if plan.dictionary.is_some() {
        println!("\nDictionary attack - Starting {} threads", plan.workers);
    }
    if let Some(space) = &plan.brute_force {
        println!("\nBrute force attack - Starting {} threads", plan.workers);
        print!("\nAlphabet: {}", space.charset());
        if space.charset().contains_blank() {
            print!(" <(including blank)>");
        }
        let lengths = space.lengths();
        print!("\nMin length: {}", lengths.min());
        if cli.min_length.is_none() {
            print!(" [default]");
        }
        print!("\nMax length: {}", lengths.max());
        if cli.max_length.is_none() {
            print!(" [default]");
        }
        match space.size() {
            Some(size) => println!("\nCandidates: {size}"),
            None => println!("\nCandidates: more than 2^64"),
        }
        println!("Use -m and -M flags to modify these values.\n");
    }
}

fn print_result(report: &SearchReport, verbose: bool) -> ExitCode {
    match &report.outcome {
        Outcome::Found(found) => {
            if verbose {
                println!("\n*********************************************************");
                println!(
                    "{} - Thread {} - Password found: {}",
                    found.mode,
                    found.worker + 1,
                    found.candidate
                );
                println!("*********************************************************\n");
                print_stats(report);
            } else {
                println!("Password found: {}", found.candidate);
            }
            ExitCode::Found
        }
        Outcome::NotFound => {
            if verbose {
                for phase in &report.phases {
                    println!("\n{} - Exhausted search ({} passwords)", phase.mode, phase.attempts);
                }
                print_stats(report);
            }
            if report.interrupted {
                println!("\nSearch interrupted, no password found\n");
            } else {
                println!("\nNo password found\n");
            }
            ExitCode::NotFound
        }
    }
}

fn print_stats(report: &SearchReport) {
    let secs = report.elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        report.attempts() as f64 / secs
    } else {
        0.0
    };
    println!(
        "Tried {} passwords with {} threads in {:.1}s ({:.0} passwords per second)",
        report.attempts(),
        report.workers,
        secs,
        rate
    );
}

// ── Logging ───────────────────────────────────────────────────────────────────

fn init_logging(cli: &Cli, config: &CrackConfig) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = cli.log.as_deref().unwrap_or(&config.log.level);
    let format = cli.log_format.clone().unwrap_or_else(|| {
        if config.log.format.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries results only
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["p12crack"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("valid arguments")
    }

    fn plan(args: &[&str]) -> CrackResult<Plan> {
        build_plan(&parse(args), &CrackConfig::default())
    }

    #[test]
    fn attack_type_is_required() {
        assert!(matches!(plan(&["target.p12"]), Err(CrackError::Config(_))));
    }

    #[test]
    fn length_flags_imply_brute_force() {
        let p = plan(&["-M", "3", "target.p12"]).unwrap();
        let space = p.brute_force.expect("brute force selected");
        assert_eq!(space.lengths(), LengthRange::new(1, 3).unwrap());
        assert_eq!(space.charset(), &Charset::full());
    }

    #[test]
    fn charset_requires_brute_force() {
        assert!(plan(&["-d", "words.txt", "-c", "a", "target.p12"]).is_err());
        assert!(plan(&["-d", "words.txt", "-s", "ab", "target.p12"]).is_err());
    }

    #[test]
    fn charset_and_alphabet_are_exclusive() {
        assert!(plan(&["-b", "-c", "a", "-s", "ab", "target.p12"]).is_err());
    }

    #[test]
    fn both_modes_are_planned() {
        let p = plan(&["-d", "words.txt", "-b", "-s", "ab", "-t", "3", "target.p12"]).unwrap();
        assert_eq!(p.dictionary.as_deref(), Some(std::path::Path::new("words.txt")));
        assert_eq!(p.brute_force.unwrap().charset().to_string(), "ab");
        assert_eq!(p.workers, 3);
    }

    #[test]
    fn zero_threads_rejected() {
        assert!(plan(&["-b", "-t", "0", "target.p12"]).is_err());
    }

    #[test]
    fn inverted_explicit_lengths_rejected() {
        assert!(plan(&["-m", "5", "-M", "2", "target.p12"]).is_err());
        let p = plan(&["-m", "12", "target.p12"]).unwrap();
        assert_eq!(p.brute_force.unwrap().lengths(), LengthRange::new(12, 12).unwrap());
    }

    #[test]
    fn format_flag_parses() {
        assert_eq!(parse(&["-b", "--format", "kdbx", "db.kdbx"]).format, ContainerKind::Kdbx);
        assert_eq!(parse(&["-b", "db.p12"]).format, ContainerKind::Auto);
    }
}
