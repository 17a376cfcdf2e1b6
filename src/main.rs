//  █████╗ ██████╗     ██████╗ ██╗███████╗██╗  ██╗
// ██╔══██╗██╔══██╗    ██╔══██╗██║██╔════╝██║ ██╔╝
// ███████║██║  ██║    ██████╔╝██║███████╗█████╔╝
// ██╔══██║██║  ██║    ██╔══██╗██║╚════██║██╔═██╗
// ██║  ██║██████╔╝    ██║  ██║██║███████║██║  ██╗
// ╚═╝  ╚═╝╚═════╝     ╚═╝  ╚═╝╚═╝╚══════╝╚═╝  ╚═╝
//
// E N G I N E
//
// Forty-two forbidden phrases, three tiers, one verdict per line of ad copy.
// Analyze a single text, shred a CSV, or run the HTTP form.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use ad_risk_engine::batch;
use ad_risk_engine::config::Config;
use ad_risk_engine::server::{self, AppState};
use ad_risk_engine::{analyze_single, terminal, AnalysisError, Classifier, RiskTier};

#[derive(Debug, Parser)]
#[command(name = "ad-risk", version, about = "Keyword-based risk analyzer for advertising copy")]
struct Cli {
    /// Emit logs as JSON lines (also: AD_RISK_LOG_JSON=true)
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze one piece of ad copy
    Analyze {
        #[command(flatten)]
        input: TextInput,

        /// Also write the PDF report to this path
        #[arg(long)]
        pdf: Option<PathBuf>,

        /// Print the verdict as JSON instead of colored text
        #[arg(long)]
        json: bool,
    },

    /// Write the PDF report for one piece of ad copy
    Report {
        #[command(flatten)]
        input: TextInput,

        /// Output path (default: risk_analysis.pdf)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Analyze every row of a CSV file with a `text` column
    Batch {
        /// Input CSV file
        input: PathBuf,

        /// Where to write the augmented CSV (default: risk_result.csv)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Skip the terminal table and chart
        #[arg(long)]
        quiet: bool,
    },

    /// Run the HTTP form service
    Serve {
        /// Port to listen on (overrides AD_RISK_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind (overrides AD_RISK_BIND_ADDR)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Print the built-in keyword lists
    Keywords,
}

#[derive(Debug, clap::Args)]
struct TextInput {
    /// The ad copy. Read from stdin when neither this nor --file is given.
    text: Option<String>,

    /// Read the ad copy from a file
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,
}

impl TextInput {
    fn read(&self) -> Result<String> {
        if let Some(text) = &self.text {
            return Ok(text.clone());
        }
        if let Some(path) = &self.file {
            let bytes =
                fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
            return Ok(decode_text(bytes));
        }
        let mut bytes = Vec::new();
        io::stdin()
            .read_to_end(&mut bytes)
            .context("failed to read ad copy from stdin")?;
        Ok(decode_text(bytes))
    }
}

/// Ad copy is analyzed whatever its encoding; invalid UTF-8 sequences
/// become U+FFFD instead of failing the command.
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            warn!("Input is not valid UTF-8, replacing invalid sequences");
            String::from_utf8_lossy(err.as_bytes()).into_owned()
        }
    }
}

fn print_banner() {
    let banner = r#"
    ╔══════════════════════════════════════════════════════╗
    ║                                                      ║
    ║        📢  AD RISK ENGINE — 광고 문구 위험도 분석기  ║
    ║                                                      ║
    ║   Tiers:     고위험 | 중위험 | 저위험 | 안전         ║
    ║   Matching:  Aho-Corasick + memchr                   ║
    ║   Exports:   PDF report | BOM-prefixed CSV           ║
    ║                                                      ║
    ╚══════════════════════════════════════════════════════╝
    "#;
    println!("{}", banner);
}

fn init_tracing(json: bool, default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::from_env();

    let default_level = match cli.command {
        Command::Serve { .. } => "info",
        _ => "warn",
    };
    init_tracing(cli.json_logs || config.log_json, default_level);

    match run(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<AnalysisError>() {
            Some(analysis_err) if analysis_err.is_rejected_input() => {
                warn!(reason = %analysis_err, "Input rejected");
                eprintln!("{}", analysis_err.to_string().yellow().bold());
                ExitCode::from(2)
            }
            _ => {
                error!(error = %err, "Command failed");
                eprintln!("{} {:#}", "error:".red().bold(), err);
                ExitCode::FAILURE
            }
        },
    }
}

fn run(command: Command, config: Config) -> Result<()> {
    let classifier = Classifier::builtin().context("failed to build keyword classifier")?;

    match command {
        Command::Analyze { input, pdf, json } => {
            let text = input.read()?;
            let result = analyze_single(&classifier, &text)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                terminal::display_analysis(&result);
            }

            if let Some(path) = pdf {
                write_report(&classifier, &text, result.tier, result.keyword_count, &path)?;
                println!("📄 PDF 저장: {}", path.display());
            }
        }

        Command::Report { input, out } => {
            let text = input.read()?;
            let result = analyze_single(&classifier, &text)?;
            let path = out.unwrap_or_else(|| PathBuf::from(&config.report_filename));
            write_report(&classifier, &text, result.tier, result.keyword_count, &path)?;
            println!("📄 PDF 저장: {}", path.display());
        }

        Command::Batch { input, out, quiet } => {
            let outcome = batch::analyze_csv_path(&classifier, &input)
                .with_context(|| format!("failed to analyze {}", input.display()))?;

            if !quiet {
                terminal::display_batch(&outcome);
            }

            let path = out.unwrap_or_else(|| PathBuf::from(&config.csv_filename));
            let bytes = outcome.to_csv_bytes()?;
            fs::write(&path, bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("📥 결과 저장: {}", path.display());
            info!(rows = outcome.rows.len(), path = %path.display(), "Batch result written");
        }

        Command::Serve { port, bind } => {
            let mut config = config;
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            run_server(classifier, config)?;
        }

        Command::Keywords => {
            for tier in [RiskTier::High, RiskTier::Mid, RiskTier::Low] {
                let keywords = classifier.lists().for_tier(tier);
                println!("{} ({})", tier.label().bold(), keywords.len());
                for keyword in keywords {
                    println!("  - {keyword}");
                }
            }
        }
    }

    Ok(())
}

fn write_report(
    classifier: &Classifier,
    text: &str,
    tier: RiskTier,
    keyword_count: usize,
    path: &Path,
) -> Result<()> {
    let pdf = classifier.build_report(text, tier, keyword_count)?;
    fs::write(path, pdf).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), tier = tier.as_str(), "PDF report written");
    Ok(())
}

fn run_server(classifier: Classifier, config: Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    runtime.block_on(async move {
        print_banner();

        let listener = TcpListener::bind(config.listen_addr())
            .await
            .with_context(|| format!("failed to bind {}", config.listen_addr()))?;
        let state = Arc::new(AppState::new(classifier, config));

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => warn!("🛑 Shutdown signal received!"),
                Err(err) => error!("❌ Signal listener error: {}", err),
            }
            let _ = shutdown_tx.send(true);
        });

        info!("⚡ Press Ctrl+C for graceful shutdown");
        server::serve(listener, state, &mut shutdown_rx).await;
        info!("💤 AD RISK ENGINE: OFFLINE");
        Ok(())
    })
}
