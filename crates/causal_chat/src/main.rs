use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use causal_chat::analyzer::CausalAnalyzer;
use causal_chat::report::{
    export_evidence_csv, export_results_json, export_text_report, export_warnings_csv,
    warning_digests,
};
use causal_chat::signals::{SignalEngine, SignalSummary};
use causal_chat::transcripts::{
    load_transcripts, preprocess_transcripts, DatasetStatistics, Outcome, Turn,
};
use causal_chat::utils::tracing::init_logger;
use clap::{Parser, Subcommand, ValueEnum};
use common::configuration::{AnalysisPreset, ConfigOverrides, Configuration};
use common::consts::CONFIG_PATH_ENV;
use tracing::info;

const WARNING_CONTEXT_TURNS: u32 = 1;

#[derive(Debug, Parser)]
#[command(name = "causal-chat", version, about = "Escalation signal analysis for support transcripts")]
struct Cli {
    /// YAML configuration file, falls back to $CAUSAL_CHAT_CONFIG
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the full analysis and write reports
    Analyze(AnalyzeArgs),
    /// Show the signals a single turn produces
    Signals {
        #[arg(long, default_value = "customer")]
        speaker: String,
        #[arg(long)]
        text: String,
    },
    /// Dataset statistics and signal frequencies
    Stats {
        #[arg(long)]
        data: PathBuf,
    },
}

#[derive(Debug, clap::Args)]
struct AnalyzeArgs {
    /// Transcript dataset (JSON)
    #[arg(long)]
    data: PathBuf,
    #[arg(long)]
    preset: Option<AnalysisPreset>,
    /// Frustration signals before a single-signal warning fires
    #[arg(long)]
    threshold: Option<u32>,
    /// Multi-signal confidence threshold
    #[arg(long)]
    confidence: Option<f64>,
    /// Risk window size in turns
    #[arg(long)]
    window: Option<usize>,
    #[arg(long, default_value = "output")]
    output: PathBuf,
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [ReportFormat::Json, ReportFormat::Csv, ReportFormat::Txt])]
    format: Vec<ReportFormat>,
}

impl AnalyzeArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            preset: self.preset,
            threshold: self.threshold,
            confidence: self.confidence,
            window: self.window,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Json,
    Csv,
    Txt,
}

// ---------------------------------------------------------------------------
// Configuration loading
// ---------------------------------------------------------------------------

/// Explicit `--config` wins over the environment
fn config_path(explicit: Option<&Path>, from_env: Option<OsString>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| from_env.filter(|v| !v.is_empty()).map(PathBuf::from))
}

/// With neither `--config` nor the environment variable the built-in
/// defaults are used.
fn load_config(path: Option<&Path>) -> Result<Configuration> {
    match config_path(path, env::var_os(CONFIG_PATH_ENV)) {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            Configuration::load(&path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))
        }
        None => Ok(Configuration::default()),
    }
}

fn load_turns(path: &Path, config: &Configuration) -> Result<(DatasetStatistics, Vec<Turn>)> {
    let transcripts = load_transcripts(path)?;
    let turns = preprocess_transcripts(&transcripts, &config.escalation)?;
    let stats = DatasetStatistics::compute(&transcripts, &turns);
    Ok((stats, turns))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run_analyze(mut config: Configuration, args: AnalyzeArgs) -> Result<()> {
    if let Some(preset) = args.preset {
        info!(preset = ?preset, focus = preset.focus(), "applying preset");
    }
    args.overrides().apply(&mut config);

    let analyzer = CausalAnalyzer::new(config).context("invalid analysis configuration")?;
    let (stats, turns) = load_turns(&args.data, analyzer.config())?;
    let results = analyzer.analyze(&turns);
    let config = analyzer.config();

    for format in &args.format {
        match format {
            ReportFormat::Json => export_results_json(
                &results,
                Some(&stats),
                config,
                args.output.join("results.json"),
            )?,
            ReportFormat::Csv => {
                export_evidence_csv(&results.causes.evidence, args.output.join("evidence.csv"))?;
                export_warnings_csv(results.warnings(), args.output.join("warnings.csv"))?;
            }
            ReportFormat::Txt => export_text_report(
                &results,
                Some(&stats),
                config.report.evidence_samples,
                args.output.join("report.txt"),
            )?,
        }
    }

    println!("Transcripts: {}", stats.total_transcripts);
    println!("Turns: {}", stats.total_turns);
    println!("Escalation rate: {:.2}%", stats.escalation_rate);
    println!("Signals in escalated turns: {}", results.causes.total_signals());
    for cause in results.causes.ranked() {
        println!("  {:<24} {:>6} ({:.1}%)", cause.cause, cause.count, cause.share);
    }
    println!(
        "Warnings: {} single-signal, {} multi-signal",
        results.early_warnings.len(),
        results.multi_signal_warnings.len()
    );
    println!(
        "High-risk conversations: {}",
        results.high_risk_conversations(config.risk.high_risk_threshold)
    );

    println!("Reports written to {}", args.output.display());

    let digests = warning_digests(
        analyzer.engine(),
        &results,
        &turns,
        WARNING_CONTEXT_TURNS,
        config.report.top_warnings,
    );
    if !digests.is_empty() {
        println!("\nTop warnings:");
    }
    for digest in &digests {
        println!(
            "  {} turn {} (confidence {:.2}, dominant {}, peak risk {})",
            digest.transcript_id,
            digest.turn_number,
            digest.confidence,
            digest.dominant_signal.unwrap_or("-"),
            digest
                .peak_risk
                .map_or_else(|| "-".to_string(), |r| format!("{r:.2}"))
        );
        for context in &digest.context {
            let marker = if context.is_target { '>' } else { ' ' };
            println!(
                "    {marker} {:>3} {}: {}",
                context.turn_number, context.speaker, context.text
            );
        }
    }
    Ok(())
}

fn run_signals(config: &Configuration, speaker: &str, text: &str) -> Result<()> {
    config.validate()?;
    let engine = SignalEngine::new(&config.signals);
    let turn = Turn {
        transcript_id: "cli".to_string(),
        domain: String::new(),
        intent: String::new(),
        outcome: Outcome::Resolved,
        turn_number: 1,
        speaker: speaker.to_string(),
        text: text.to_string(),
    };

    let signals = engine.extract_signals(&turn);
    if signals.is_empty() {
        println!("No signals");
    }
    for signal in &signals {
        println!("{signal}");
    }

    println!("\nKeyword coverage:");
    for name in engine.signal_names() {
        println!("  {:<24} {:.2}", name, engine.signal_confidence(&turn, name));
    }
    Ok(())
}

fn run_stats(config: &Configuration, data: &Path) -> Result<()> {
    config.validate()?;
    let (stats, turns) = load_turns(data, config)?;
    let engine = SignalEngine::new(&config.signals);
    let summary = SignalSummary::from_turns(&engine, &turns);

    println!("Transcripts: {}", stats.total_transcripts);
    println!("Turns: {}", stats.total_turns);
    println!(
        "Escalated: {} / Resolved: {} ({:.2}% escalated)",
        stats.escalated_conversations, stats.resolved_conversations, stats.escalation_rate
    );
    println!(
        "Average turns per conversation: {:.2}",
        stats.avg_turns_per_conversation
    );

    println!("\nDomains:");
    for (domain, count) in &stats.domains {
        println!("  {domain:<24} {count:>6}");
    }

    println!("\nTop intents ({} distinct):", stats.total_intents);
    for (intent, count) in &stats.top_intents {
        println!("  {intent:<40} {count:>6}");
    }

    println!(
        "\nSignals ({} over {} turns):",
        summary.total_signals, summary.total_turns
    );
    for count in &summary.counts {
        println!(
            "  {:<24} {:>6} ({:.1}% of turns)",
            count.signal, count.count, count.percentage
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logger("info");

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Analyze(args) => run_analyze(config, args),
        Command::Signals { speaker, text } => run_signals(&config, &speaker, &text),
        Command::Stats { data } => run_stats(&config, &data),
    }
}
