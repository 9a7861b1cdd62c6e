// LogPulse CLI - parse a log file, flag anomalies and print the report

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use logpulse_core::ai_provider::{create_provider_from_config, BasicSummaryProvider, SummaryContext};
use logpulse_core::{
    decode_log_bytes, generate_report, read_log_file, save_report, AiSummary, AnalysisError, Analyzer,
    Config, OutputFormat, ParsedLog,
};
use std::io::Read;
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Clone, Copy, ValueEnum, Debug)]
enum OutputArg {
    Json,
    Console,
}

impl From<OutputArg> for OutputFormat {
    fn from(arg: OutputArg) -> Self {
        match arg {
            OutputArg::Json => OutputFormat::Json,
            OutputArg::Console => OutputFormat::Console,
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Debug)]
enum SummaryArg {
    #[value(name = "none")]
    Off,
    Basic,
    Openai,
}

impl SummaryArg {
    fn provider_name(self) -> &'static str {
        match self {
            SummaryArg::Off => "none",
            SummaryArg::Basic => "basic",
            SummaryArg::Openai => "openai",
        }
    }
}

#[derive(Parser)]
#[command(name = "logpulse")]
#[command(about = "Parse server logs, detect anomalies and build an activity timeline", long_about = None)]
#[command(version)]
struct Cli {
    /// Log file to analyze (reads stdin when omitted)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "json")]
    output: OutputArg,

    /// Summary provider, overrides the config file
    #[arg(long, value_enum)]
    summary: Option<SummaryArg>,

    /// API key for the summary provider
    #[arg(long, env = "LOGPULSE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Leave the timeline out of the report
    #[arg(long)]
    no_timeline: bool,

    /// Also write the report to this path
    #[arg(long)]
    save: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if cli.no_timeline {
        config.timeline.enabled = false;
    }
    if let Some(summary) = cli.summary {
        config.summary.provider = summary.provider_name().to_string();
    }
    if let Some(key) = &cli.api_key {
        config.summary.api_key = Some(key.clone());
    }
    Ok(config)
}

fn read_input(file: Option<&PathBuf>) -> Result<String, AnalysisError> {
    match file {
        Some(path) => read_log_file(path),
        None => {
            info!("Reading log text from stdin");
            let mut data = Vec::new();
            std::io::stdin().read_to_end(&mut data)?;
            decode_log_bytes(&data)
        }
    }
}

async fn summarize(config: &Config, context: &SummaryContext) -> Option<AiSummary> {
    let provider = match create_provider_from_config(config) {
        Ok(provider) => provider,
        Err(e) => {
            warn!("Summary provider '{}' unavailable: {}", config.summary.provider, e);
            return Some(BasicSummaryProvider::summary_for(context));
        }
    };

    match provider.summarize(context).await {
        Ok(summary) => summary,
        Err(e) => {
            warn!("Summary generation with {} failed, using basic summary: {}", provider.get_provider_name(), e);
            Some(BasicSummaryProvider::summary_for(context))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG wins when set; otherwise only warnings reach stderr
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("logpulse=warn,logpulse_core=warn"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let analyzer = Analyzer::new(config.clone());
    let cancel = analyzer.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling analysis");
            cancel.cancel();
        }
    });

    let file = cli.file.clone();
    let outcome = tokio::task::spawn_blocking(move || -> Result<_, AnalysisError> {
        let text = read_input(file.as_ref())?;
        let parsed: ParsedLog = analyzer.parse(&text)?;
        let report = analyzer.analyze_parsed(&parsed)?;
        Ok((parsed, report))
    })
    .await
    .context("Analysis task panicked")?;

    let (parsed, report) = match outcome {
        Ok(result) => result,
        Err(e) => {
            error!("Analysis failed: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let report = if config.summary.provider.eq_ignore_ascii_case("none") {
        report
    } else {
        let context = SummaryContext::build(&report, &parsed.entries, config.summary.sample_size);
        let summary = summarize(&config, &context).await;
        report.with_ai_summary(summary)
    };

    let rendered = generate_report(&report, cli.output.into())?;
    println!("{}", rendered);

    if let Some(path) = &cli.save {
        save_report(&rendered, path)?;
    }

    Ok(())
}
