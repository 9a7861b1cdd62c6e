pub mod ai_provider;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod input;
pub mod model;
pub mod output;
pub mod parser;
pub mod report;

pub use ai_provider::{
    create_provider, create_provider_from_config, AIError, BasicSummaryProvider, NoSummaryProvider,
    SummaryContext, SummaryProvider,
};
pub use analyzer::anomaly::{default_rules, Anomaly, AnomalyDetector, AnomalyType, Rule, Severity};
pub use analyzer::statistics::Statistics;
pub use analyzer::timeline::{build_timeline, TimelineBucket, TimelineOutcome};
pub use analyzer::{analyze_text, Analyzer, CancellationFlag};
pub use config::Config;
pub use error::{AnalysisError, Diagnostic, RuleError};
pub use input::{decode_log_bytes, read_log_file};
pub use model::{LogEntry, LogFormat, LogLevel};
pub use output::{generate_report, save_report, OutputFormat, OutputGenerator};
pub use parser::{parse_log_text, LogParser, ParseOptions, ParsedLog};
pub use report::{AiSummary, AnalysisReport};
