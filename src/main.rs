use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use deadline_core::config::OracleConfig;
use deadline_core::oracle::Oracle;
use deadline_engine::normalizer::RawItem;
use deadline_engine::{render, OutputFormat, Pipeline};
use deadline_llm::{ChatCompletionsOracle, ReliableOracle, RetryConfig};
use deadline_telemetry::{init_telemetry, TelemetryConfig};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Markdown,
    Json,
    Table,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Markdown => OutputFormat::Markdown,
            Format::Json => OutputFormat::Json,
            Format::Table => OutputFormat::Table,
        }
    }
}

/// Deadline: automatic promise / commitment detection.
#[derive(Debug, Parser)]
#[command(name = "deadline", version)]
struct Args {
    /// Path to the input file. Reads stdin when omitted.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Markdown)]
    format: Format,

    /// Treat the input as a JSON array of messages
    /// (`text`, `sender`, `timestamp`, `channel`, `metadata`).
    #[arg(long)]
    messages: bool,

    /// Channel tag applied to every message.
    #[arg(long)]
    channel: Option<String>,

    /// Model identifier (overrides DEADLINE_LLM_MODEL).
    #[arg(long)]
    model: Option<String>,

    /// Request timeout in seconds (overrides DEADLINE_LLM_TIMEOUT_SECS).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=600))]
    timeout_secs: Option<u64>,

    /// Retries for transient oracle failures (overrides DEADLINE_LLM_MAX_RETRIES).
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=10))]
    max_retries: Option<u32>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long)]
    log_json: bool,
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display())),
        None => read_stream(std::io::stdin()),
    }
}

fn read_stream(mut reader: impl Read) -> Result<String> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf).context("failed to read stdin")?;
    Ok(buf)
}

fn build_oracle(args: &Args) -> Result<Arc<dyn Oracle>> {
    let mut config = OracleConfig::from_env().context("oracle configuration")?;
    if let Some(model) = &args.model {
        config = config.with_model(model.clone());
    }
    if let Some(secs) = args.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(n) = args.max_retries {
        config = config.with_max_retries(n);
    }

    let max_retries = config.max_retries;
    let client = ChatCompletionsOracle::new(config).context("failed to build oracle client")?;
    let oracle: Arc<dyn Oracle> = if max_retries > 0 {
        Arc::new(ReliableOracle::new(client, RetryConfig::with_max_retries(max_retries)))
    } else {
        Arc::new(client)
    };
    Ok(oracle)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_telemetry(&TelemetryConfig {
        json: args.log_json,
        ..TelemetryConfig::default()
    });

    let text = read_input(args.input.as_ref())?;
    let oracle = build_oracle(&args)?;
    tracing::info!(oracle = oracle.name(), model = oracle.model(), "starting commitment extraction");

    let pipeline = Pipeline::new(oracle);
    let commitments = if args.messages {
        let items: Vec<RawItem> = serde_json::from_str(&text).context("input is not a JSON array of messages")?;
        pipeline.run_items(&items, args.channel.as_deref()).await?
    } else {
        let conversation = deadline_engine::normalize_text(&text, None, None, args.channel.as_deref());
        pipeline.run(&conversation).await?
    };

    println!("{}", render::render(args.format.into(), &commitments)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_whole_stream() {
        let text = read_stream(Cursor::new("I will send it.\nWe'll see.")).unwrap();
        assert_eq!(text, "I will send it.\nWe'll see.");
    }

    #[test]
    fn non_utf8_stream_is_an_error() {
        let err = read_stream(Cursor::new(vec![0xff, 0xfe, 0xfd])).unwrap_err();
        assert!(err.to_string().contains("failed to read stdin"));
    }

    #[test]
    fn format_flag_maps_to_output_format() {
        let args = Args::try_parse_from(["deadline", "--format", "table", "--messages"]).unwrap();
        assert_eq!(OutputFormat::from(args.format), OutputFormat::Table);
        assert!(args.messages);
    }
}
