//! ccm - Confluent Cloud Metrics CLI
//!
//! Query metrics and browse descriptors from the command line.

use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use ccloud_metrics::config::{Config, Secrets};
use ccloud_metrics::types::parse_timestamp;
use ccloud_metrics::{
    BatchResult, Granularity, Interval, Metric, MetricLabel, MetricsClient, QueryScope, Resource,
    ResourceType, Telemetry,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

/// Confluent Cloud Metrics CLI
#[derive(Parser)]
#[command(name = "ccm")]
#[command(version)]
#[command(about = "Query the Confluent Cloud Metrics API")]
struct Args {
    /// Path to configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Output::Plain, global = true)]
    output: Output,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    Plain,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Command {
    /// Query metrics back from the API
    Query(QueryArgs),

    /// List available metrics
    Metrics {
        /// Only metrics for this resource type (e.g. "kafka")
        #[arg(long)]
        resource_type: Option<String>,
    },

    /// List resource types
    Resources,
}

#[derive(clap::Args)]
struct QueryArgs {
    /// Resource id to query (e.g. a Kafka cluster id)
    #[arg(short, long)]
    cluster: String,

    /// Resource type the id belongs to
    #[arg(long, default_value = "kafka")]
    resource_type: String,

    /// Metric to query; repeat to query several concurrently
    #[arg(short, long = "metric", required = true)]
    metrics: Vec<String>,

    /// Start time (RFC 3339). Default: one hour before --end
    #[arg(long)]
    start: Option<String>,

    /// End time (RFC 3339). Default: now
    #[arg(long)]
    end: Option<String>,

    /// Query the last N minutes instead of --start/--end
    #[arg(long, conflicts_with_all = ["start", "end"])]
    last: Option<u64>,

    /// Granularity (PT1M, PT5M, PT15M, PT30M, PT1H, PT4H, PT6H, PT12H, P1D, ALL)
    #[arg(long, default_value = "PT1H")]
    gran: Granularity,

    /// Seconds to wait for a batch before printing partial results
    #[arg(long)]
    timeout: Option<u64>,

    /// Also filter and group by this metric label (e.g. "topic")
    #[arg(long, requires = "label_value")]
    label: Option<String>,

    /// Value the label must equal
    #[arg(long, requires = "label")]
    label_value: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?.ok_or_else(|| {
        ccloud_metrics::MetricsError::Configuration(
            "no credentials: set CCLOUD_API_KEY and CCLOUD_API_SECRET or create ~/.ccloud-metrics/secrets.toml"
                .into(),
        )
    })?;
    let client = config
        .builder()
        .credentials(secrets.api_key, secrets.api_secret)
        .build()?;

    match args.command {
        Command::Query(query) => run_query(&client, query, args.output).await,
        Command::Metrics { resource_type } => {
            let metrics = client.available_metrics(resource_type.as_deref()).await?;
            print_metrics(&metrics, args.output)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Resources => {
            let resources = client.available_resources().await?;
            print_resources(&resources, args.output)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_query(
    client: &MetricsClient,
    args: QueryArgs,
    output: Output,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let interval = resolve_interval(&args)?;
    let scope = QueryScope::new(
        Resource::for_type(&args.resource_type),
        args.cluster,
        args.gran,
        interval,
    );
    let metrics: Vec<Metric> = args.metrics.into_iter().map(Metric::new).collect();
    debug!(%interval, metrics = metrics.len(), "running query");

    let batch = match (args.label, args.label_value) {
        (Some(label), Some(value)) => {
            let label = MetricLabel::for_key(&label);
            let mut batch = BatchResult::default();
            for metric in &metrics {
                match client
                    .query_metric_and_label(&scope, metric, &label, &value)
                    .await
                {
                    Ok(points) => {
                        batch.results.insert(metric.name.clone(), points);
                    }
                    Err(e) => {
                        batch.errors.insert(metric.name.clone(), e);
                    }
                }
            }
            batch
        }
        _ => {
            let timeout = args
                .timeout
                .map(Duration::from_secs)
                .unwrap_or(client.limits().default_timeout);
            client.query_metrics(&scope, timeout, &metrics).await
        }
    };

    let mut rows: Vec<&Telemetry> = batch.results.values().flatten().collect();
    rows.sort_by(|a, b| (&a.metric, a.timestamp).cmp(&(&b.metric, b.timestamp)));
    print_points(&rows, output)?;

    let mut failed: Vec<_> = batch.errors.iter().collect();
    failed.sort_by(|a, b| a.0.cmp(b.0));
    for (metric, error) in &failed {
        eprintln!("error: {metric}: {error}");
    }
    for metric in batch.missing(&metrics) {
        eprintln!("warning: {metric}: no result before the deadline");
    }

    Ok(if batch.errors.is_empty() && batch.is_complete(&metrics) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn resolve_interval(args: &QueryArgs) -> ccloud_metrics::Result<Interval> {
    if let Some(minutes) = args.last {
        return Interval::last(last_minutes(minutes)?);
    }
    let end = match &args.end {
        Some(end) => parse_timestamp(end)?,
        None => chrono::Utc::now(),
    };
    match &args.start {
        Some(start) => Interval::new(parse_timestamp(start)?, end),
        None => Interval::ending_at(end, Duration::from_secs(3600)),
    }
}

fn last_minutes(minutes: u64) -> ccloud_metrics::Result<Duration> {
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| {
            ccloud_metrics::MetricsError::InvalidInterval(format!(
                "--last {minutes} minutes is out of range"
            ))
        })
}

// ============================================================================
// Rendering
// ============================================================================

fn print_points(rows: &[&Telemetry], output: Output) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match output {
        Output::Json => {
            serde_json::to_writer_pretty(&mut out, rows)?;
            writeln!(out)
        }
        Output::Csv => {
            let label_keys: BTreeSet<&str> = rows
                .iter()
                .flat_map(|p| p.labels.keys().map(String::as_str))
                .collect();
            let mut writer = csv::Writer::from_writer(out);
            let mut header = vec!["timestamp", "metric", "value"];
            header.extend(label_keys.iter().copied());
            writer.write_record(&header)?;
            for point in rows {
                let mut record = vec![
                    point.timestamp.to_rfc3339(),
                    point.metric.clone(),
                    point.value.to_string(),
                ];
                record.extend(
                    label_keys
                        .iter()
                        .map(|key| point.label(key).unwrap_or_default()),
                );
                writer.write_record(&record)?;
            }
            writer.flush()
        }
        Output::Plain => {
            for point in rows {
                writeln!(out, "Timestamp: {}", point.timestamp.to_rfc3339())?;
                writeln!(out, "Metric:    {}", point.metric)?;
                writeln!(out, "Value:     {}", point.value)?;
                for key in point.labels.keys() {
                    writeln!(out, "{key}: {}", point.label(key).unwrap_or_default())?;
                }
                writeln!(out)?;
            }
            Ok(())
        }
    }
}

fn print_metrics(metrics: &[Metric], output: Output) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match output {
        Output::Json => {
            serde_json::to_writer_pretty(&mut out, metrics)?;
            writeln!(out)
        }
        Output::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            writer.write_record(["name", "type", "unit", "labels", "description"])?;
            for metric in metrics {
                let labels: Vec<&str> = metric.labels.iter().map(|l| l.key.as_str()).collect();
                writer.write_record([
                    metric.name.as_str(),
                    metric.kind.as_str(),
                    metric.unit.as_str(),
                    labels.join(";").as_str(),
                    metric.description.as_str(),
                ])?;
            }
            writer.flush()
        }
        Output::Plain => {
            if metrics.is_empty() {
                writeln!(out, "no metrics available")?;
            }
            for metric in metrics {
                writeln!(out, "{}", metric.name)?;
                if !metric.kind.is_empty() || !metric.unit.is_empty() {
                    writeln!(out, "  type: {}  unit: {}", metric.kind, metric.unit)?;
                }
                if !metric.labels.is_empty() {
                    let labels: Vec<&str> =
                        metric.labels.iter().map(|l| l.key.as_str()).collect();
                    writeln!(out, "  labels: {}", labels.join(", "))?;
                }
                if !metric.description.is_empty() {
                    writeln!(out, "  {}", metric.description)?;
                }
            }
            Ok(())
        }
    }
}

fn print_resources(resources: &[ResourceType], output: Output) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match output {
        Output::Json => {
            serde_json::to_writer_pretty(&mut out, resources)?;
            writeln!(out)
        }
        Output::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            writer.write_record(["type", "labels", "description"])?;
            for resource in resources {
                let labels: Vec<&str> = resource.labels.iter().map(|l| l.key.as_str()).collect();
                writer.write_record([
                    resource.kind.as_str(),
                    labels.join(";").as_str(),
                    resource.description.as_str(),
                ])?;
            }
            writer.flush()
        }
        Output::Plain => {
            for resource in resources {
                writeln!(out, "{}", resource.kind)?;
                for label in &resource.labels {
                    writeln!(out, "  {}: {}", label.key, label.description)?;
                }
            }
            Ok(())
        }
    }
}
