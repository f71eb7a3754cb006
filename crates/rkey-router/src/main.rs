// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Routing-key engine CLI
//!
//! Routes JSON log records the way the broker output would and prints each
//! routing key next to the published body.
//!
//! # Usage
//!
//! ```bash
//! # Route records from stdin with an inline template
//! tail -f app.log | rkey-router --template 'app.$["level"]' --tag app
//!
//! # Using configuration file
//! rkey-router --config output.toml --input records.jsonl
//!
//! # Check a template against a record
//! rkey-router check-key --template '$["user"]["roles"][1]' --record '{"user":{"roles":["a","b"]}}'
//! ```

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rkey_router::{
    validate_template, JsonLinesPublisher, LogEvent, OutputConfig, OutputRouter, RoutingKey,
};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Routing-key engine for log forwarding
#[derive(Parser, Debug)]
#[command(name = "rkey-router")]
#[command(about = "Build broker routing keys from log records")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Routing key template
    #[arg(short, long, conflicts_with = "config")]
    template: Option<String>,

    /// Routing key delimiter
    #[arg(short, long, default_value = ".")]
    delimiter: String,

    /// Remove values used in the routing key from published records
    #[arg(long)]
    consume: bool,

    /// Exchange name
    #[arg(short, long, default_value = "logs")]
    exchange: String,

    /// Input file with one JSON record per line (default: stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Tag attached to every record
    #[arg(long, default_value = "rkey-router")]
    tag: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "output.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Validate a template and optionally build a key from one record
    CheckKey {
        /// Routing key template
        #[arg(short, long)]
        template: String,

        /// Routing key delimiter
        #[arg(short, long, default_value = ".")]
        delimiter: String,

        /// JSON record to resolve against
        #[arg(short, long)]
        record: Option<String>,

        /// Show the record after consuming the resolved values
        #[arg(long)]
        consume: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match args.command {
        None => Some(build_config(&args)?),
        Some(_) => None,
    };

    // Initialize logging on stderr, stdout carries the routed records
    let level = args
        .log_level
        .clone()
        .or_else(|| config.as_ref().map(|c| c.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    // apply_defaults logs its fallbacks, so it runs after the subscriber is installed
    let config = config.map(finalize_config).transpose()?;

    match (args.command, config) {
        (Some(Commands::GenConfig { output }), _) => cmd_gen_config(output),
        (Some(Commands::Validate { config }), _) => cmd_validate(config),
        (
            Some(Commands::CheckKey {
                template,
                delimiter,
                record,
                consume,
            }),
            _,
        ) => cmd_check_key(&template, &delimiter, record.as_deref(), consume),
        (None, Some(config)) => cmd_run(config, args.input, &args.tag),
        (None, None) => bail!("No configuration available"),
    }
}

/// Collect the configuration from the file or the command line, unvalidated.
fn build_config(args: &Args) -> Result<OutputConfig> {
    if let Some(ref config_path) = args.config {
        return OutputConfig::read_file(config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()));
    }

    let Some(ref template) = args.template else {
        bail!("Missing --template (or use --config)");
    };

    Ok(OutputConfig::new(&args.exchange, template)
        .delimiter(&args.delimiter)
        .consume(args.consume))
}

fn finalize_config(mut config: OutputConfig) -> Result<OutputConfig> {
    config.apply_defaults();
    config.validate().context("Invalid routing key")?;
    Ok(config)
}

fn cmd_run(config: OutputConfig, input: Option<PathBuf>, tag: &str) -> Result<()> {
    let router = OutputRouter::new(config).context("Failed to create output router")?;

    let reader: Box<dyn BufRead> = match input {
        Some(ref path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let events = reader
        .lines()
        .enumerate()
        .filter_map(|(line_no, line)| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => match serde_json::from_str(&line) {
                Ok(value) => Some(LogEvent::from_json(tag, Utc::now(), value)),
                Err(e) => {
                    tracing::warn!(line = line_no + 1, error = %e, "Couldn't parse record");
                    None
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to read input");
                None
            }
        });

    let stdout = io::stdout();
    let mut publisher = JsonLinesPublisher::new(BufWriter::new(stdout.lock()));
    let summary = router.flush(events, &mut publisher);
    publisher.flush().context("Failed to flush output")?;

    let stats = router.stats_snapshot();
    tracing::info!(
        published = summary.published,
        skipped = summary.skipped,
        failed = summary.failed,
        bytes = stats.bytes_published,
        rate = format!("{:.1}/s", stats.records_per_second()),
        "Flush complete"
    );

    Ok(())
}

fn cmd_gen_config(output: PathBuf) -> Result<()> {
    let mut config = OutputConfig::new(
        "logs",
        r#"$["kubernetes"]["namespace_name"].$["kubernetes"]["labels"]["app"]"#,
    )
    .broker("rabbitmq", 5672)
    .consume(false);
    config.name = "example-output".into();
    config.broker.user = "guest".into();

    let toml_str = toml::to_string_pretty(&config)?;

    let content = format!(
        r#"# Routing key output configuration
# Generated by rkey-router gen-config

{}
"#,
        toml_str
    );

    std::fs::write(&output, content)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<()> {
    match OutputConfig::from_file(&config_path) {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!("Output:    {}", config.name);
            println!("Broker:    {}", config.broker.endpoint());
            println!(
                "Exchange:  {} ({})",
                config.exchange.name, config.exchange.kind
            );
            println!("Template:  {}", config.routing_key.template);
            println!("Delimiter: {}", config.routing_key.delimiter);
            println!(
                "Consume:   {}",
                if config.routing_key.consume { "yes" } else { "no" }
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_check_key(
    template: &str,
    delimiter: &str,
    record: Option<&str>,
    consume: bool,
) -> Result<()> {
    validate_template(template, delimiter).context("Invalid routing key template")?;

    let Some(record) = record else {
        println!("Template valid");
        return Ok(());
    };

    let value: serde_json::Value = serde_json::from_str(record).context("Invalid JSON record")?;
    let Some(mut record) = value.as_object().cloned() else {
        bail!("Record must be a JSON object");
    };

    let key = RoutingKey::new(template, delimiter)?.consume(consume);
    let routing_key = key.build(&mut record)?;

    println!("{}", routing_key);
    if consume {
        println!("{}", serde_json::Value::Object(record));
    }
    Ok(())
}
