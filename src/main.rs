use anyhow::{bail, Context};
use clap::Parser;
use kafka_rest_producer::{
    Client, Config, DeliveryReport, KeyStrategy, MessageFormat, ProducerDefinition,
};
use serde_json::Value;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "kafka-rest-produce")]
#[command(about = "Send messages to a Kafka REST proxy topic", long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Topic to produce to")]
    topic: String,

    #[arg(long, help = "REST proxy base URL (overrides configuration)")]
    url: Option<String>,

    #[arg(short, long, help = "Message format: json or binary (overrides configuration)")]
    format: Option<MessageFormat>,

    #[arg(short, long, value_name = "PATH", help = "Dotted field path used as the message key")]
    key_field: Option<String>,

    #[arg(short, long, help = "Message to send; repeatable. Reads stdin lines when absent")]
    message: Vec<String>,

    #[arg(long, default_value_t = 30, help = "Seconds to wait for in-flight messages on exit")]
    drain_timeout_secs: u64,

    #[arg(short, long, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, help = "Verbose logging")]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs, args.verbose);

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Config::from_file(path).with_context(|| format!("Failed to load configuration from {:?}", path))?
        }
        None => Config::from_env().context("Failed to load configuration from environment")?,
    };

    let failures = Arc::new(AtomicUsize::new(0));
    let client = Client::new(config)?;
    client.configure(|config| {
        if let Some(url) = &args.url {
            config.url = url.clone();
        }
        if let Some(format) = args.format {
            config.message_format = format;
        }

        let failures = Arc::clone(&failures);
        config.report_hook = Some(Arc::new(move |report: &DeliveryReport| {
            if !report.is_delivered() {
                failures.fetch_add(1, Ordering::SeqCst);
            }
        }));
        Ok(())
    })?;

    let config = client.config();
    info!(
        url = %config.url,
        format = %config.message_format,
        topic = %args.topic,
        worker_max_threads = config.worker_max_threads,
        worker_max_queue = ?config.worker_max_queue,
        "Configuration summary"
    );

    let key = match &args.key_field {
        Some(path) => KeyStrategy::field(path.as_str()),
        None => KeyStrategy::None,
    };
    let producer = client.producer(ProducerDefinition::<Value>::new(args.topic.as_str()).key(key));

    let mut sent = 0usize;
    let mut send_line = |line: &str| {
        if line.trim().is_empty() {
            return;
        }

        let value = serde_json::from_str(line).unwrap_or_else(|_| Value::String(line.to_string()));
        match producer.send(&value) {
            Ok(()) => sent += 1,
            Err(e) => {
                error!("Failed to send message: {}", e);
                failures.fetch_add(1, Ordering::SeqCst);
            }
        }
    };

    if args.message.is_empty() {
        for line in io::stdin().lock().lines() {
            send_line(&line?);
        }
    } else {
        for message in &args.message {
            send_line(message);
        }
    }

    client.shutdown(Duration::from_secs(args.drain_timeout_secs))?;

    let failed = failures.load(Ordering::SeqCst);
    if failed > 0 {
        warn!(sent, failed, "Some messages were not delivered");
        bail!("{} message(s) failed", failed);
    }

    info!(sent, "All messages delivered");
    Ok(())
}

fn init_logging(json: bool, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("kafka_rest_producer=debug,kafka_rest_produce=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("kafka_rest_producer=info,kafka_rest_produce=info,warn"))
    };

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
