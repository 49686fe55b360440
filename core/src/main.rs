//! CLI entry point for model-bridge.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use model_bridge::cli::{Cli, Commands};
use model_bridge::{Config, InferenceInvoker, InputBuffer, MethodCall, MethodChannel};

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_yaml_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    let config = load_config(cli.config.as_deref())?;

    let level: Level = cli
        .log_level
        .as_deref()
        .unwrap_or(config.logging.level.as_str())
        .parse()
        .context("Invalid log level")?;

    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Infer { input, format } => {
            let mut invoker = InferenceInvoker::from_config(&config);

            info!("Loading input: {}", input.display());
            let input_json = read_json(&input)?;
            let data = match input_json.get("data") {
                Some(data) => data,
                None => &input_json,
            };
            let buffer = InputBuffer::from_json(data)?;

            let start = Instant::now();
            let output = invoker.run(buffer)?;
            let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
            info!(
                "Inference complete: {} values in {:.2}ms",
                output.len(),
                latency_ms
            );

            let shape = output.shape().to_vec();
            let num_values = output.len();
            let result = serde_json::json!({
                "num_values": num_values,
                "shape": shape,
                "latency_ms": latency_ms,
                "values": output.into_values(),
            });

            if format == "pretty" {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", serde_json::to_string(&result)?);
            }
            invoker.shutdown();
        }

        Commands::Call { request } => {
            let call: MethodCall = serde_json::from_value(read_json(&request)?)
                .context("Request must be { \"method\": ..., \"arguments\": { ... } }")?;

            let mut channel = MethodChannel::from_config(&config);
            info!(channel = channel.name(), method = %call.method, "Dispatching call");
            let response = channel.handle(&call);
            channel.shutdown();

            println!("{}", serde_json::to_string(&response)?);
        }

        Commands::Info => {
            println!("model-bridge v{}", env!("CARGO_PKG_VERSION"));
            println!("engine: onnxruntime");
            println!();
            println!("Cache: {}", config.model.cached_path().display());
            println!("Assets: {}", config.model.asset_root.display());
            println!("Candidates: {}", config.model.asset_candidates.join(", "));
            println!(
                "Input: {} {:?}",
                config.inference.input_name, config.inference.input_shape
            );
            println!("Outputs: {}", config.inference.output_names.join(", "));
            println!();

            // Try to load the model to verify it works
            info!("Loading model...");
            let mut invoker = InferenceInvoker::from_config(&config);
            invoker.ensure_loaded()?;
            println!("Status: OK (model loaded successfully)");
            invoker.shutdown();
        }
    }

    Ok(())
}
