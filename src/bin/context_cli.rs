use anyhow::{bail, Context as _, Result};
use context_type_lib::api::ContextService;
use context_type_lib::init_logging;
use context_type_lib::models::{DetectRequest, LabeledSample, TrainRequest};
use context_type_lib::services::config_store::ConfigStore;
use serde::Serialize;

const USAGE: &str = "Usage:
  context_cli train <samples.json> [--config <dir>]
  context_cli detect <text> [--rule-based] [--previous <context>] [--config <dir>]
  context_cli metrics [--config <dir>]

Notes:
  - samples.json is a JSON array of {\"text\": ..., \"label\": \"code\"|\"email\"|\"chat\"}.
  - detect and metrics load the last trained model if one was saved.";

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_service(args: &[String]) -> Result<ContextService> {
    let config_dir = match parse_arg_value(args, "--config") {
        Some(dir) => std::path::PathBuf::from(dir),
        None => ConfigStore::default_config_dir().context("no platform config directory")?,
    };
    let config = ConfigStore::new(config_dir)
        .load()
        .map_err(anyhow::Error::msg)?;
    Ok(ContextService::from_config(config))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("{}", USAGE);
        return Ok(());
    }

    init_logging();
    let service = build_service(&args)?;

    match args[1].as_str() {
        "train" => {
            let Some(path) = args.get(2) else {
                bail!("train needs a samples file\n\n{}", USAGE);
            };
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("read samples failed: {}", path))?;
            let samples: Vec<LabeledSample> =
                serde_json::from_str(&raw).with_context(|| format!("parse samples failed: {}", path))?;

            let response = service.train(TrainRequest { samples }).await?;
            print_json(&response)?;
        }
        "detect" => {
            let Some(text) = args.get(2) else {
                bail!("detect needs text\n\n{}", USAGE);
            };
            service.load_pretrained_or_rules().await;

            let request = DetectRequest {
                text: text.clone(),
                previous_context: parse_arg_value(&args, "--previous"),
                use_ml: !has_flag(&args, "--rule-based"),
            };
            let response = service.detect(request).await?;
            print_json(&response)?;
        }
        "metrics" => {
            let load = service.load_pretrained().await?;
            if !load.loaded {
                bail!("{}", load.message);
            }
            print_json(&service.metrics()?)?;
        }
        other => bail!("unknown command '{}'\n\n{}", other, USAGE),
    }

    Ok(())
}
