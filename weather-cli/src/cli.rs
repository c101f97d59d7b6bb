use amap_weather_core::{Config, QueryPipeline};
use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::debug;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Ask about Chinese city weather (AMap)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the AMap API key (and optional connection settings).
    Configure {
        /// Override the API base URL.
        #[arg(long)]
        base_url: Option<String>,

        /// Request timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Answer one or more weather questions, e.g. "北京的天气" "上海明天天气怎么样".
    Ask {
        /// Questions; several are answered concurrently.
        #[arg(required = true)]
        questions: Vec<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { base_url, timeout } => configure(base_url, timeout),
            Command::Ask { questions } => ask(&questions).await,
        }
    }
}

fn configure(base_url: Option<String>, timeout: Option<u64>) -> anyhow::Result<()> {
    let mut cfg = Config::load()?;

    let key = inquire::Password::new("AMap API key:")
        .without_confirmation()
        .with_help_message("Create one at https://console.amap.com (Web 服务)")
        .prompt()
        .context("Failed to read API key")?;
    cfg.set_api_key(key);

    if let Some(url) = base_url {
        cfg.api_base_url = url;
    }
    if let Some(secs) = timeout {
        cfg.timeout_secs = secs;
    }

    let path = cfg.save()?;
    println!("Saved configuration to {}", path.display());

    Ok(())
}

async fn ask(questions: &[String]) -> anyhow::Result<()> {
    let cfg = Config::load()?.with_env_overrides();
    debug!(?cfg, "Loaded configuration");

    if cfg.api_key.is_blank() {
        eprintln!("No API key configured. Hint: run `weather configure` or set AMAP_API_KEY.");
    }

    let pipeline = QueryPipeline::from_config(&cfg)?;
    let answers = pipeline.answer_many(questions).await;

    println!("{}", answers.join("\n\n"));

    Ok(())
}
