use clap::Parser;
use rill_core::{bind, to_native, Engine, HandlerSet, RuntimeConfig, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "rill")]
#[command(about = "Run a bound rill program", long_about = None)]
struct Cli {
    /// Path to the parser's JSON program tree
    program: PathBuf,

    /// Path to a JSON object of input variables
    #[arg(short, long)]
    inputs: Option<PathBuf>,

    /// Path to a TOML runtime configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the original source text, for parse diagnostics
    #[arg(short, long)]
    source: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RuntimeConfig::load(path)?,
        None => {
            let mut config = RuntimeConfig::default();
            config.apply_env();
            config
        }
    };

    let tree: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&cli.program)?)?;
    let source = match &cli.source {
        Some(path) => Some(std::fs::read_to_string(path)?),
        None => None,
    };
    let program = bind(&tree, source.as_deref()).map_err(|e| anyhow::anyhow!("{}", e))?;

    let inputs: HashMap<String, serde_json::Value> = match &cli.inputs {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => HashMap::new(),
    };

    let engine = Engine::new(config, HandlerSet::defaults());
    let cancel = CancellationToken::new();

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    let result = engine
        .run(&program, &inputs, &cancel)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    if result != Value::Void {
        println!("{}", serde_json::to_string_pretty(&to_native(&result))?);
    }
    Ok(())
}
