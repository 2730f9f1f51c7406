use anyhow::{Context, Result};
use std::fs;
use swing_analyzer::config::Config;
use swing_analyzer::pose::{PoseSequence, SequenceRecord};
use swing_analyzer::SwingAnalyzer;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: swing-analyze <landmarks.json> [config.toml]")?;
    let config_path = std::env::args().nth(2).unwrap_or_else(|| CONFIG_PATH.to_string());

    info!("Swing Analyzer ({})", env!("GIT_VERSION"));
    let config = Config::load_or_default(&config_path);

    // ランドマーク JSON → PoseSequence
    let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?;
    let record: SequenceRecord =
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path))?;
    let sequence = PoseSequence::try_from(record).with_context(|| format!("Invalid sequence in {}", path))?;
    info!("{} frames at {:.1} fps", sequence.len(), sequence.fps());

    let analysis = SwingAnalyzer::new(&config)
        .analyze(&sequence)
        .with_context(|| format!("Failed to analyze {}", path))?;

    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}
