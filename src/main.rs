use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Builder, Env};
use log::info;

use orbit_bloom::{config::DemoConfig, DemoApp};

/// HDR + bloom demo: a lit building under eight orbiting emissive lights
#[derive(Parser, Debug)]
#[command(name = "orbit-bloom", version, about)]
struct Cli {
    /// TOML config file; built-in defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Asset root directory, overrides `assets.root` from the config
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Present without waiting for vertical sync
    #[arg(long)]
    no_vsync: bool,
}

fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("wgpu_hal", log::LevelFilter::Error)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DemoConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DemoConfig::default(),
    };
    if let Some(assets) = cli.assets {
        config.assets.root = assets;
    }
    if cli.no_vsync {
        config.window.vsync = false;
    }
    info!("asset root: {}", config.assets.root.display());

    let app = DemoApp::new(config).context("failed to start the demo")?;
    app.run()?;
    Ok(())
}
