use anyhow::{Context, Result};
use restless_app::renderer::Renderer;
use restless_app::terminal::TerminalRenderer;
use restless_core::{LifeConfig, LifeWorld};
use tracing::info;

fn main() -> Result<()> {
    init_tracing();
    let config = config_from_env();
    info!(
        width = config.width,
        height = config.height,
        seed = ?config.rng_seed,
        "Starting Restless Life"
    );
    let world = LifeWorld::new(config).context("failed to build world from configuration")?;
    TerminalRenderer::default().run(world)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

/// Assembles the engine configuration from the environment.
///
/// Board dimensions default to the detected terminal size minus the UI
/// chrome; `RESTLESS_WIDTH`, `RESTLESS_HEIGHT`, and `RESTLESS_SEED`
/// override. The core itself reads no environment at all.
fn config_from_env() -> LifeConfig {
    let (term_width, term_height) = crossterm::terminal::size().unwrap_or((80, 24));
    // Sidebar is 42 columns wide; header and borders eat 5 rows.
    let default_width = u32::from(term_width).saturating_sub(44).max(16);
    let default_height = u32::from(term_height).saturating_sub(5).max(8);

    LifeConfig {
        width: env_value("RESTLESS_WIDTH").unwrap_or(default_width),
        height: env_value("RESTLESS_HEIGHT").unwrap_or(default_height),
        rng_seed: env_value("RESTLESS_SEED"),
        ..LifeConfig::default()
    }
}

fn env_value<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<T>().ok())
}
