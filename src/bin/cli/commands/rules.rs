use anyhow::{Context, Result};

use crate::app::App;

pub fn run(app: &App) -> Result<()> {
    let toml = app
        .config
        .to_toml_string()
        .context("Failed to serialize config")?;
    print!("{}", toml);
    Ok(())
}
