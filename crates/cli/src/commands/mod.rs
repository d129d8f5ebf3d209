//! Command implementations.

mod info;
mod simulate;
mod validate;

pub use info::run_info;
pub use simulate::run_simulate;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::SessionBlueprint;

/// Load a session file, or the defaults when no path is given
fn load_blueprint(path: Option<&Path>) -> Result<SessionBlueprint> {
    let Some(path) = path else {
        return Ok(SessionBlueprint::default());
    };

    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
