use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use std::{fs::OpenOptions, path::Path};

pub(crate) const LOG_ENV: &str = "STARFOLIO_LOG";

/// Sends log output to `path`; the alternate screen owns stdout and stderr
/// while the scene is up.
pub(crate) fn init(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("could not open log file {}", path.display()))?;
    Builder::from_env(Env::default().filter_or(LOG_ENV, "info"))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .context("logger already initialised")?;
    Ok(())
}
