mod app;
mod billboard;
mod camera;
mod config;
mod content;
mod input;
mod logging;
mod math;
mod render;
mod scene;
mod scroll;
mod section;
mod shell;
mod text;
mod texture;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    app::run(config::Cli::parse())
}
