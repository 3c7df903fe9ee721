use crate::content::SECTION_COUNT;
use crate::scroll::ScrollTuning;
use crate::text::RoomPolicy;
use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) fps_cap: u32,
    /// Canvas texels per cell, a whole number.
    pub(crate) dpr: f32,
    pub(crate) star_count: usize,
    pub(crate) seed: u64,
    pub(crate) parallax: bool,
    pub(crate) room_policy: RoomPolicy,
    /// Share of the screen the active sprite settles at.
    pub(crate) sprite_fraction: f32,
    pub(crate) start_section: usize,
    pub(crate) scroll: ScrollTuning,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps_cap: 60,
            dpr: 1.0,
            star_count: 1800,
            seed: 0x5741_5246_u64,
            parallax: true,
            room_policy: RoomPolicy::Either,
            sprite_fraction: 0.9,
            start_section: 0,
            scroll: ScrollTuning::default(),
        }
    }
}

impl Settings {
    /// Pulls hand-edited values back into workable ranges.
    pub(crate) fn sanitized(mut self) -> Self {
        self.fps_cap = self.fps_cap.clamp(10, 240);
        if !self.dpr.is_finite() {
            self.dpr = 1.0;
        }
        self.dpr = self.dpr.round().clamp(1.0, 4.0);
        self.star_count = self.star_count.min(20_000);
        if !self.sprite_fraction.is_finite() {
            self.sprite_fraction = 0.9;
        }
        self.sprite_fraction = self.sprite_fraction.clamp(0.3, 1.0);
        if self.start_section >= SECTION_COUNT {
            self.start_section = 0;
        }
        self.scroll = self.scroll.sanitized();
        self
    }
}

pub(crate) struct Paths {
    pub(crate) settings_path: PathBuf,
    pub(crate) log_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "starfolio", "Starfolio")
        .context("could not resolve project directories")?;
    let config_dir = proj.config_dir().to_path_buf();
    let data_dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&config_dir).ok();
    fs::create_dir_all(&data_dir).ok();
    Ok(Paths {
        settings_path: config_dir.join("settings.json"),
        log_path: data_dir.join("starfolio.log"),
    })
}

pub(crate) fn load_settings(path: &Path) -> Settings {
    if let Ok(s) = fs::read_to_string(path) {
        if let Ok(v) = serde_json::from_str::<Settings>(&s) {
            return v.sanitized();
        }
    }
    Settings::default()
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data).with_context(|| format!("could not write {}", tmp.display()))?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn atomic_rename(from: &Path, to: &Path) -> Result<()> {
    if to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to).with_context(|| format!("could not replace {}", to.display()))?;
    Ok(())
}

/* -----------------------------
   Command line
------------------------------ */

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "starfolio")]
#[command(about = "Portfolio sections floating in a terminal starfield", long_about = None)]
pub(crate) struct Cli {
    /// FPS cap
    #[arg(long)]
    pub(crate) fps: Option<u32>,

    /// Canvas texels per terminal cell, 1-4 (sharper text when the sprite is large)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
    pub(crate) dpr: Option<u8>,

    /// Number of background stars
    #[arg(long)]
    pub(crate) stars: Option<usize>,

    /// Starfield seed
    #[arg(long)]
    pub(crate) seed: Option<u64>,

    /// Section to open first, 1-4
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
    pub(crate) section: Option<u8>,

    /// JSON file replacing the built-in section text
    #[arg(long)]
    pub(crate) content: Option<PathBuf>,

    /// Which viewport size counts as "more room" for text
    #[arg(long, value_enum)]
    pub(crate) room_policy: Option<RoomPolicy>,

    /// Keep the camera still when the mouse moves
    #[arg(long, default_value_t = false)]
    pub(crate) no_parallax: bool,

    /// Write the effective settings back to the settings file
    #[arg(long, default_value_t = false)]
    pub(crate) save_settings: bool,
}

impl Cli {
    pub(crate) fn apply(&self, settings: Settings) -> Settings {
        let mut s = settings;
        if let Some(v) = self.fps {
            s.fps_cap = v;
        }
        if let Some(v) = self.dpr {
            s.dpr = v as f32;
        }
        if let Some(v) = self.stars {
            s.star_count = v;
        }
        if let Some(v) = self.seed {
            s.seed = v;
        }
        if let Some(v) = self.section {
            s.start_section = v as usize - 1;
        }
        if let Some(v) = self.room_policy {
            s.room_policy = v;
        }
        if self.no_parallax {
            s.parallax = false;
        }
        s.sanitized()
    }
}
