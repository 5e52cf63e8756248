//! ren viewer
//!
//! Opens a window, bootstraps a Vulkan context for it and keeps the swapchain
//! in step with the window size until the window is closed.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p ren-viewer -- [OPTIONS]
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod app;

use std::path::PathBuf;

use anyhow::{bail, Context};
use ren_app::{run_app, AppConfig};

use crate::app::Viewer;

const DEFAULT_CONFIG: &str = "ren.toml";

/// Command line options. Flags override values from the config file.
#[derive(Debug, Default, PartialEq, Eq)]
struct ViewerArgs {
    help: bool,
    config: Option<PathBuf>,
    width: Option<u32>,
    height: Option<u32>,
    validation: Option<bool>,
    vsync: bool,
}

impl ViewerArgs {
    fn parse(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut parsed = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => parsed.help = true,
                "--config" => {
                    let path = args.next().context("--config needs a path")?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "--width" => parsed.width = Some(parse_dimension("--width", args.next())?),
                "--height" => parsed.height = Some(parse_dimension("--height", args.next())?),
                "--validation" => parsed.validation = Some(true),
                "--no-validation" => parsed.validation = Some(false),
                "--vsync" => parsed.vsync = true,
                other => bail!("Unknown argument: {other} (see --help)"),
            }
        }

        Ok(parsed)
    }

    fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        if let Some(validation) = self.validation {
            config.gpu.validation = validation;
        }
        if self.vsync {
            config.gpu.vsync = true;
        }
        config
    }
}

fn parse_dimension(flag: &str, value: Option<String>) -> anyhow::Result<u32> {
    let value = value.with_context(|| format!("{flag} needs a value"))?;
    let parsed: u32 = value
        .parse()
        .with_context(|| format!("{flag}: invalid value {value:?}"))?;
    if parsed == 0 {
        bail!("{flag} must be greater than zero");
    }
    Ok(parsed)
}

fn main() -> anyhow::Result<()> {
    let args = ViewerArgs::parse(std::env::args().skip(1))?;
    if args.help {
        print_help();
        return Ok(());
    }

    // Logging must be up before the config file is read so its messages show
    ren_app::init_logging();

    let path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = AppConfig::load_from_path(&path)?;

    run_app::<Viewer>(args.apply(config))
}

fn print_help() {
    eprintln!(
        "ren viewer

USAGE:
    cargo run -p ren-viewer -- [OPTIONS]

OPTIONS:
    --config <PATH>     Config file (default: {DEFAULT_CONFIG}; missing file uses defaults)
    --width <N>         Initial window width
    --height <N>        Initial window height
    --validation        Enable Vulkan validation layers
    --no-validation     Disable Vulkan validation layers
    --vsync             Force FIFO presentation
    -h, --help          Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG            Set log level (e.g., info, debug, trace)"
    );
}
