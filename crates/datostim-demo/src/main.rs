mod assets;
mod program;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use datostim_engine::core::run_recorded;
use datostim_engine::device::GpuInit;
use datostim_engine::logging::{LoggingConfig, init_logging};
use datostim_engine::stim::StimConfig;
use datostim_engine::window::{Runtime, RuntimeConfig};

use assets::Assets;
use program::Program;

const DRY_RUN_TICKS: u32 = 3;

/// Multi-screen stimulus demo.
#[derive(Parser, Debug, Clone)]
#[command(name = "datostim-demo", version)]
struct Args {
    /// Directory holding the raw matrix, mesh and texture files.
    #[arg(default_value = "data")]
    data_dir: PathBuf,

    /// Run a few ticks against a recording backend instead of opening a window.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let args = Args::parse();
    let assets = Assets::load(&args.data_dir)
        .with_context(|| format!("loading stimulus data from {}", args.data_dir.display()))?;

    let stim_config = StimConfig::default();
    let mut program = Program::new(assets, stim_config.square_color);
    let runtime_config = RuntimeConfig::default();

    if args.dry_run {
        let backend = run_recorded(stim_config, &mut program, DRY_RUN_TICKS, runtime_config.timer)?;
        for (i, batch) in backend.submissions().iter().enumerate() {
            log::info!("submission {i}: {} requests", batch.len());
        }
        return Ok(());
    }

    Runtime::run(runtime_config, GpuInit::default(), stim_config, program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_defaults_to_data() {
        let args = Args::try_parse_from(["datostim-demo"]).unwrap();
        assert_eq!(args.data_dir, PathBuf::from("data"));
        assert!(!args.dry_run);
    }

    #[test]
    fn positional_dir_and_dry_run() {
        let args = Args::try_parse_from(["datostim-demo", "--dry-run", "stimuli"]).unwrap();
        assert_eq!(args.data_dir, PathBuf::from("stimuli"));
        assert!(args.dry_run);
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(Args::try_parse_from(["datostim-demo", "--fullscreen"]).is_err());
        assert!(Args::try_parse_from(["datostim-demo", "a", "b"]).is_err());
    }
}
