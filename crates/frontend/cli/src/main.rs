mod screenshot;
mod settings;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use engine_demo::DemoEngine;
use host_core::logging::{LogConfig, LogLevel};
use host_core::sim::{
    ScriptedTouch, SdramFault, SimBoard, SimDisplay, SimSdram, PANEL_HEIGHT, PANEL_WIDTH,
    SDRAM_BASE, SDRAM_SIZE,
};
use host_core::{BlitGeometry, Engine, HostContext, RunLimit, TouchState};
use settings::Settings;
use std::fs;
use std::path::PathBuf;

/// Fault injected into the simulated SDRAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FaultArg {
    None,
    StuckBit,
    Alias,
    WriteError,
    ReadError,
}

impl FaultArg {
    fn to_fault(self) -> SdramFault {
        match self {
            FaultArg::None => SdramFault::None,
            FaultArg::StuckBit => SdramFault::StuckBit { bit: 0 },
            FaultArg::Alias => SdramFault::AddressAlias { mask: 0x3F },
            FaultArg::WriteError => SdramFault::WriteError,
            FaultArg::ReadError => SdramFault::ReadError,
        }
    }
}

fn parse_point(s: &str) -> Result<(u16, u16), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {:?}", s))?;
    let x = x.trim().parse().map_err(|e| format!("bad x: {}", e))?;
    let y = y.trim().parse().map_err(|e| format!("bad y: {}", e))?;
    Ok((x, y))
}

#[derive(Parser, Debug)]
#[command(name = "fbhost", about = "Run the framebuffer host on simulated peripherals")]
struct Args {
    /// Program image; defaults to the one in the settings file, then the
    /// built-in demo image
    #[arg(long)]
    rom: Option<PathBuf>,

    /// Number of frames to run (0 = until interrupted)
    #[arg(long)]
    frames: Option<u64>,

    /// Integer blit scale; re-centers the frame unless offsets are given
    #[arg(long)]
    scale: Option<u32>,

    #[arg(long)]
    offset_x: Option<u32>,

    #[arg(long)]
    offset_y: Option<u32>,

    /// How long the boot status screen stays up
    #[arg(long)]
    splash_ms: Option<u32>,

    #[arg(long, value_enum, default_value_t = FaultArg::None)]
    sdram_fault: FaultArg,

    /// Hold a touch at X,Y for the whole run
    #[arg(long, value_parser = parse_point)]
    touch: Option<(u16, u16)>,

    /// Write the final panel contents as PNG
    #[arg(long)]
    screenshot: Option<PathBuf>,

    /// Write the boot report and run outcome as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// off, error, warn, info, debug or trace
    #[arg(long)]
    log_level: Option<String>,

    /// Settings file (default: fbhost.json next to the executable)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective settings back to the settings file
    #[arg(long, default_value_t = false)]
    save_config: bool,

    /// Use the linked C engine instead of the demo engine
    #[cfg(feature = "extern-engine")]
    #[arg(long, default_value_t = false)]
    extern_engine: bool,
}

/// Fold command-line overrides into the loaded settings.
fn apply_overrides(settings: &mut Settings, args: &Args) -> Result<()> {
    if let Some(frames) = args.frames {
        settings.frames = frames;
    }
    if let Some(level) = &args.log_level {
        settings.log_level = level.clone();
    }
    if let Some(splash_ms) = args.splash_ms {
        settings.host.splash_ms = splash_ms;
    }
    if let Some(rom) = &args.rom {
        settings.last_rom_path = Some(rom.display().to_string());
    }

    let blit = &mut settings.host.blit;
    if let Some(scale) = args.scale {
        *blit = if args.offset_x.is_none() && args.offset_y.is_none() {
            BlitGeometry::centered(PANEL_WIDTH, PANEL_HEIGHT, scale)?
        } else {
            BlitGeometry::new(blit.offset_x, blit.offset_y, scale)?
        };
    }
    if let Some(x) = args.offset_x {
        blit.offset_x = x;
    }
    if let Some(y) = args.offset_y {
        blit.offset_y = y;
    }
    Ok(())
}

fn init_logging(level_name: &str) -> Result<()> {
    let level = LogLevel::from_str(level_name)
        .ok_or_else(|| anyhow!("unknown log level: {}", level_name))?;
    LogConfig::global().set_global_level(level);
    log::set_max_level(level.to_level_filter());
    Ok(())
}

/// The linked C engine, or the demo engine with the image from `--rom` or the
/// settings file, or the built-in image.
#[cfg_attr(not(feature = "extern-engine"), allow(unused_variables))]
fn build_engine(args: &Args, settings: &Settings) -> Result<Box<dyn Engine>> {
    #[cfg(feature = "extern-engine")]
    if args.extern_engine {
        let engine = engine_ffi::ExternEngine::take()
            .ok_or_else(|| anyhow!("extern engine already in use"))?;
        return Ok(Box::new(engine));
    }

    // apply_overrides has already copied --rom into the settings
    Ok(match &settings.last_rom_path {
        Some(path) => {
            let image = fs::read(path).with_context(|| format!("reading {}", path))?;
            log::info!("loaded {} ({} bytes)", path, image.len());
            Box::new(DemoEngine::new(image))
        }
        None => Box::new(DemoEngine::builtin()),
    })
}

fn build_board(args: &Args) -> SimBoard {
    let touch = match args.touch {
        Some((x, y)) => ScriptedTouch::new([TouchState::at(x, y)]),
        None => ScriptedTouch::idle(),
    };
    SimBoard::with_parts(
        SimDisplay::new(PANEL_WIDTH, PANEL_HEIGHT),
        SimSdram::new(SDRAM_BASE, SDRAM_SIZE).with_fault(args.sdram_fault.to_fault()),
        touch,
    )
}

fn main() -> Result<()> {
    let args = Args::parse();

    // The effective level is applied once settings are known
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Trace)
        .parse_default_env()
        .init();
    log::set_max_level(log::LevelFilter::Warn);

    let config_path = args.config.clone().unwrap_or_else(Settings::config_path);
    let mut settings = Settings::load_from(&config_path);
    apply_overrides(&mut settings, &args)?;
    init_logging(&settings.log_level)?;

    if args.save_config {
        settings
            .save_to(&config_path)
            .with_context(|| format!("saving {}", config_path.display()))?;
        log::info!("settings saved to {}", config_path.display());
    }

    let engine = build_engine(&args, &settings)?;
    let mut host = HostContext::new(build_board(&args), engine, settings.host.clone())?;
    let report = host.boot().clone();
    if !report.all_passed() {
        log::warn!("boot finished with failures");
    }

    let limit = match settings.frames {
        0 => RunLimit::Forever,
        n => RunLimit::Frames(n),
    };
    let outcome = host.run(limit)?;
    println!("{:?} after {} frames", outcome, host.frame_counter());

    if let Some(path) = &args.screenshot {
        let display = &host.board().display;
        screenshot::save_png(path, PANEL_WIDTH, PANEL_HEIGHT, display.pixels())
            .with_context(|| format!("writing {}", path.display()))?;
    }

    if let Some(path) = &args.report {
        let json = serde_json::json!({
            "boot": report,
            "outcome": outcome,
            "frames": host.frame_counter(),
            "state": host.debug_state(),
        });
        fs::write(path, serde_json::to_string_pretty(&json)?)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    Ok(())
}
