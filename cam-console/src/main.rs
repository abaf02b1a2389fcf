//! Interactive terminal console for the camera streaming server.
//!
//! Wires the settings-sync engine to a real HTTP client, renders engine
//! updates as log lines, and feeds it commands read line by line from
//! stdin. Type `help` at the prompt for the command list.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn, Level};

use cam_console_core::{
    Console, ConsoleConfig, ControlEdit, FlipPreset, NoticeKind, Rotation, StreamPhase, Update,
};
use cam_console_shared::camera_api::CameraServerClient;
use cam_console_shared::ColorMode;

#[derive(Parser, Debug)]
#[command(name = "cam-console")]
#[command(about = "Interactive console for the camera streaming server")]
#[command(version)]
struct Args {
    /// Camera server base URL, e.g. http://localhost:5000; overrides the
    /// config file
    #[arg(long)]
    base_url: Option<String>,

    /// JSON config file with engine timing parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

/// A parsed console command.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Edit(ControlEdit),
    Preset(FlipPreset),
    Switch(u32),
    ResetFlip,
    ResetColor,
    ApplyNow,
    Refresh,
    Help,
    Quit,
}

fn load_config(args: &Args) -> Result<ConsoleConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config file {}", path.display()))?
        }
        None => ConsoleConfig::default(),
    };
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    Ok(config)
}

fn parse_on_off(value: Option<&str>) -> Result<bool, String> {
    match value {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        _ => Err("expected 'on' or 'off'".to_string()),
    }
}

fn parse_number<T: std::str::FromStr>(value: Option<&str>, what: &str) -> Result<T, String> {
    value
        .ok_or_else(|| format!("missing {what}"))?
        .parse()
        .map_err(|_| format!("invalid {what}"))
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    match parts.next().unwrap_or("") {
        "yolo" => Ok(Command::Edit(ControlEdit::YoloEnabled(parse_on_off(
            parts.next(),
        )?))),
        "opencv" => Ok(Command::Edit(ControlEdit::OpencvEnabled(parse_on_off(
            parts.next(),
        )?))),
        "fps-overlay" => Ok(Command::Edit(ControlEdit::ShowFps(parse_on_off(
            parts.next(),
        )?))),
        "quality" => Ok(Command::Edit(ControlEdit::Quality(parse_number(
            parts.next(),
            "quality (0-100)",
        )?))),
        "fps" => Ok(Command::Edit(ControlEdit::FpsLimit(parse_number(
            parts.next(),
            "FPS limit",
        )?))),
        "flip" => match parts.next() {
            Some("h") => Ok(Command::Edit(ControlEdit::FlipHorizontal(parse_on_off(
                parts.next(),
            )?))),
            Some("v") => Ok(Command::Edit(ControlEdit::FlipVertical(parse_on_off(
                parts.next(),
            )?))),
            _ => Err("usage: flip h|v on|off".to_string()),
        },
        "rotate" => {
            let degrees: u16 = parse_number(parts.next(), "rotation in degrees")?;
            Rotation::from_degrees(degrees)
                .map(|rotation| Command::Edit(ControlEdit::RotationDeg(rotation)))
                .ok_or_else(|| "rotation must be 0, 90, 180 or 270".to_string())
        }
        "preset" => {
            let preset = match parts.next() {
                Some("normal") => FlipPreset::Normal,
                Some("horizontal") => FlipPreset::Horizontal,
                Some("vertical") => FlipPreset::Vertical,
                Some("both") => FlipPreset::Both,
                Some("rotate180") => FlipPreset::Rotate180,
                _ => {
                    return Err(
                        "expected one of: normal, horizontal, vertical, both, rotate180"
                            .to_string(),
                    )
                }
            };
            Ok(Command::Preset(preset))
        }
        "color" => Ok(Command::Edit(ControlEdit::ColorEnabled(parse_on_off(
            parts.next(),
        )?))),
        "red" => Ok(Command::Edit(ControlEdit::RedReduction(parse_number(
            parts.next(),
            "red reduction factor",
        )?))),
        "green" => Ok(Command::Edit(ControlEdit::GreenBoost(parse_number(
            parts.next(),
            "green boost factor",
        )?))),
        "blue" => Ok(Command::Edit(ControlEdit::BlueBoost(parse_number(
            parts.next(),
            "blue boost factor",
        )?))),
        "mode" => {
            let mode = match parts.next() {
                Some("standard") => ColorMode::Standard,
                Some("warm") => ColorMode::Warm,
                Some("cool") => ColorMode::Cool,
                Some("night") => ColorMode::Night,
                _ => return Err("expected one of: standard, warm, cool, night".to_string()),
            };
            Ok(Command::Edit(ControlEdit::Mode(mode)))
        }
        "camera" => Ok(Command::Switch(parse_number(parts.next(), "camera index")?)),
        "reset" => match parts.next() {
            Some("flip") => Ok(Command::ResetFlip),
            Some("color") => Ok(Command::ResetColor),
            _ => Err("usage: reset flip|color".to_string()),
        },
        "apply" => Ok(Command::ApplyNow),
        "refresh" => Ok(Command::Refresh),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command '{other}'; type 'help'")),
    }
}

fn print_help() {
    println!("commands:");
    println!("  yolo|opencv|fps-overlay on|off   toggle detection / overlay features");
    println!("  quality <0-100>                  JPEG stream quality");
    println!("  fps <n>                          stream FPS limit");
    println!("  flip h|v on|off                  mirror the image");
    println!("  rotate 0|90|180|270              rotate the image");
    println!("  preset <name>                    normal, horizontal, vertical, both, rotate180");
    println!("  color on|off                     toggle color correction");
    println!("  red|green|blue <factor>          color channel adjustment");
    println!("  mode <name>                      standard, warm, cool, night");
    println!("  camera <index>                   switch the active camera");
    println!("  reset flip|color                 restore a settings group to defaults");
    println!("  apply                            push all pending edits now");
    println!("  refresh                          force a stream reconnect");
    println!("  quit                             exit");
}

fn render_update(update: &Update) {
    match update {
        Update::Notice { kind, text } => match kind {
            NoticeKind::Error => error!("{text}"),
            NoticeKind::Success | NoticeKind::Info => info!("{text}"),
        },
        Update::ActiveCamera(identity) => info!("active camera: {identity}"),
        Update::Controls(controls) => debug!("controls now {controls:?}"),
        Update::StreamTarget { url } => debug!("stream target {url}"),
        Update::StreamHealth(phase) => match phase {
            StreamPhase::Healthy => info!("stream healthy"),
            StreamPhase::Retrying => warn!("stream interrupted, reconnecting shortly"),
            StreamPhase::Backoff(failures) => {
                warn!("stream down ({failures} consecutive failures), backing off")
            }
        },
        Update::Status(status) => debug!(
            "status: connected={} streaming={} fps={:?}",
            status.camera_connected, status.streaming, status.current_fps
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = load_config(&args)?;
    let api = Arc::new(CameraServerClient::new(
        &config.base_url,
        config.dispatch_timeout(),
    ));
    info!("camera console for {}", config.base_url);
    let (handle, mut updates) = Console::start(api, config)?;

    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            maybe_update = updates.recv() => match maybe_update {
                Some(update) => render_update(&update),
                None => {
                    error!("engine stopped unexpectedly");
                    break;
                }
            },
            maybe_line = lines.next_line() => match maybe_line? {
                Some(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match parse_command(line) {
                        Ok(Command::Quit) => break,
                        Ok(Command::Help) => print_help(),
                        Ok(Command::Edit(edit)) => handle.edit(edit),
                        Ok(Command::Preset(preset)) => handle.set_flip_preset(preset),
                        Ok(Command::Switch(index)) => handle.switch_camera(index),
                        Ok(Command::ResetFlip) => handle.reset_flip(),
                        Ok(Command::ResetColor) => handle.reset_color(),
                        Ok(Command::ApplyNow) => handle.apply_now(),
                        Ok(Command::Refresh) => handle.refresh_stream(),
                        Err(message) => warn!("{message}"),
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received");
                break;
            }
        }
    }

    handle.shutdown().await?;
    Ok(())
}
