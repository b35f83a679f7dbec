use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use sidwire::config::Config;
use sidwire::player::sid_file::{compute_hvsc_md5, load_sid};
use sidwire::player::{spawn_player, PlayState, PlayerCmd};
use sidwire::sid_device::create_device;

/// Set from the signal handler; polled by the main loop.
static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

// ─────────────────────────────────────────────────────────────────────────────
//  CLI argument helpers
// ─────────────────────────────────────────────────────────────────────────────

const USAGE: &str = "\
usage: sidwire <tune.sid> [options]

  --song N          subsong to play (1-based, default: the tune's start song)
  --engine NAME     output engine: auto, spi, usb or null
  --device PATH     spidev node for the spi engine
  --seconds N       stop after N seconds
  --save-config     write the effective settings to the config file";

#[derive(Debug, Default, PartialEq)]
struct Args {
    path: PathBuf,
    song: Option<u16>,
    engine: Option<String>,
    device: Option<String>,
    seconds: Option<u64>,
    save_config: bool,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args::default();
    let mut path = None;
    let mut it = args.iter();

    while let Some(arg) = it.next() {
        let mut value = |name: &str| {
            it.next()
                .cloned()
                .ok_or_else(|| format!("{name} needs a value"))
        };
        match arg.as_str() {
            "--song" => {
                let v = value("--song")?;
                parsed.song = Some(v.parse().map_err(|_| format!("Bad song number {v:?}"))?);
            }
            "--engine" => parsed.engine = Some(value("--engine")?),
            "--device" => parsed.device = Some(value("--device")?),
            "--seconds" => {
                let v = value("--seconds")?;
                parsed.seconds = Some(v.parse().map_err(|_| format!("Bad duration {v:?}"))?);
            }
            "--save-config" => parsed.save_config = true,
            "-h" | "--help" => return Err(USAGE.to_string()),
            s if s.starts_with("--") => return Err(format!("Unknown option {s}\n\n{USAGE}")),
            s => {
                if path.is_some() {
                    return Err(format!("Only one tune can be played, got {s:?} as well"));
                }
                path = Some(PathBuf::from(s));
            }
        }
    }

    parsed.path = path.ok_or_else(|| USAGE.to_string())?;
    Ok(parsed)
}

/// Zero-based song index from a 1-based command-line number.
fn select_song(requested: Option<u16>, songs: u16, default: u8) -> Result<u8, String> {
    // A is eight bits wide; a header claiming more songs is capped.
    let songs = songs.min(256);
    match requested {
        None => Ok(default),
        Some(n) if n >= 1 && n <= songs => Ok((n - 1) as u8),
        Some(n) => Err(format!("Song {n} out of range (tune has {songs})")),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
//  Signals
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(unix)]
fn install_signal_handlers() {
    extern "C" fn on_signal(_: libc::c_int) {
        STOP_REQUESTED.store(true, Ordering::SeqCst);
    }
    // SAFETY: the handler only stores to an atomic, which is async-signal-safe.
    unsafe {
        libc::signal(libc::SIGINT, on_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, on_signal as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
fn install_signal_handlers() {}

// ─────────────────────────────────────────────────────────────────────────────
//  Entry point
// ─────────────────────────────────────────────────────────────────────────────

fn run(args: Args) -> Result<(), String> {
    let mut config = Config::load();
    if let Some(engine) = args.engine {
        config.output_engine = engine;
    }
    if let Some(device) = args.device {
        config.spi_device = device;
    }
    if args.save_config {
        config.save()?;
    }

    let data = std::fs::read(&args.path)
        .map_err(|e| format!("Cannot read {}: {e}", args.path.display()))?;
    let sid = load_sid(&data)?;
    let header = &sid.header;
    log::info!(
        "\"{}\" by {} ({}) [{} v{}, {}]",
        header.name,
        header.author,
        header.released,
        header.magic,
        header.version,
        if header.is_pal { "PAL" } else { "NTSC" },
    );
    log::debug!("HVSC md5 {}", compute_hvsc_md5(&sid));
    if header.is_rsid {
        log::warn!("RSID tune: only the init/play convention is emulated, it may not play");
    }

    let song = select_song(args.song, header.songs, sid.start_song())?;
    log::info!("Song {}/{}", song as u16 + 1, header.songs);

    let device = create_device(&config)?;
    let (cmd_tx, status_rx, handle) = spawn_player(sid, song, device, config)?;
    install_signal_handlers();

    let started = Instant::now();
    let limit = args.seconds.map(Duration::from_secs);
    let mut failure = None;

    loop {
        if STOP_REQUESTED.load(Ordering::SeqCst) {
            log::info!("Interrupted");
            break;
        }
        if limit.is_some_and(|l| started.elapsed() >= l) {
            break;
        }
        match status_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(status) => {
                if status.state == PlayState::Stopped {
                    failure = status.error;
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                failure = Some("Player thread exited unexpectedly".into());
                break;
            }
        }
    }

    let _ = cmd_tx.send(PlayerCmd::Quit);
    if handle.join().is_err() {
        return Err("Player thread panicked".into());
    }
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let result = parse_args(&argv).and_then(run);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[sidwire] {e}");
            ExitCode::from(1)
        }
    }
}
