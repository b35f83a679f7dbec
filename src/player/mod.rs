// Background player engine. Runs in its own thread, driven by the CLI over
// crossbeam channels. Each tick calls the tune's play routine on the
// emulated 6510; the SID writes it makes go straight to the output device.

pub mod sid_file;

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, tick, Receiver, Sender, TryRecvError};

use crate::c64::sid_port::SID_VOL_REG;
use crate::c64::{SidPort, CIA1_TIMER_A_HI, CIA1_TIMER_A_LO, IRQ_VECTOR};
use crate::config::Config;
use crate::mos6510::Cpu;
use crate::sid_device::{DevicePort, SidDevice};
use sid_file::SidFile;

/// CIA 1 timer A latch that yields one play call per PAL frame.
const PAL_FRAME_LATCH: u64 = 0x4C00;
/// Interval matching [`PAL_FRAME_LATCH`].
const PAL_FRAME_US: u64 = 20_000;
/// Fastest play rate accepted from a tune's timer setting.
const MIN_REFRESH_US: u64 = 1_000;

// ─────────────────────────────────────────────────────────────────────────────
//  Public message types
// ─────────────────────────────────────────────────────────────────────────────

/// Commands sent from CLI → player thread.
#[derive(Debug, Clone)]
pub enum PlayerCmd {
    /// Restart with another zero-based subsong.
    SetSubtune(u8),
    TogglePause,
    Stop,
    Quit,
}

/// Status updates sent from player thread → CLI.
#[derive(Debug, Clone)]
pub struct PlayerStatus {
    pub state: PlayState,
    /// Zero-based subsong.
    pub song: u8,
    pub frames: u64,
    pub elapsed: Duration,
    pub refresh_us: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Playing,
    Paused,
}

// ─────────────────────────────────────────────────────────────────────────────
//  Timing helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Play-call interval for a CIA 1 timer A latch value.
///
/// A latch of 0 means the tune never programmed the timer; the current
/// interval is kept.
pub fn refresh_interval_us(latch: u16, current_us: u64) -> u64 {
    if latch == 0 {
        return current_us;
    }
    (PAL_FRAME_US * latch as u64 / PAL_FRAME_LATCH).max(MIN_REFRESH_US)
}

/// Wait until `deadline` using sleep for bulk + spin for precision.
/// Sleeps most of the duration, then spin-waits the last ~1ms for
/// sub-millisecond accuracy without burning 100% CPU.
fn wait_until(deadline: Instant) {
    let now = Instant::now();
    if now >= deadline {
        return;
    }
    let remaining = deadline - now;
    // Sleep granularity is ~1ms on most OSes
    if remaining > Duration::from_micros(1500) {
        thread::sleep(remaining - Duration::from_micros(1000));
    }
    while Instant::now() < deadline {
        std::hint::spin_loop();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
//  6510 runner
// ─────────────────────────────────────────────────────────────────────────────

/// Call the routine at `entry` with A = `a` and run it to its RTS.
///
/// With a `budget`, give up once that many instructions have run without
/// the routine returning. Returns the number of instructions executed.
pub fn call<S: SidPort>(
    cpu: &mut Cpu<S>,
    entry: u16,
    a: u8,
    budget: Option<u64>,
) -> Result<u64, String> {
    let Some(max_steps) = budget else {
        return Ok(cpu.run_subroutine(entry, a));
    };

    cpu.enter_subroutine(entry, a);
    let mut steps = 0u64;
    while cpu.in_subroutine() {
        if steps >= max_steps {
            return Err(format!(
                "Routine at ${entry:04X} still running after {max_steps} steps (PC=${:04X})",
                cpu.regs.pc,
            ));
        }
        cpu.step();
        steps += 1;
    }
    Ok(steps)
}

// ─────────────────────────────────────────────────────────────────────────────
//  Playback session
// ─────────────────────────────────────────────────────────────────────────────

/// One emulated C64 playing one tune.
pub struct Session<S: SidPort> {
    cpu: Cpu<S>,
    init_address: u16,
    play_address: u16,
    song: u8,
    loaded: bool,
    frames: u64,
    refresh_us: u64,
    frame_us: u64,
    follow_cia_timer: bool,
    initial_volume: u8,
    init_budget: Option<u64>,
    play_budget: Option<u64>,
}

impl<S: SidPort> Session<S> {
    pub fn new(port: S, config: &Config) -> Self {
        Self {
            cpu: Cpu::new(port),
            init_address: 0,
            play_address: 0,
            song: 0,
            loaded: false,
            frames: 0,
            refresh_us: config.frame_us,
            frame_us: config.frame_us,
            follow_cia_timer: config.follow_cia_timer,
            initial_volume: config.initial_volume,
            init_budget: config.init_budget(),
            play_budget: config.play_budget(),
        }
    }

    /// Silence the chip, install `sid` into fresh memory and run its init
    /// routine for `song` (zero-based).
    pub fn load(&mut self, sid: &SidFile, song: u8) -> Result<(), String> {
        self.loaded = false;
        self.frames = 0;
        // The stock 50 Hz interval gives way to the tune's own video standard.
        self.refresh_us = if self.frame_us == PAL_FRAME_US {
            sid.header.frame_us()
        } else {
            self.frame_us
        };
        self.cpu.memory.clear();
        self.cpu.reset();

        let port = self.cpu.memory.sid_mut();
        for reg in 0..=SID_VOL_REG {
            port.poke(reg, 0);
        }

        sid.install(&mut self.cpu)?;

        let init = sid.init_address();
        let play = match sid.play_address() {
            0 => self.discover_play_address(init)?,
            addr => addr,
        };

        self.cpu
            .memory
            .sid_mut()
            .poke(SID_VOL_REG, self.initial_volume & 0x0F);

        let steps = call(&mut self.cpu, init, song, self.init_budget)
            .map_err(|e| format!("Init failed: {e}"))?;
        log::info!(
            "Init ${init:04X} song {} done in {steps} steps, play=${play:04X}",
            song as u16 + 1,
        );

        self.init_address = init;
        self.play_address = play;
        self.song = song;
        self.loaded = true;
        Ok(())
    }

    /// Play address 0: run init once and take the IRQ handler it installs.
    fn discover_play_address(&mut self, init: u16) -> Result<u16, String> {
        call(&mut self.cpu, init, 0, self.init_budget)
            .map_err(|e| format!("Init failed while locating play routine: {e}"))?;
        let addr = self.cpu.memory.read_word(IRQ_VECTOR);
        if addr == 0 {
            return Err(format!(
                "No play address: header has none and init left ${IRQ_VECTOR:04X} empty"
            ));
        }
        log::debug!("Play routine taken from IRQ vector: ${addr:04X}");
        Ok(addr)
    }

    /// Call the play routine once, then pick up the tune's timer setting.
    /// Returns the number of instructions executed.
    pub fn play_frame(&mut self) -> Result<u64, String> {
        if !self.loaded {
            return Err("No tune loaded".into());
        }
        let result = call(&mut self.cpu, self.play_address, 0, self.play_budget);
        self.frames += 1;

        if self.follow_cia_timer {
            let latch = u16::from_le_bytes([
                self.cpu.read_byte(CIA1_TIMER_A_LO),
                self.cpu.read_byte(CIA1_TIMER_A_HI),
            ]);
            let refresh = refresh_interval_us(latch, self.refresh_us);
            if refresh != self.refresh_us {
                log::debug!("CIA timer ${latch:04X}: play every {refresh} µs");
                self.refresh_us = refresh;
            }
        }
        result
    }

    pub fn init_address(&self) -> u16 {
        self.init_address
    }

    pub fn play_address(&self) -> u16 {
        self.play_address
    }

    pub fn song(&self) -> u8 {
        self.song
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn refresh_us(&self) -> u64 {
        self.refresh_us
    }

    pub fn cpu(&self) -> &Cpu<S> {
        &self.cpu
    }

    pub fn port_mut(&mut self) -> &mut S {
        self.cpu.memory.sid_mut()
    }

    pub fn into_port(self) -> S {
        self.cpu.into_sid()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
//  Player thread
// ─────────────────────────────────────────────────────────────────────────────

/// Start playing `song` (zero-based) of `sid` on `device` in a new thread.
pub fn spawn_player(
    sid: SidFile,
    song: u8,
    device: Box<dyn SidDevice>,
    config: Config,
) -> Result<(Sender<PlayerCmd>, Receiver<PlayerStatus>, JoinHandle<()>), String> {
    let (cmd_tx, cmd_rx) = bounded::<PlayerCmd>(64);
    let (status_tx, status_rx) = bounded::<PlayerStatus>(16);

    let handle = thread::Builder::new()
        .name("sid-player".into())
        .spawn(move || {
            let session = Session::new(DevicePort::new(device), &config);
            let mut ctx = PlayContext::new(sid, session);
            ctx.start(song);
            ctx.send_status(&status_tx);
            player_loop(ctx, cmd_rx, status_tx);
        })
        .map_err(|e| format!("Failed to spawn player thread: {e}"))?;

    Ok((cmd_tx, status_rx, handle))
}

fn player_loop(mut ctx: PlayContext, cmd_rx: Receiver<PlayerCmd>, status_tx: Sender<PlayerStatus>) {
    let idle_tick = tick(Duration::from_millis(100));

    loop {
        match ctx.state {
            PlayState::Stopped | PlayState::Paused => {
                select! {
                    recv(cmd_rx) -> msg => {
                        match msg {
                            Ok(PlayerCmd::Quit) | Err(_) => break,
                            Ok(cmd) => ctx.handle_cmd(cmd),
                        }
                    }
                    recv(idle_tick) -> _ => {}
                }
                ctx.send_status(&status_tx);
            }
            PlayState::Playing => {
                // Drain commands (also detect CLI shutdown)
                loop {
                    match cmd_rx.try_recv() {
                        Ok(PlayerCmd::Quit) | Err(TryRecvError::Disconnected) => {
                            ctx.cleanup();
                            return;
                        }
                        Ok(other) => ctx.handle_cmd(other),
                        Err(TryRecvError::Empty) => break,
                    }
                }

                if ctx.state == PlayState::Playing {
                    ctx.tick();
                }
                ctx.send_status(&status_tx);
            }
        }
    }

    ctx.cleanup();
}

struct PlayContext {
    sid: SidFile,
    session: Session<DevicePort>,
    state: PlayState,
    elapsed: Duration,
    next_frame: Instant, // absolute deadline for next frame
    last_error: Option<String>,
}

impl PlayContext {
    fn new(sid: SidFile, session: Session<DevicePort>) -> Self {
        Self {
            sid,
            session,
            state: PlayState::Stopped,
            elapsed: Duration::ZERO,
            next_frame: Instant::now(),
            last_error: None,
        }
    }

    fn handle_cmd(&mut self, cmd: PlayerCmd) {
        match cmd {
            PlayerCmd::SetSubtune(song) => self.start(song),
            PlayerCmd::TogglePause => match self.state {
                PlayState::Playing => self.state = PlayState::Paused,
                PlayState::Paused => self.state = PlayState::Playing,
                PlayState::Stopped => {}
            },
            PlayerCmd::Stop => {
                if self.state != PlayState::Stopped {
                    self.mute();
                    self.state = PlayState::Stopped;
                }
            }
            PlayerCmd::Quit => {}
        }
    }

    fn start(&mut self, song: u8) {
        self.last_error = None;
        if song > self.sid.subsongs() {
            self.last_error = Some(format!(
                "Song {} out of range (tune has {})",
                song as u16 + 1,
                self.sid.header.songs,
            ));
            return;
        }

        self.mute();
        if let Err(e) = self.session.load(&self.sid, song) {
            self.fail(e);
            return;
        }
        if let Some(e) = self.session.port_mut().take_error() {
            self.fail(e);
            return;
        }

        self.state = PlayState::Playing;
        self.elapsed = Duration::ZERO;
        self.next_frame = Instant::now();
    }

    /// One play call, then wait out the rest of the frame.
    fn tick(&mut self) {
        if let Err(e) = self.session.play_frame() {
            log::warn!("{e}; frame skipped");
        }

        let port = self.session.port_mut();
        let transport = match port.take_error() {
            Some(e) => Err(e),
            None => port.device_mut().flush(),
        };
        if let Err(e) = transport {
            self.fail(e);
            return;
        }

        // ── Absolute-timeline frame pacing ───────────────────────────────
        // The deadline advances by exactly one period so per-frame overhead
        // does not accumulate as drift.
        let frame_dur = Duration::from_micros(self.session.refresh_us());
        self.next_frame += frame_dur;

        // Fallen behind (e.g. after a pause): snap to now, no fast-forward.
        let now = Instant::now();
        if self.next_frame < now {
            self.next_frame = now;
        }

        wait_until(self.next_frame);
        self.elapsed += frame_dur;
    }

    fn fail(&mut self, e: String) {
        log::error!("Playback stopped: {e}");
        self.last_error = Some(e);
        self.state = PlayState::Stopped;
    }

    fn mute(&mut self) {
        if let Err(e) = self.session.port_mut().device_mut().mute() {
            log::warn!("Mute failed: {e}");
        }
    }

    fn send_status(&self, tx: &Sender<PlayerStatus>) {
        let _ = tx.try_send(PlayerStatus {
            state: self.state,
            song: self.session.song(),
            frames: self.session.frames(),
            elapsed: self.elapsed,
            refresh_us: self.session.refresh_us(),
            error: self.last_error.clone(),
        });
    }

    fn cleanup(mut self) {
        let dev = self.session.port_mut().device_mut();
        if let Err(e) = dev.mute() {
            log::warn!("Mute failed: {e}");
        }
        if let Err(e) = dev.reset() {
            log::warn!("Reset of {} failed: {e}", dev.name());
        }
        dev.close();
        log::info!("Player thread exiting");
    }
}
