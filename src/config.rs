// Persistent configuration: output engine, SPI node, frame timing, watchdog.
// Stored as JSON in <config_dir>/sidwire/config.json

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output engine name ("auto", "spi", "usb", "null").
    pub output_engine: String,
    /// spidev node for the "spi" engine.
    pub spi_device: String,
    /// Play-call interval in microseconds until the tune programs the CIA timer.
    /// At the default 20000, NTSC tunes start at 16667 instead.
    pub frame_us: u64,
    /// Recompute the interval from the CIA 1 timer A latch after each play call.
    pub follow_cia_timer: bool,
    /// Value written to the volume register before init runs (0–15).
    pub initial_volume: u8,
    /// Instruction budget for one init call. 0 = unlimited.
    pub init_step_limit: u64,
    /// Instruction budget for one play call. 0 = unlimited.
    pub play_step_limit: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_engine: "auto".to_string(),
            spi_device: "/dev/spidev0.0".to_string(),
            frame_us: 20_000,
            follow_cia_timer: true,
            initial_volume: 15,
            init_step_limit: 2_000_000,
            play_step_limit: 200_000,
        }
    }
}

impl Config {
    /// Path to the config file.
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|d| d.join("config.json"))
    }

    /// Load config from disk, or return defaults if not found / invalid.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse_json(&content).unwrap_or_else(|e| {
                log::warn!("Invalid config {}: {e}", path.display());
                Self::default()
            }),
            Err(e) => {
                log::warn!("Cannot read config: {e}");
                Self::default()
            }
        }
    }

    /// Save config to disk.
    pub fn save(&self) -> Result<PathBuf, String> {
        let path =
            Self::config_path().ok_or_else(|| "Cannot determine config directory".to_string())?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Cannot create directory: {e}"))?;
        }
        std::fs::write(path, self.to_json())
            .map_err(|e| format!("Cannot save config: {e}"))?;
        log::info!("Config saved to {}", path.display());
        Ok(())
    }

    /// Parse config from a JSON string. Unknown fields are ignored,
    /// missing fields get defaults.
    pub fn parse_json(s: &str) -> Result<Self, String> {
        serde_json::from_str(s).map_err(|e| e.to_string())
    }

    /// Serialize config to a JSON string.
    pub fn to_json(&self) -> String {
        // A struct of plain strings and numbers always serializes.
        serde_json::to_string_pretty(self).unwrap_or_default() + "\n"
    }

    /// Step budget as the watchdog sees it: `None` means no limit.
    pub fn init_budget(&self) -> Option<u64> {
        (self.init_step_limit != 0).then_some(self.init_step_limit)
    }

    pub fn play_budget(&self) -> Option<u64> {
        (self.play_step_limit != 0).then_some(self.play_step_limit)
    }
}

/// Get the application config directory.
fn config_dir() -> Option<PathBuf> {
    // macOS:   ~/Library/Application Support/sidwire/
    // Linux:   ~/.config/sidwire/
    // Windows: %APPDATA%/sidwire/

    #[cfg(target_os = "macos")]
    {
        let home = std::env::var("HOME").ok()?;
        Some(
            PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("sidwire"),
        )
    }

    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA").ok()?;
        Some(PathBuf::from(appdata).join("sidwire"))
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        let home = std::env::var("HOME").ok()?;
        Some(PathBuf::from(home).join(".config").join("sidwire"))
    }
}
