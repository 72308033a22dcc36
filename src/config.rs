/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, warn};

// ── Public Config Struct ──

#[derive(Clone, Debug, Default)]
pub struct GameConfig {
    pub speed: SpeedConfig,
    pub gamepad: GamepadConfig,
}

#[derive(Clone, Debug)]
pub struct SpeedConfig {
    pub tick_rate_ms: u64,
    pub march_speed: f64,      // track units per simulated second
    pub strike_interval: f64,  // seconds between enemy strikes once engaged
    pub popup_ms: u64,         // how long a damage popup stays on screen
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub lane_left: Vec<String>,
    pub lane_right: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub restart: Vec<String>,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        TomlSpeed::default().into()
    }
}

impl Default for GamepadConfig {
    fn default() -> Self {
        TomlGamepad::default().into()
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_march_speed")]
    march_speed: f64,
    #[serde(default = "default_strike_interval")]
    strike_interval: f64,
    #[serde(default = "default_popup_ms")]
    popup_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_lane_left")]
    lane_left: Vec<String>,
    #[serde(default = "default_lane_right")]
    lane_right: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }
fn default_march_speed() -> f64 { 8.0 }
fn default_strike_interval() -> f64 { 0.3 }
fn default_popup_ms() -> u64 { 800 }

fn default_lane_left() -> Vec<String> { vec!["L1".into(), "X".into()] }
fn default_lane_right() -> Vec<String> { vec!["R1".into(), "B".into()] }
fn default_confirm() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_restart() -> Vec<String> { vec!["Y".into()] }

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed {
            tick_rate_ms: default_tick_rate(),
            march_speed: default_march_speed(),
            strike_interval: default_strike_interval(),
            popup_ms: default_popup_ms(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            lane_left: default_lane_left(),
            lane_right: default_lane_right(),
            confirm: default_confirm(),
            cancel: default_cancel(),
            restart: default_restart(),
        }
    }
}

// ── Conversion ──

/// Out-of-range values fall back to the default for that key.
impl From<TomlSpeed> for SpeedConfig {
    fn from(t: TomlSpeed) -> Self {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        SpeedConfig {
            tick_rate_ms: if t.tick_rate_ms == 0 { default_tick_rate() } else { t.tick_rate_ms },
            march_speed: if positive(t.march_speed) { t.march_speed } else { default_march_speed() },
            strike_interval: if positive(t.strike_interval) { t.strike_interval } else { default_strike_interval() },
            popup_ms: t.popup_ms,
        }
    }
}

impl From<TomlGamepad> for GamepadConfig {
    fn from(t: TomlGamepad) -> Self {
        GamepadConfig {
            lane_left: t.lane_left,
            lane_right: t.lane_right,
            confirm: t.confirm,
            cancel: t.cancel,
            restart: t.restart,
        }
    }
}

impl From<TomlConfig> for GameConfig {
    fn from(t: TomlConfig) -> Self {
        GameConfig {
            speed: t.speed.into(),
            gamepad: t.gamepad.into(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: exe directory, current working directory, then the
    /// user and system data directories.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        load_toml(&candidate_dirs())
    }

    /// Parse a config document. Unlike `load`, a syntax error is reported.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<TomlConfig>(text).map(Into::into)
    }
}

/// Candidate directories to search: exe dir + CWD + data paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // Resolve symlinks so a launcher link still finds the real install dir.
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/marcharmy");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    let sys = PathBuf::from("/usr/share/marcharmy");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> GameConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => match GameConfig::from_toml_str(&text) {
                Ok(cfg) => {
                    debug!(path = %path.display(), "config loaded");
                    return cfg;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "config.toml parse error, using defaults");
                    return GameConfig::default();
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read config.toml");
            }
        }
    }
    GameConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = GameConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.speed.tick_rate_ms, 16);
        assert_eq!(cfg.speed.march_speed, 8.0);
        assert_eq!(cfg.speed.strike_interval, 0.3);
        assert_eq!(cfg.speed.popup_ms, 800);
        assert_eq!(cfg.gamepad.restart, vec!["Y".to_string()]);
    }

    #[test]
    fn partial_section_keeps_other_keys() {
        let cfg = GameConfig::from_toml_str("[speed]\nmarch_speed = 12.5\n").unwrap();
        assert_eq!(cfg.speed.march_speed, 12.5);
        assert_eq!(cfg.speed.tick_rate_ms, 16);
    }

    #[test]
    fn gamepad_lists_override() {
        let cfg = GameConfig::from_toml_str("[gamepad]\nconfirm = [\"Start\"]\n").unwrap();
        assert_eq!(cfg.gamepad.confirm, vec!["Start".to_string()]);
        assert_eq!(cfg.gamepad.lane_left, default_lane_left());
    }

    #[test]
    fn nonsense_speeds_fall_back() {
        let cfg = GameConfig::from_toml_str(
            "[speed]\ntick_rate_ms = 0\nmarch_speed = -3.0\nstrike_interval = 0.0\n",
        ).unwrap();
        assert_eq!(cfg.speed.tick_rate_ms, 16);
        assert_eq!(cfg.speed.march_speed, 8.0);
        assert_eq!(cfg.speed.strike_interval, 0.3);
    }

    #[test]
    fn syntax_error_is_reported() {
        assert!(GameConfig::from_toml_str("[speed\n").is_err());
    }
}
