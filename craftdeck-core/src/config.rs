use crate::error::{CoreError, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "craftdeck";
const CONFIG_FILE: &str = "app_data.json";
const SERVERS_DIR: &str = "minecraft-servers";

pub const DEFAULT_PING_ADDRESS: &str = "localhost";
pub const DEFAULT_PING_PORT: u16 = 25565;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub working_dir: String,
    pub ping_address: String,
    pub ping_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir().to_string_lossy().into_owned(),
            ping_address: DEFAULT_PING_ADDRESS.to_string(),
            ping_port: DEFAULT_PING_PORT,
        }
    }
}

/// Where servers live unless the operator picks something else.
pub fn default_working_dir() -> PathBuf {
    let base = if cfg!(any(windows, target_os = "macos")) {
        dirs::data_dir()
    } else {
        dirs::home_dir().map(|home| home.join(".minecraft"))
    };
    base.unwrap_or_else(|| PathBuf::from(".")).join(SERVERS_DIR)
}

/// `<config dir>/craftdeck/app_data.json`
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .ok_or(CoreError::NoConfigDir)
}

impl AppConfig {
    /// Reads the config at `path`. A missing file is created with defaults.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config: {} not found, writing defaults", path.display());
            let config = Self::default();
            config.save_to_file(path)?;
            return Ok(config);
        }
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        debug!("Config: loaded from {}", path.display());
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        debug!("Config: saved to {}", path.display());
        Ok(())
    }

    /// Creates the working directory when it is missing. Failure only gets logged; the server
    /// list then shows up empty.
    pub fn ensure_working_dir(&self) {
        if dir_exists(&self.working_dir) {
            return;
        }
        match fs::create_dir_all(&self.working_dir) {
            Ok(()) => debug!("Config: created working dir {}", self.working_dir),
            Err(e) => warn!("Config: could not create {}: {}", self.working_dir, e),
        }
    }

    pub fn ping_target(&self) -> String {
        format!("{}:{}", self.ping_address, self.ping_port)
    }
}

pub fn dir_exists(path: &str) -> bool {
    let p = Path::new(path);
    p.exists() && p.is_dir()
}

/// Settings form contents as typed, before they become an [`AppConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsDraft {
    pub working_dir: String,
    pub ping_address: String,
    pub port_input: String,
    /// Last directory check, with the path it answered for.
    dir_check: Option<(String, bool)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validation {
    pub dir_ok: bool,
    pub port_ok: bool,
    pub address_ok: bool,
}

impl Validation {
    pub fn can_save(&self) -> bool {
        self.dir_ok && self.port_ok && self.address_ok
    }
}

impl From<&AppConfig> for SettingsDraft {
    fn from(config: &AppConfig) -> Self {
        Self {
            working_dir: config.working_dir.clone(),
            ping_address: config.ping_address.clone(),
            port_input: config.ping_port.to_string(),
            dir_check: None,
        }
    }
}

impl SettingsDraft {
    /// Port in 0..=65535, or `None` for anything else (including junk input).
    pub fn port(&self) -> Option<u16> {
        self.port_input.trim().parse::<u16>().ok()
    }

    /// Stores the answer of a directory check. Answers for anything but the current
    /// `working_dir` are dropped.
    pub fn record_dir_check(&mut self, path: &str, exists: bool) -> bool {
        if path != self.working_dir {
            return false;
        }
        self.dir_check = Some((path.to_string(), exists));
        true
    }

    /// Whether `working_dir` exists, or `None` while no check has answered for it yet.
    pub fn dir_status(&self) -> Option<bool> {
        match &self.dir_check {
            Some((path, exists)) if *path == self.working_dir => Some(*exists),
            _ => None,
        }
    }

    /// An unchecked directory does not validate.
    pub fn validate(&self) -> Validation {
        Validation {
            dir_ok: self.dir_status() == Some(true),
            port_ok: self.port().is_some(),
            address_ok: !self.ping_address.trim().is_empty(),
        }
    }

    pub fn to_config(&self) -> Option<AppConfig> {
        if !self.validate().can_save() {
            return None;
        }
        Some(AppConfig {
            working_dir: self.working_dir.clone(),
            ping_address: self.ping_address.trim().to_string(),
            ping_port: self.port()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(dir: &str, address: &str, port: &str) -> SettingsDraft {
        SettingsDraft {
            working_dir: dir.to_string(),
            ping_address: address.to_string(),
            port_input: port.to_string(),
            dir_check: Some((dir.to_string(), true)),
        }
    }

    #[test]
    fn first_load_writes_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join(CONFIG_FILE);
        let config = AppConfig::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.ping_address, "localhost");
        assert_eq!(config.ping_port, 25565);
        assert!(config.working_dir.ends_with(SERVERS_DIR));
        assert_eq!(AppConfig::load_or_create(&path).unwrap(), config);
    }

    #[test]
    fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        let config = AppConfig {
            working_dir: tmp.path().to_string_lossy().into_owned(),
            ping_address: "play.example.net".into(),
            ping_port: 25570,
        };
        config.save_to_file(&path).unwrap();
        assert_eq!(AppConfig::load_or_create(&path).unwrap(), config);
        assert_eq!(config.ping_target(), "play.example.net:25570");
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            AppConfig::load_or_create(&path),
            Err(CoreError::Json(_))
        ));
    }

    #[test]
    fn validation_blocks_bad_input() {
        assert!(draft("/srv", "localhost", "25565").validate().can_save());
        assert!(draft("/srv", "localhost", "0").validate().can_save());
        assert!(draft("/srv", "localhost", "65535").validate().can_save());

        let v = draft("/srv", "localhost", "65536").validate();
        assert!(!v.port_ok && v.dir_ok && v.address_ok);
        assert!(!draft("/srv", "localhost", "-1").validate().port_ok);
        assert!(!draft("/srv", "localhost", "abc").validate().port_ok);
        assert!(!draft("/srv", "  ", "25565").validate().address_ok);
        assert_eq!(draft("/srv", "localhost", "").to_config(), None);

        let mut missing = draft("/srv", "localhost", "25565");
        assert!(missing.record_dir_check("/srv", false));
        assert!(!missing.validate().can_save());
    }

    #[test]
    fn unchecked_directory_blocks_save() {
        let config = AppConfig {
            working_dir: "/srv/mc".into(),
            ping_address: "localhost".into(),
            ping_port: 25565,
        };
        let mut d = SettingsDraft::from(&config);
        assert_eq!(d.dir_status(), None);
        assert!(!d.validate().dir_ok);
        assert_eq!(d.to_config(), None);

        assert!(d.record_dir_check("/srv/mc", true));
        assert!(d.to_config().is_some());

        // Typing over a checked path: the old answer no longer counts.
        d.working_dir = "/nope".into();
        assert_eq!(d.dir_status(), None);
        assert_eq!(d.to_config(), None);

        // A late answer for the previous path is ignored.
        assert!(!d.record_dir_check("/srv/mc", true));
        assert_eq!(d.to_config(), None);

        assert!(d.record_dir_check("/nope", false));
        assert_eq!(d.dir_status(), Some(false));
        assert_eq!(d.to_config(), None);
    }

    #[test]
    fn draft_converts_back_to_config() {
        let config = AppConfig {
            working_dir: "/srv/mc".into(),
            ping_address: "localhost".into(),
            ping_port: 25565,
        };
        let mut d = SettingsDraft::from(&config);
        d.record_dir_check("/srv/mc", true);
        assert_eq!(d.to_config(), Some(config.clone()));
        d.ping_address = " mc.local ".into();
        d.port_input = "25566".into();
        let updated = d.to_config().unwrap();
        assert_eq!(updated.ping_address, "mc.local");
        assert_eq!(updated.ping_port, 25566);
    }

    #[test]
    fn dir_exists_only_for_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        assert!(dir_exists(&tmp.path().to_string_lossy()));
        assert!(!dir_exists(&file.to_string_lossy()));
        assert!(!dir_exists(&tmp.path().join("missing").to_string_lossy()));
    }
}
