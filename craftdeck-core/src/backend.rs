use crate::config::{self, AppConfig};
use crate::error::{CoreError, Result};
use crate::probe::ProbeResult;
use crate::scan;
use crate::server::{ServerMetadata, StorageSample};
use crate::slp;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Everything the console reads from or writes to the outside world. Calls block; the UI runs
/// them on worker threads.
pub trait Backend: Send + Sync {
    fn fetch_servers(&self) -> Result<Vec<ServerMetadata>>;
    /// Same order as [`Backend::fetch_servers`], one sample per server.
    fn fetch_storage_sizes(&self) -> Result<Vec<StorageSample>>;
    /// Probes the address/port from the current config.
    fn probe_server(&self) -> Result<ProbeResult>;
    fn read_app_config(&self) -> Result<AppConfig>;
    fn save_app_config(&self, config: &AppConfig) -> Result<()>;
    fn directory_exists(&self, path: &str) -> bool;
}

/// Backend over the local filesystem, with the config kept in memory after the first read.
pub struct LocalBackend {
    config_path: PathBuf,
    config: Mutex<Option<AppConfig>>,
    runtime: tokio::runtime::Runtime,
}

impl LocalBackend {
    pub fn new(config_path: PathBuf) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("craftdeck-probe")
            .enable_all()
            .build()
            .map_err(|e| CoreError::Runtime(e.to_string()))?;
        info!("Backend: using config at {}", config_path.display());
        Ok(Self {
            config_path,
            config: Mutex::new(None),
            runtime,
        })
    }

    /// Backend on the per-user config file.
    pub fn open_default() -> Result<Self> {
        Self::new(config::default_config_path()?)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn lock(&self) -> MutexGuard<'_, Option<AppConfig>> {
        // A panic while holding the lock cannot leave the cached config half-written.
        self.config.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current_config(&self) -> Result<AppConfig> {
        let mut cached = self.lock();
        if let Some(config) = cached.as_ref() {
            return Ok(config.clone());
        }
        let loaded = AppConfig::load_or_create(&self.config_path)?;
        loaded.ensure_working_dir();
        *cached = Some(loaded.clone());
        Ok(loaded)
    }

    fn working_dir(&self) -> Result<PathBuf> {
        Ok(PathBuf::from(self.current_config()?.working_dir))
    }
}

impl Backend for LocalBackend {
    fn fetch_servers(&self) -> Result<Vec<ServerMetadata>> {
        scan::scan_servers(&self.working_dir()?)
    }

    fn fetch_storage_sizes(&self) -> Result<Vec<StorageSample>> {
        scan::storage_sizes(&self.working_dir()?)
    }

    fn probe_server(&self) -> Result<ProbeResult> {
        let config = self.current_config()?;
        debug!("Backend: probing {}", config.ping_target());
        let latency = self
            .runtime
            .block_on(slp::ping_with_timeout(&config.ping_address, config.ping_port))?;
        Ok(ProbeResult::online(latency))
    }

    fn read_app_config(&self) -> Result<AppConfig> {
        self.current_config()
    }

    fn save_app_config(&self, config: &AppConfig) -> Result<()> {
        config.save_to_file(&self.config_path)?;
        *self.lock() = Some(config.clone());
        info!(
            "Backend: settings saved (dir={}, probe={})",
            config.working_dir,
            config.ping_target()
        );
        Ok(())
    }

    fn directory_exists(&self, path: &str) -> bool {
        config::dir_exists(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn backend_in(tmp: &Path) -> LocalBackend {
        let servers = tmp.join("servers");
        fs::create_dir_all(servers.join("alpha")).unwrap();
        fs::create_dir_all(servers.join("beta")).unwrap();
        let config = AppConfig {
            working_dir: servers.to_string_lossy().into_owned(),
            ping_address: "127.0.0.1".into(),
            ping_port: 1,
        };
        let path = tmp.join("app_data.json");
        config.save_to_file(&path).unwrap();
        LocalBackend::new(path).unwrap()
    }

    #[test]
    fn lists_servers_and_storage_from_working_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = backend_in(tmp.path());
        let servers = backend.fetch_servers().unwrap();
        let sizes = backend.fetch_storage_sizes().unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(sizes.len(), 2);
        assert_eq!(servers[0].name, "alpha");
        assert_eq!(sizes[0].size_gb, "0.00");
    }

    #[test]
    fn saved_config_takes_effect() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = backend_in(tmp.path());
        let mut config = backend.read_app_config().unwrap();

        let other = tmp.path().join("other");
        fs::create_dir_all(other.join("gamma")).unwrap();
        config.working_dir = other.to_string_lossy().into_owned();
        backend.save_app_config(&config).unwrap();

        assert_eq!(backend.read_app_config().unwrap(), config);
        assert_eq!(AppConfig::load_or_create(backend.config_path()).unwrap(), config);
        let servers = backend.fetch_servers().unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].name, "gamma");
    }

    #[test]
    fn probe_to_closed_port_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = backend_in(tmp.path());
        assert!(backend.probe_server().is_err());
    }

    #[test]
    fn directory_check() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = backend_in(tmp.path());
        assert!(backend.directory_exists(&tmp.path().to_string_lossy()));
        assert!(!backend.directory_exists(&tmp.path().join("missing").to_string_lossy()));
    }
}
