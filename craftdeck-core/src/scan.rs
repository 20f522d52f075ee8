//! Reads server folders out of the working directory. Every subdirectory is one server.

use crate::error::{CoreError, Result};
use crate::server::{ServerMetadata, StorageSample};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

const UNKNOWN_VERSION: &str = "unknown";
const BYTES_PER_GB: f64 = 1e9;

/// Server folders under `working_dir`, sorted by name so that the metadata and storage scans
/// come back in the same order.
pub fn server_dirs(working_dir: &Path) -> Result<Vec<PathBuf>> {
    if !working_dir.is_dir() {
        return Err(CoreError::MissingWorkingDir(working_dir.to_path_buf()));
    }
    let mut dirs = Vec::new();
    for entry in fs::read_dir(working_dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

pub fn scan_servers(working_dir: &Path) -> Result<Vec<ServerMetadata>> {
    let servers: Vec<ServerMetadata> = server_dirs(working_dir)?
        .iter()
        .map(|dir| read_server(dir))
        .collect();
    debug!("Scan: {} servers in {}", servers.len(), working_dir.display());
    Ok(servers)
}

pub fn storage_sizes(working_dir: &Path) -> Result<Vec<StorageSample>> {
    Ok(server_dirs(working_dir)?
        .iter()
        .map(|dir| StorageSample {
            location: dir.to_string_lossy().into_owned(),
            size_gb: format!("{:.2}", dir_size_bytes(dir) as f64 / BYTES_PER_GB),
        })
        .collect())
}

fn read_server(dir: &Path) -> ServerMetadata {
    let jars = jar_names(dir);
    ServerMetadata {
        name: dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        engine: detect_engine(dir, &jars).to_string(),
        version: jars
            .iter()
            .find_map(|jar| version_in(jar))
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
        location: dir.to_string_lossy().into_owned(),
        players: count_players(dir),
        last_played: last_modified(dir),
    }
}

/// Lowercased names of the jars directly inside `dir`, sorted.
fn jar_names(dir: &Path) -> Vec<String> {
    let mut jars: Vec<String> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_lowercase())
            .filter(|name| name.ends_with(".jar"))
            .collect(),
        Err(_) => Vec::new(),
    };
    jars.sort();
    jars
}

fn detect_engine(dir: &Path, jars: &[String]) -> &'static str {
    let has_jar = |prefix: &str| jars.iter().any(|j| j.starts_with(prefix));
    if dir.join(".fabric").is_dir() || has_jar("fabric-server") {
        "Fabric"
    } else if dir.join("libraries/net/neoforged").is_dir() {
        "NeoForge"
    } else if dir.join("libraries/net/minecraftforge").is_dir() || has_jar("forge") {
        "Forge"
    } else if has_jar("purpur") {
        "Purpur"
    } else if has_jar("paper") {
        "Paper"
    } else if has_jar("spigot") {
        "Spigot"
    } else {
        "Vanilla"
    }
}

/// First dotted number in a jar name: `paper-1.21.1-123.jar` gives `1.21.1`.
fn version_in(jar: &str) -> Option<String> {
    let stem = jar.strip_suffix(".jar").unwrap_or(jar);
    let bytes = stem.as_bytes();
    let mut start = 0;
    while start < bytes.len() {
        let boundary = start == 0 || !bytes[start - 1].is_ascii_digit();
        if bytes[start].is_ascii_digit() && boundary {
            let run: String = stem[start..]
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            let run = run.trim_end_matches('.');
            if run.contains('.') {
                return Some(run.to_string());
            }
            start += run.len().max(1);
        } else {
            start += 1;
        }
    }
    None
}

/// Distinct players that ever joined: one `.dat` file each in `world/playerdata`.
fn count_players(dir: &Path) -> u32 {
    let entries = match fs::read_dir(dir.join("world").join("playerdata")) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };
    entries
        .flatten()
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "dat"))
        .count() as u32
}

fn last_modified(dir: &Path) -> DateTime<Utc> {
    match fs::metadata(dir).and_then(|m| m.modified()) {
        Ok(time) => DateTime::<Utc>::from(time),
        Err(e) => {
            warn!("Scan: no modification time for {}: {}", dir.display(), e);
            DateTime::<Utc>::from(SystemTime::UNIX_EPOCH)
        }
    }
}

/// Total size of the files under `dir`. Entries that cannot be read are skipped and logged.
fn dir_size_bytes(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Scan: skipping unreadable entry under {}: {}", dir.display(), e);
                None
            }
        })
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum()
}
