//! Where agents on this machine meet.
//!
//! All agents of one user share the store directory and the bus directory.
//! `POMO_DATA_DIR` moves both under one root, which keeps independent
//! sandboxes (and tests) from hearing each other.

use directories::ProjectDirs;
use std::io::{self, ErrorKind};
use std::path::PathBuf;

pub const DATA_DIR_ENV: &str = "POMO_DATA_DIR";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "pabloagn", "pomo")
}

fn data_dir_override() -> Option<PathBuf> {
    std::env::var_os(DATA_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Directory holding the stored snapshot and settings.
pub fn data_dir() -> io::Result<PathBuf> {
    if let Some(dir) = data_dir_override() {
        return Ok(dir);
    }
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| io::Error::new(ErrorKind::NotFound, "could not determine data directory"))
}

/// Directory holding one socket per live agent. Prefers the runtime dir,
/// which the system clears on logout.
pub fn bus_dir() -> io::Result<PathBuf> {
    if let Some(dir) = data_dir_override() {
        return Ok(dir.join("bus"));
    }
    if let Some(runtime) = project_dirs().and_then(|dirs| dirs.runtime_dir().map(|d| d.to_path_buf())) {
        return Ok(runtime.join("bus"));
    }
    Ok(data_dir()?.join("bus"))
}

pub fn config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("pomo.toml"))
}
