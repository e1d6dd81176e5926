// ABOUTME: XDG Base Directory paths for config and log files
// ABOUTME: Falls back to the working directory when no home directory is available

use directories::ProjectDirs;
use std::path::PathBuf;

const QUALIFIER: &str = "org";
const ORGANIZATION: &str = "lmgram";
const APPLICATION: &str = "lmgram";

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
}

/// e.g. ~/.local/share/lmgram/logs/, or ./logs
pub fn log_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// e.g. ~/.config/lmgram/, or .
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}
