use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Serialize;
use uuid::Uuid;

pub mod backoff;

pub const DEFAULT_CONTROL_ADDR: &str = "127.0.0.1:8443";
pub const DEFAULT_CONTROL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_AGENT_NAME: &str = "launcher";
#[cfg(windows)]
pub const DEFAULT_DESKTOP_PIPE: &str = r"\\.\pipe\launcher_desktop";

pub fn env_addr(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|value| parse_flag(&value))
        .unwrap_or(false)
}

pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn env_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(value) => match value.trim().parse::<u64>() {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!("ignoring {key}={value}: {err}");
                default
            }
        },
        Err(_) => default,
    }
}

pub fn control_addr() -> String {
    env_addr("LAUNCHER_CONTROL_ADDR", DEFAULT_CONTROL_ADDR)
}

pub fn control_interval() -> Duration {
    interval_from_secs(env_u64(
        "LAUNCHER_CONTROL_INTERVAL_SECS",
        DEFAULT_CONTROL_INTERVAL_SECS,
    ))
}

/// A zero interval would poll the control plane in a tight loop; it falls back
/// to the default.
pub fn interval_from_secs(secs: u64) -> Duration {
    if secs == 0 {
        tracing::warn!(
            "ignoring zero control interval, using {DEFAULT_CONTROL_INTERVAL_SECS}s"
        );
        return Duration::from_secs(DEFAULT_CONTROL_INTERVAL_SECS);
    }
    Duration::from_secs(secs)
}

pub fn agent_name() -> String {
    env_addr("LAUNCHER_AGENT_NAME", DEFAULT_AGENT_NAME)
}

pub fn desktop_token() -> Option<String> {
    std::env::var("LAUNCHER_DESKTOP_TOKEN")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn desktop_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var("LAUNCHER_DESKTOP_SOCKET") {
        if !path.trim().is_empty() {
            return expand_user(path.trim());
        }
    }
    default_desktop_socket_path()
}

#[cfg(not(windows))]
fn default_desktop_socket_path() -> PathBuf {
    state_file_path("desktop.sock")
}

#[cfg(windows)]
fn default_desktop_socket_path() -> PathBuf {
    PathBuf::from(DEFAULT_DESKTOP_PIPE)
}

pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("LAUNCHER_DATA_DIR") {
        if !dir.trim().is_empty() {
            return expand_user(dir.trim());
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".local/share/launcher")
    } else {
        PathBuf::from("/tmp/launcher")
    }
}

pub fn state_dir() -> PathBuf {
    data_dir().join("state")
}

pub fn state_file_path(file_name: &str) -> PathBuf {
    state_dir().join(file_name)
}

pub fn expand_user(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Ok(home) = std::env::var("HOME") {
            let rest = path.strip_prefix("~/").unwrap_or("");
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

/// Writes `value` as pretty JSON through a uniquely named temp file and a rename,
/// so readers never observe a half-written file.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
    let data = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
    fs::write(&tmp, data)?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    Ok(())
}

pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

pub fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .init();
    Ok(())
}
