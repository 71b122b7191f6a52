use std::{fs, io, path::Path, path::PathBuf, time::Duration};

use launcher_control::HttpProviderOptions;
use serde::{Deserialize, Serialize};
use tracing::warn;

const AGENT_CONFIG_FILE: &str = "agent-config.json";
const KEY_STORE_FILE: &str = "agent.json";

const ENV_CONTROL_ADDR: &str = "LAUNCHER_CONTROL_ADDR";
const ENV_INTERVAL: &str = "LAUNCHER_CONTROL_INTERVAL_SECS";
const ENV_DISABLE_TLS: &str = "LAUNCHER_CONTROL_DISABLE_TLS";
const ENV_INSECURE: &str = "LAUNCHER_CONTROL_INSECURE";
const ENV_DESKTOP_SOCKET: &str = "LAUNCHER_DESKTOP_SOCKET";
const ENV_DESKTOP_TOKEN: &str = "LAUNCHER_DESKTOP_TOKEN";
const ENV_AGENT_NAME: &str = "LAUNCHER_AGENT_NAME";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AgentConfig {
    pub(crate) control_addr: String,
    pub(crate) request_interval_secs: u64,
    pub(crate) disable_tls: bool,
    pub(crate) insecure: bool,
    pub(crate) desktop_socket: PathBuf,
    pub(crate) desktop_token: Option<String>,
    pub(crate) agent_name: String,
    pub(crate) key_store: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            control_addr: launcher_util::control_addr(),
            request_interval_secs: launcher_util::control_interval().as_secs(),
            disable_tls: launcher_util::env_flag(ENV_DISABLE_TLS),
            insecure: launcher_util::env_flag(ENV_INSECURE),
            desktop_socket: launcher_util::desktop_socket_path(),
            desktop_token: launcher_util::desktop_token(),
            agent_name: launcher_util::agent_name(),
            key_store: launcher_util::state_file_path(KEY_STORE_FILE),
        }
    }
}

impl AgentConfig {
    /// Environment first, then `agent-config.json` for anything the
    /// environment leaves unset.
    pub(crate) fn load() -> Self {
        Self::load_from(&agent_config_path(), |key| std::env::var_os(key).is_some())
    }

    pub(crate) fn load_from(path: &Path, env_set: impl Fn(&str) -> bool) -> Self {
        let cfg = AgentConfig::default();
        match fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str::<AgentConfig>(&data) {
                Ok(file_cfg) => cfg.merge(file_cfg, env_set),
                Err(err) => {
                    warn!("failed to parse {}: {err}", path.display());
                    cfg
                }
            },
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    warn!("failed to read {}: {err}", path.display());
                }
                cfg
            }
        }
    }

    fn merge(mut self, file: AgentConfig, env_set: impl Fn(&str) -> bool) -> Self {
        if !env_set(ENV_CONTROL_ADDR) && !file.control_addr.is_empty() {
            self.control_addr = file.control_addr;
        }
        if !env_set(ENV_INTERVAL) && file.request_interval_secs > 0 {
            self.request_interval_secs = file.request_interval_secs;
        }
        if !env_set(ENV_DISABLE_TLS) {
            self.disable_tls = file.disable_tls;
        }
        if !env_set(ENV_INSECURE) {
            self.insecure = file.insecure;
        }
        if !env_set(ENV_DESKTOP_SOCKET) && !file.desktop_socket.as_os_str().is_empty() {
            self.desktop_socket = file.desktop_socket;
        }
        if !env_set(ENV_DESKTOP_TOKEN) {
            if let Some(token) = file.desktop_token.filter(|t| !t.trim().is_empty()) {
                self.desktop_token = Some(token);
            }
        }
        if !env_set(ENV_AGENT_NAME) && !file.agent_name.is_empty() {
            self.agent_name = file.agent_name;
        }
        if !file.key_store.as_os_str().is_empty() {
            self.key_store = file.key_store;
        }
        self
    }

    pub(crate) fn request_interval(&self) -> Duration {
        launcher_util::interval_from_secs(self.request_interval_secs)
    }

    pub(crate) fn provider_options(&self) -> HttpProviderOptions {
        HttpProviderOptions {
            addr: self.control_addr.clone(),
            disable_tls: self.disable_tls,
            insecure: self.insecure,
            ..HttpProviderOptions::default()
        }
    }
}

fn agent_config_path() -> PathBuf {
    launcher_util::state_file_path(AGENT_CONFIG_FILE)
}
