use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose;
use base64::Engine as _;
use launcher_keys::DeviceKey;
use reqwest::{
    header::{ACCEPT, ETAG, IF_NONE_MATCH},
    Client, StatusCode, Url,
};

use crate::{
    errors::ProviderError,
    provider::{DataProvider, Fetched},
};

pub const DEFAULT_ROOT_PATH: &str = "/api/v1/control";
pub const PUBLIC_KEY_HEADER: &str = "x-launcher-public-key";
pub const TIMESTAMP_HEADER: &str = "x-launcher-timestamp";
pub const SIGNATURE_HEADER: &str = "x-launcher-signature";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct HttpProviderOptions {
    pub addr: String,
    pub disable_tls: bool,
    pub insecure: bool,
    pub timeout: Duration,
    pub root_path: String,
}

impl Default for HttpProviderOptions {
    fn default() -> Self {
        Self {
            addr: launcher_util::DEFAULT_CONTROL_ADDR.to_string(),
            disable_tls: false,
            insecure: false,
            timeout: DEFAULT_TIMEOUT,
            root_path: DEFAULT_ROOT_PATH.to_string(),
        }
    }
}

impl HttpProviderOptions {
    pub fn from_env() -> Self {
        Self {
            addr: launcher_util::control_addr(),
            disable_tls: launcher_util::env_flag("LAUNCHER_CONTROL_DISABLE_TLS"),
            insecure: launcher_util::env_flag("LAUNCHER_CONTROL_INSECURE"),
            ..Self::default()
        }
    }
}

/// Conditional GETs against the control server, optionally signed with the
/// device key.
pub struct HttpDataProvider {
    base_url: Url,
    root_path: String,
    client: Client,
    signer: Option<DeviceKey>,
}

impl HttpDataProvider {
    pub fn new(options: HttpProviderOptions) -> Result<Self, ProviderError> {
        let scheme = if options.disable_tls { "http" } else { "https" };
        let raw = format!("{scheme}://{}", options.addr.trim());
        let base_url = Url::parse(&raw).map_err(|e| ProviderError::InvalidResource {
            resource: raw.clone(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .user_agent("launcher-control")
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.insecure)
            .build()
            .map_err(ProviderError::Client)?;
        Ok(Self {
            base_url,
            root_path: options.root_path,
            client,
            signer: None,
        })
    }

    pub fn with_device_key(mut self, key: DeviceKey) -> Self {
        self.signer = Some(key);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn resolve(&self, resource: &str) -> Result<Url, ProviderError> {
        let target = if resource.is_empty() {
            self.root_path.as_str()
        } else {
            resource
        };
        let resolved = if target.starts_with("http://") || target.starts_with("https://") {
            Url::parse(target)
        } else {
            self.base_url.join(target)
        };
        resolved.map_err(|e| ProviderError::InvalidResource {
            resource: target.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl DataProvider for HttpDataProvider {
    async fn get(
        &self,
        resource: &str,
        cached_etag: Option<&str>,
    ) -> Result<Fetched, ProviderError> {
        let url = self.resolve(resource)?;
        let label = url.path().to_string();

        let mut request = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json");
        if let Some(tag) = cached_etag.filter(|tag| !tag.is_empty()) {
            request = request.header(IF_NONE_MATCH, tag);
        }
        if let Some(key) = &self.signer {
            let timestamp = launcher_util::now_millis().to_string();
            let message = signing_message("GET", url.path(), &timestamp);
            let signature = key.sign(message.as_bytes());
            request = request
                .header(PUBLIC_KEY_HEADER, key.public_key_base64())
                .header(TIMESTAMP_HEADER, timestamp)
                .header(
                    SIGNATURE_HEADER,
                    general_purpose::STANDARD.encode(signature.to_bytes()),
                );
        }

        let resp = request
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                resource: label.clone(),
                source,
            })?;

        match resp.status() {
            StatusCode::NOT_MODIFIED => Ok(Fetched {
                etag: cached_etag.unwrap_or_default().to_string(),
                data: Vec::new(),
            }),
            status if status.is_success() => {
                let etag = resp
                    .headers()
                    .get(ETAG)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let data = resp
                    .bytes()
                    .await
                    .map_err(|source| ProviderError::Body {
                        resource: label,
                        source,
                    })?
                    .to_vec();
                Ok(Fetched { etag, data })
            }
            status => Err(ProviderError::Status {
                resource: label,
                status: status.as_u16(),
            }),
        }
    }
}

/// Bytes covered by the request signature.
pub fn signing_message(method: &str, path: &str, timestamp: &str) -> String {
    format!("{method}\n{path}\n{timestamp}")
}

#[cfg(test)]
mod tests;
