//! The filesystem (or pipe namespace) artifact the desktop server listens on.

use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use launcher_util::backoff;
use tracing::{debug, info, warn};

use crate::errors::EndpointError;

/// How long [`LocalEndpoint::release`] keeps retrying before giving up.
pub const RELEASE_TIMEOUT: Duration = Duration::from_secs(5);
pub const RELEASE_INTERVAL: Duration = Duration::from_secs(1);

#[cfg(unix)]
pub type Listener = tokio::net::UnixListener;
#[cfg(windows)]
pub type Listener = tokio::net::windows::named_pipe::NamedPipeServer;

#[cfg(unix)]
pub(crate) type ClientStream = tokio::net::UnixStream;
#[cfg(windows)]
pub(crate) type ClientStream = tokio::net::windows::named_pipe::NamedPipeClient;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalEndpoint {
    path: PathBuf,
}

impl LocalEndpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes whatever occupies the endpoint path, retrying while the
    /// artifact is still held by another process.
    pub async fn release(&self) -> Result<(), EndpointError> {
        let path = self.path.clone();
        backoff::wait_for(|| remove_artifact(&path), RELEASE_TIMEOUT, RELEASE_INTERVAL)
            .await
            .map_err(|source| EndpointError::Busy {
                path: self.path.clone(),
                source,
            })
    }

    /// Single removal attempt for paths where waiting is not an option.
    pub fn release_now(&self) {
        if let Err(err) = remove_artifact(&self.path) {
            warn!(path = %self.path.display(), error = %err, "failed to remove endpoint");
        }
    }

    #[cfg(unix)]
    pub fn bind(&self) -> Result<Listener, EndpointError> {
        use std::os::unix::fs::PermissionsExt as _;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| EndpointError::Bind {
                path: self.path.clone(),
                source,
            })?;
        }
        let listener = Listener::bind(&self.path).map_err(|source| EndpointError::Bind {
            path: self.path.clone(),
            source,
        })?;
        std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).map_err(
            |source| EndpointError::Permissions {
                path: self.path.clone(),
                source,
            },
        )?;
        info!(path = %self.path.display(), "desktop endpoint bound");
        Ok(listener)
    }

    #[cfg(windows)]
    pub fn bind(&self) -> Result<Listener, EndpointError> {
        use tokio::net::windows::named_pipe::ServerOptions;

        let listener = ServerOptions::new()
            .first_pipe_instance(true)
            .create(&self.path)
            .map_err(|source| EndpointError::Bind {
                path: self.path.clone(),
                source,
            })?;
        info!(path = %self.path.display(), "desktop endpoint bound");
        Ok(listener)
    }

    #[cfg(unix)]
    pub(crate) async fn connect(&self) -> io::Result<ClientStream> {
        ClientStream::connect(&self.path).await
    }

    #[cfg(windows)]
    pub(crate) async fn connect(&self) -> io::Result<ClientStream> {
        use tokio::net::windows::named_pipe::ClientOptions;

        ClientOptions::new().open(&self.path)
    }
}

/// Removes the socket file, or a directory squatting on its path. A missing
/// path counts as removed.
#[cfg(unix)]
fn remove_artifact(path: &Path) -> io::Result<()> {
    let result = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(err) => Err(err),
    };
    match result {
        Ok(()) => {
            debug!(path = %path.display(), "removed endpoint");
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Named pipes vanish with their last handle; nothing to remove.
#[cfg(windows)]
fn remove_artifact(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Makes one removal attempt when dropped, so an aborted server task still
/// cleans up after itself.
pub(crate) struct EndpointGuard(pub(crate) LocalEndpoint);

impl Drop for EndpointGuard {
    fn drop(&mut self) {
        self.0.release_now();
    }
}
