//! Builder for IOS-XE drivers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::generic::GenericDriver;
use crate::config::Credentials;
use crate::error::{DeviceResult, DriverError};
use crate::platform::{PlatformDefinition, cisco_iosxe};
use crate::transport::config::{HostKeyVerification, SshConfig};

/// Builder for [`GenericDriver`].
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use l2vpn_scale::config::Credentials;
/// use l2vpn_scale::driver::{Driver, DriverBuilder};
///
/// # async fn example() -> Result<(), l2vpn_scale::error::DeviceError> {
/// let credentials = Arc::new(Credentials::new("admin", "secret"));
/// let mut driver = DriverBuilder::new("192.0.2.1", credentials)
///     .timeout(std::time::Duration::from_secs(30))
///     .build()?;
/// driver.open().await?;
/// driver.send_config(&["interface Loopback100", " description test"]).await?;
/// driver.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct DriverBuilder {
    host: String,
    port: u16,
    credentials: Arc<Credentials>,
    platform: Option<PlatformDefinition>,
    timeout: Duration,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
}

impl DriverBuilder {
    /// Create a new driver builder for the specified host.
    pub fn new(host: impl Into<String>, credentials: Arc<Credentials>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            credentials,
            platform: None,
            timeout: Duration::from_secs(60),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Use a platform other than IOS-XE.
    pub fn platform(mut self, platform: PlatformDefinition) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Connect and per-command timeout (default: 60s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a known_hosts file other than `~/.ssh/known_hosts`.
    pub fn known_hosts_path(mut self, path: Option<PathBuf>) -> Self {
        self.known_hosts_path = path;
        self
    }

    /// Build the driver. Does not connect.
    pub fn build(self) -> DeviceResult<GenericDriver> {
        let platform = match self.platform {
            Some(platform) => platform,
            None => cisco_iosxe::platform().map_err(DriverError::from)?,
        };

        let ssh_config = SshConfig {
            host: self.host,
            port: self.port,
            credentials: self.credentials,
            timeout: self.timeout,
            terminal_width: platform.terminal_width,
            terminal_height: platform.terminal_height,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
        };

        GenericDriver::new(ssh_config, platform)
    }
}
