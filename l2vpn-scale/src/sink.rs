//! Where payloads go: a file per device, or the device itself.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::aggregate::{Mode, Payload};
use crate::circuit::Side;
use crate::config::Credentials;
use crate::driver::{Driver, DriverBuilder, GenericDriver};
use crate::error::{ArgumentError, DeviceResult, Error, IoError, Result};
use crate::preflight::Preflight;
use crate::transport::HostKeyVerification;

/// Dry-run output path with `{host}`, `{side}` and `{mode}` tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPath(String);

impl OutputPath {
    /// One file per device and mode.
    pub const DEFAULT: &'static str = "{host}_{mode}.cfg";

    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Substitute the tokens for one device.
    pub fn expand(&self, host: &str, side: Side, mode: Mode) -> PathBuf {
        PathBuf::from(
            self.0
                .replace("{host}", host)
                .replace("{side}", side.as_str())
                .replace("{mode}", mode.as_str()),
        )
    }
}

impl Default for OutputPath {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

/// Writes payloads to files.
#[derive(Debug, Clone, Default)]
pub struct FileSink {
    path: OutputPath,
}

impl FileSink {
    pub fn new(path: OutputPath) -> Self {
        Self { path }
    }

    /// Fail if two devices would write the same file.
    pub fn check_paths(&self, devices: &[(&str, Side)], mode: Mode) -> Result<()> {
        let mut seen: HashMap<PathBuf, &str> = HashMap::new();
        for &(host, side) in devices {
            let path = self.path.expand(host, side, mode);
            if seen.insert(path.clone(), host).is_some() {
                return Err(ArgumentError::OutputPathClash { path }.into());
            }
        }
        Ok(())
    }

    /// Create or truncate the device's file and write the payload.
    pub async fn write(&self, host: &str, side: Side, payload: &Payload) -> Result<PathBuf> {
        let path = self.path.expand(host, side, payload.mode());
        tokio::fs::write(&path, payload.text())
            .await
            .map_err(|source| IoError::Write {
                path: path.clone(),
                source,
            })?;

        info!(
            "Wrote {} {} block(s) for {} to {}",
            payload.len(),
            payload.mode(),
            host,
            path.display()
        );
        Ok(path)
    }
}

/// Opens device sessions.
pub trait Connector {
    type Session: Driver;

    /// A driver for `host`, not yet connected.
    fn driver(&self, host: &str) -> DeviceResult<Self::Session>;
}

/// Connects to IOS-XE devices over SSH.
#[derive(Debug, Clone)]
pub struct SshConnector {
    credentials: Arc<Credentials>,
    port: u16,
    timeout: Duration,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
}

impl SshConnector {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials: Arc::new(credentials),
            port: 22,
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

    /// Connect and per-command timeout (default: 60s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    pub fn known_hosts_path(mut self, path: Option<PathBuf>) -> Self {
        self.known_hosts_path = path;
        self
    }
}

impl Connector for SshConnector {
    type Session = GenericDriver;

    fn driver(&self, host: &str) -> DeviceResult<GenericDriver> {
        DriverBuilder::new(host, self.credentials.clone())
            .port(self.port)
            .timeout(self.timeout)
            .host_key_verification(self.host_key_verification)
            .known_hosts_path(self.known_hosts_path.clone())
            .build()
    }
}

/// Applies payloads to devices, one session per delivery.
#[derive(Debug)]
pub struct DeviceSink<C> {
    connector: C,
}

impl<C: Connector> DeviceSink<C> {
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    /// Connect, send the payload in configuration mode and disconnect. The
    /// disconnect is attempted even when sending failed.
    pub async fn deliver(&self, host: &str, payload: &Payload) -> Result<usize> {
        let commands = payload.commands();
        if commands.is_empty() {
            info!("Nothing to send to {host}");
            return Ok(0);
        }

        let mut driver = self.connect(host).await?;
        let outcome = driver
            .send_config(&commands)
            .await
            .map(|responses| responses.len())
            .map_err(|e| Error::device(host, e));
        let sent = Self::disconnect(&mut driver, host, outcome).await?;

        info!("Applied {} {} command(s) on {}", sent, payload.mode(), host);
        Ok(sent)
    }

    /// Connect, check `host` for planned ids already in use and disconnect.
    pub async fn preflight(&self, host: &str, check: &Preflight) -> Result<()> {
        let mut driver = self.connect(host).await?;
        let outcome = check.run(&mut driver, host).await;
        Self::disconnect(&mut driver, host, outcome).await
    }

    async fn connect(&self, host: &str) -> Result<C::Session> {
        let mut driver = self.connector.driver(host).map_err(|e| Error::device(host, e))?;
        debug!("Opening session to {host}");
        if let Err(e) = driver.open().await {
            driver.close().await.ok();
            return Err(Error::device(host, e));
        }
        Ok(driver)
    }

    /// Close the session, then report `outcome`. A failed close only
    /// matters when everything before it succeeded, and then only as a
    /// warning.
    async fn disconnect<T>(driver: &mut C::Session, host: &str, outcome: Result<T>) -> Result<T> {
        let closed = driver.close().await;
        let value = outcome?;
        if let Err(e) = closed {
            warn!("Closing session to {host} failed: {e}");
        }
        Ok(value)
    }
}

/// What happened to one device's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Written { host: String, path: PathBuf },
    Applied { host: String, commands: usize },
}

/// The run's single output: chosen once, before anything is rendered.
#[derive(Debug)]
pub enum Sink<C> {
    File(FileSink),
    Device(DeviceSink<C>),
}

impl<C: Connector> Sink<C> {
    /// Dry-run sink. Never builds a connector.
    pub fn dry_run(path: OutputPath) -> Self {
        Sink::File(FileSink::new(path))
    }

    /// Live sink. `make` is where credentials are loaded, so a missing
    /// credential fails here, before any session exists.
    pub fn live<F>(make: F) -> Result<Self>
    where
        F: FnOnce() -> Result<C>,
    {
        Ok(Sink::Device(DeviceSink::new(make()?)))
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, Sink::File(_))
    }

    /// Checks that need every device of the run up front.
    pub fn prepare(&self, devices: &[(&str, Side)], mode: Mode) -> Result<()> {
        match self {
            Sink::File(sink) => sink.check_paths(devices, mode),
            Sink::Device(_) => Ok(()),
        }
    }

    /// Check one device for planned ids already in use. Dry runs never
    /// contact a device, so the check is skipped there.
    pub async fn preflight(&self, host: &str, check: &Preflight) -> Result<()> {
        match self {
            Sink::File(_) => {
                debug!("Dry run, skipping preflight for {host}");
                Ok(())
            }
            Sink::Device(sink) => sink.preflight(host, check).await,
        }
    }

    /// Deliver one device's payload.
    pub async fn deliver(&self, host: &str, side: Side, payload: &Payload) -> Result<Delivery> {
        match self {
            Sink::File(sink) => {
                let path = sink.write(host, side, payload).await?;
                Ok(Delivery::Written {
                    host: host.to_string(),
                    path,
                })
            }
            Sink::Device(sink) => {
                let commands = sink.deliver(host, payload).await?;
                Ok(Delivery::Applied {
                    host: host.to_string(),
                    commands,
                })
            }
        }
    }
}
