//! Error types for l2vpn-scale.
//!
//! Device-side failures are layered the same way the SSH stack is: transport,
//! channel and driver errors roll up into [`DeviceError`]. Everything else sits
//! beside it under the crate-level [`Error`].

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for l2vpn-scale operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing credentials or broken environment configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Template load or substitution errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Invalid arguments or ranges
    #[error("Argument error: {0}")]
    Argument(#[from] ArgumentError),

    /// Template read or output write failures
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Connection, authentication or command rejection on a device
    #[error("Device error on {host}: {source}")]
    Device {
        host: String,
        #[source]
        source: DeviceError,
    },
}

impl Error {
    /// Attach the device address to a device-side error.
    pub fn device(host: impl Into<String>, source: impl Into<DeviceError>) -> Self {
        Self::Device {
            host: host.into(),
            source: source.into(),
        }
    }

    /// The operator-facing category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::Template(_) => ErrorKind::Configuration,
            Self::Argument(_) => ErrorKind::Argument,
            Self::Io(_) => ErrorKind::Io,
            Self::Device { .. } => ErrorKind::Device,
        }
    }
}

/// Error categories, each with its own process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Argument,
    Io,
    Device,
}

impl ErrorKind {
    /// Exit status reported to the shell. 2 matches clap's usage errors.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Argument => 2,
            Self::Configuration => 3,
            Self::Io => 4,
            Self::Device => 5,
        }
    }
}

/// Environment / credential errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required credential variable is unset or empty
    #[error("environment variable '{var}' is not set (export it or add it to .env)")]
    MissingCredential { var: &'static str },

    /// A `.env` file exists but could not be parsed
    #[error("failed to load .env: {0}")]
    Dotenv(String),
}

/// Template errors.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// The template does not parse
    #[error("template '{name}' is invalid: {message}")]
    Syntax { name: String, message: String },

    /// The template references a placeholder the renderer does not provide
    #[error("template '{name}' references unknown field '{field}'")]
    MissingField { name: String, field: String },

    /// None of the per-circuit identifier fields appear in the template
    #[error("template '{name}' references no circuit identifier field, blocks would not be distinct")]
    NoIdentifier { name: String },

    /// Tera failed while rendering
    #[error("failed to render template '{name}': {message}")]
    Render { name: String, message: String },
}

/// Argument and range errors detected after parsing.
#[derive(Error, Debug)]
pub enum ArgumentError {
    /// Circuit identifiers must stay inside the 802.1Q range
    #[error("circuit range {start}..{end} leaves 1..=4094")]
    RangeOutOfBounds { start: u32, end: u64 },

    /// An identifier outside the run's range was asked for
    #[error("circuit {id} is outside the planned range starting at {start} ({count} circuits)")]
    IdentifierOutOfRange { id: u32, start: u32, count: usize },

    /// Derived IP SLA operation ids must stay inside 1..=2147483647
    #[error("IP SLA ids {base}..={last} leave 1..=2147483647")]
    SlaOutOfBounds { base: u32, last: u64 },

    /// Two devices would write the same dry-run file
    #[error("output path '{}' is used for more than one device; add {{host}} or {{side}} to it", .path.display())]
    OutputPathClash { path: PathBuf },

    /// Planned identifiers are already configured on the device
    #[error("{host} already uses {collisions}; pick another --start or --sla-base")]
    PreflightCollision { host: String, collisions: String },
}

/// File system errors, carrying the path involved.
#[derive(Error, Debug)]
pub enum IoError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors raised while talking to a device.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host key not present in known_hosts (strict checking)
    #[error("Host key for {host}:{port} is not in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the recorded one
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Channel layer errors (pattern matching, PTY operations).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Prompt not seen before the deadline; carries what was received
    #[error("Pattern not found within {timeout:?}; last output:\n{output}")]
    PatternTimeout { timeout: Duration, output: String },

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(#[from] russh::Error),
}

/// Driver layer errors (command execution, privilege escalation).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Driver not connected
    #[error("Driver not connected - call open() first")]
    NotConnected,

    /// Driver already connected
    #[error("Driver already connected")]
    AlreadyConnected,

    /// The device reported an error for a command
    #[error("command '{command}' rejected:\n{output}")]
    CommandRejected { command: String, output: String },

    /// Failed to acquire target privilege level
    #[error("Failed to acquire privilege level '{target}'")]
    PrivilegeAcquisitionFailed { target: String },

    /// Unknown privilege level detected
    #[error("Unknown privilege level from prompt: '{prompt}'")]
    UnknownPrivilege { prompt: String },

    /// No path found between privilege levels
    #[error("No path from privilege '{from}' to '{to}'")]
    NoPrivilegePath { from: String, to: String },

    /// The platform has no configuration mode
    #[error("Platform '{platform}' defines no configuration privilege level")]
    NoConfigPrivilege { platform: String },

    /// A platform prompt pattern does not compile
    #[error("Invalid prompt pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Result type alias using the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for device-side operations.
pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_exit_codes() {
        let err: Error = ConfigError::MissingCredential { var: "username" }.into();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.kind().exit_code(), 3);

        let err: Error = TemplateError::NoIdentifier {
            name: "l2vpn.j2".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err: Error = ArgumentError::RangeOutOfBounds { start: 4000, end: 4100 }.into();
        assert_eq!(err.kind().exit_code(), 2);

        let err = Error::device("10.0.0.1", DriverError::NotConnected);
        assert_eq!(err.kind(), ErrorKind::Device);
        assert_eq!(err.kind().exit_code(), 5);
    }

    #[test]
    fn test_device_error_carries_response_text() {
        let err = Error::device(
            "10.0.0.1",
            DriverError::CommandRejected {
                command: "encapsulation dot1q 5000".to_string(),
                output: "% Invalid input detected at '^' marker.".to_string(),
            },
        );
        let message = err.to_string();
        assert!(message.contains("10.0.0.1"));
        assert!(std::error::Error::source(&err)
            .map(|s| s.to_string().contains("% Invalid input"))
            .unwrap_or(false));
    }
}
