//! Command response.

use std::fmt;
use std::time::Duration;

use crate::error::{DeviceResult, DriverError};

/// Output of one command.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was sent.
    pub command: String,

    /// Output with the echo and trailing prompt removed.
    pub result: String,

    /// The prompt that ended the output.
    pub prompt: String,

    /// Time from send to prompt.
    pub elapsed: Duration,

    /// Failure marker found in the output, if any.
    pub failure_message: Option<String>,
}

impl Response {
    /// Create a successful response.
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            prompt: prompt.into(),
            elapsed,
            failure_message: None,
        }
    }

    /// Mark the response as rejected by the device.
    pub fn with_failure(mut self, marker: impl Into<String>) -> Self {
        self.failure_message = Some(marker.into());
        self
    }

    /// Check if the response indicates success.
    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }

    /// Turn a rejected command into [`DriverError::CommandRejected`].
    pub fn into_result(self) -> DeviceResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(DriverError::CommandRejected {
                command: self.command,
                output: self.result,
            }
            .into())
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceError;

    #[test]
    fn test_success_passes_through() {
        let response = Response::new("no shutdown", "", "pe1(config-if)#", Duration::ZERO);
        assert!(response.into_result().is_ok());
    }

    #[test]
    fn test_failure_becomes_error() {
        let response = Response::new(
            "service instance 5000 ethernet",
            "% Invalid input detected at '^' marker.",
            "pe1(config-if)#",
            Duration::from_millis(12),
        )
        .with_failure("% Invalid input");

        match response.into_result() {
            Err(DeviceError::Driver(DriverError::CommandRejected { command, output })) => {
                assert_eq!(command, "service instance 5000 ethernet");
                assert!(output.contains("Invalid input"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
