//! Device drivers.
//!
//! [`GenericDriver`] runs an interactive CLI session over SSH for any
//! [`PlatformDefinition`](crate::platform::PlatformDefinition). The
//! [`Driver`] trait is what the delivery layer depends on.

mod builder;
mod config_session;
mod generic;
mod privilege;
mod response;

pub use builder::DriverBuilder;
pub use config_session::ConfigSession;
pub use generic::GenericDriver;
pub use privilege::{PrivilegeManager, Transition};
pub use response::Response;

use std::future::Future;

use crate::error::DeviceResult;

/// A session with one device.
pub trait Driver: Send {
    /// Connect, log in and settle at the default privilege level.
    fn open(&mut self) -> impl Future<Output = DeviceResult<()>> + Send;

    /// Disconnect. Closing a driver that is not open is a no-op.
    fn close(&mut self) -> impl Future<Output = DeviceResult<()>> + Send;

    /// Send a command and wait for the prompt.
    fn send_command(&mut self, command: &str) -> impl Future<Output = DeviceResult<Response>> + Send;

    /// Apply `commands` in configuration mode, in order.
    ///
    /// Stops at the first command the device rejects and returns
    /// [`DriverError::CommandRejected`](crate::error::DriverError::CommandRejected)
    /// with the device's response text.
    fn send_config(
        &mut self,
        commands: &[&str],
    ) -> impl Future<Output = DeviceResult<Vec<Response>>> + Send;

    /// Check if the driver is connected.
    fn is_open(&self) -> bool;
}
