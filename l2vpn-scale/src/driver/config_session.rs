//! Configuration mode guard.
//!
//! IOS-XE applies each configuration line as soon as it is accepted, so there
//! is no candidate to discard: `commit` and `abort` both return to the level
//! the session started from. The guard holds `&mut GenericDriver` so nothing
//! else can talk to the device while configuration mode is open.

use log::warn;

use super::Driver;
use super::generic::GenericDriver;
use super::response::Response;
use crate::error::{DeviceResult, DriverError};

/// RAII guard for configuration mode.
pub struct ConfigSession<'a> {
    driver: &'a mut GenericDriver,
    original_privilege: String,
    consumed: bool,
}

impl<'a> ConfigSession<'a> {
    /// Enter configuration mode.
    pub async fn enter(driver: &'a mut GenericDriver) -> DeviceResult<Self> {
        let original_privilege = driver
            .privilege_manager()
            .current()
            .ok_or(DriverError::NotConnected)?
            .to_string();

        let config_privilege = driver
            .platform()
            .config_privilege()
            .ok_or_else(|| DriverError::NoConfigPrivilege {
                platform: driver.platform().name.clone(),
            })?
            .to_string();

        driver.acquire_privilege(&config_privilege).await?;

        Ok(Self {
            driver,
            original_privilege,
            consumed: false,
        })
    }

    /// Send one configuration line; a rejected line is an error.
    pub async fn send_command(&mut self, command: &str) -> DeviceResult<Response> {
        self.driver.send_command(command).await?.into_result()
    }

    /// Leave configuration mode after a complete batch.
    pub async fn commit(mut self) -> DeviceResult<()> {
        self.consumed = true;
        self.driver.acquire_privilege(&self.original_privilege).await
    }

    /// Leave configuration mode after a failure. Lines already accepted stay
    /// applied.
    pub async fn abort(mut self) -> DeviceResult<()> {
        self.consumed = true;
        warn!(
            "{}: configuration aborted, lines accepted so far remain in the running config",
            self.driver.host()
        );
        self.driver.acquire_privilege(&self.original_privilege).await
    }
}

impl Drop for ConfigSession<'_> {
    fn drop(&mut self) {
        if !self.consumed {
            warn!("ConfigSession dropped without commit or abort");
        }
    }
}
