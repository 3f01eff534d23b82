//! Generic driver implementation that works with any platform.

use std::time::{Duration, Instant};

use log::{debug, trace};
use regex::bytes::Regex;

use super::Driver;
use super::config_session::ConfigSession;
use super::privilege::PrivilegeManager;
use super::response::Response;
use crate::channel::{PtyChannel, PtyConfig};
use crate::error::{DeviceResult, DriverError};
use crate::platform::PlatformDefinition;
use crate::transport::SshTransport;
use crate::transport::config::SshConfig;

/// An open connection: the SSH session and its shell channel.
struct Session {
    transport: SshTransport,
    channel: PtyChannel,
}

/// Driver for any platform described by a [`PlatformDefinition`].
pub struct GenericDriver {
    ssh_config: SshConfig,
    platform: PlatformDefinition,
    session: Option<Session>,
    privilege_manager: PrivilegeManager,
    timeout: Duration,
    /// Matches the prompt of any privilege level.
    prompt_pattern: Regex,
}

impl GenericDriver {
    /// Create a driver. Nothing is sent until [`Driver::open`].
    pub fn new(ssh_config: SshConfig, platform: PlatformDefinition) -> DeviceResult<Self> {
        let prompt_pattern = platform.prompt_pattern().map_err(DriverError::from)?;
        let privilege_manager = PrivilegeManager::new(platform.privilege_levels.clone());

        Ok(Self {
            timeout: ssh_config.timeout,
            ssh_config,
            platform,
            session: None,
            privilege_manager,
            prompt_pattern,
        })
    }

    /// Device address.
    pub fn host(&self) -> &str {
        &self.ssh_config.host
    }

    /// Get a reference to the platform definition.
    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    /// Get the privilege manager.
    pub fn privilege_manager(&self) -> &PrivilegeManager {
        &self.privilege_manager
    }

    fn channel(&mut self) -> DeviceResult<&mut PtyChannel> {
        self.session
            .as_mut()
            .map(|session| &mut session.channel)
            .ok_or_else(|| DriverError::NotConnected.into())
    }

    /// Read until `pattern`, returning the output and its last line.
    async fn read_until(&mut self, pattern: &Regex) -> DeviceResult<(String, String)> {
        let timeout = self.timeout;
        let data = self.channel()?.read_until(pattern, timeout).await?;
        let output = String::from_utf8_lossy(&data).into_owned();
        let prompt = last_line(&output).to_string();
        Ok((output, prompt))
    }

    async fn read_until_prompt(&mut self) -> DeviceResult<(String, String)> {
        let pattern = self.prompt_pattern.clone();
        let (output, prompt) = self.read_until(&pattern).await?;
        self.privilege_manager.update_from_prompt(&prompt)?;
        Ok((output, prompt))
    }

    /// Move to privilege level `target`, answering an enable password prompt
    /// with the login password.
    pub async fn acquire_privilege(&mut self, target: &str) -> DeviceResult<()> {
        let current = self
            .privilege_manager
            .current()
            .ok_or(DriverError::NotConnected)?
            .to_string();
        if current == target {
            return Ok(());
        }

        let path = self.privilege_manager.find_path(&current, target)?;
        debug!("{}: privilege path {}", self.host(), path.join(" -> "));

        for step in path.windows(2) {
            let (from, to) = (&step[0], &step[1]);
            let transition = self.privilege_manager.transition(from, to).ok_or_else(|| {
                DriverError::NoPrivilegePath {
                    from: from.clone(),
                    to: to.clone(),
                }
            })?;

            self.channel()?.send(&transition.command).await?;

            if let Some(auth) = transition.auth_prompt {
                let either = Regex::new(&format!(
                    "(?:{})|(?:{})",
                    auth.as_str(),
                    self.prompt_pattern.as_str()
                ))
                .map_err(DriverError::from)?;
                let (_, last) = self.read_until(&either).await?;

                if auth.is_match(last.as_bytes()) {
                    trace!("{}: answering enable password prompt", self.host());
                    let password = self.ssh_config.credentials.password().to_string();
                    self.channel()?.send(&password).await?;
                    self.read_until_prompt().await?;
                } else {
                    self.privilege_manager.update_from_prompt(&last)?;
                }
            } else {
                self.read_until_prompt().await?;
            }

            if self.privilege_manager.current() != Some(to.as_str()) {
                return Err(DriverError::PrivilegeAcquisitionFailed { target: to.clone() }.into());
            }
        }

        Ok(())
    }
}

impl Driver for GenericDriver {
    async fn open(&mut self) -> DeviceResult<()> {
        if self.session.is_some() {
            return Err(DriverError::AlreadyConnected.into());
        }

        let transport = SshTransport::connect(self.ssh_config.clone()).await?;
        let channel = match transport.open_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                transport.close().await.ok();
                return Err(e);
            }
        };
        self.session = Some(Session {
            transport,
            channel: PtyChannel::new(channel, PtyConfig::default()),
        });

        let (_, prompt) = self.read_until_prompt().await?;
        debug!("{}: initial prompt '{}'", self.host(), prompt);

        let default = self.platform.default_privilege.clone();
        if !default.is_empty() {
            self.acquire_privilege(&default).await?;
        }

        for command in self.platform.on_open_commands.clone() {
            self.send_command(&command).await?.into_result()?;
        }

        Ok(())
    }

    async fn close(&mut self) -> DeviceResult<()> {
        if let Some(session) = self.session.take() {
            debug!("{}: closing session", self.host());
            session.channel.close().await.ok();
            session.transport.close().await?;
        }
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> DeviceResult<Response> {
        let start = Instant::now();

        self.channel()?.send(command).await?;
        let (raw, prompt) = self.read_until_prompt().await?;

        let result = self.platform.normalize_output(&raw, command);
        let response = Response::new(command, result, prompt, start.elapsed());

        Ok(match self.platform.detect_failure(&response.result) {
            Some(marker) => {
                let marker = marker.to_string();
                response.with_failure(marker)
            }
            None => response,
        })
    }

    async fn send_config(&mut self, commands: &[&str]) -> DeviceResult<Vec<Response>> {
        let mut session = ConfigSession::enter(self).await?;
        let mut responses = Vec::with_capacity(commands.len());

        for command in commands {
            match session.send_command(command).await {
                Ok(response) => responses.push(response),
                Err(e) => {
                    if let Err(exit) = session.abort().await {
                        debug!("leaving configuration mode failed: {exit}");
                    }
                    return Err(e);
                }
            }
        }

        session.commit().await?;
        Ok(responses)
    }

    fn is_open(&self) -> bool {
        self.session.is_some()
    }
}

/// Last non-empty line of `output`, trimmed.
fn last_line(output: &str) -> &str {
    output
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
}
