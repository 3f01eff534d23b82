//! PTY channel for interactive device sessions.

use std::time::Duration;

use log::trace;
use regex::bytes::Regex;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use tokio::time::Instant;

use super::buffer::PatternBuffer;
use crate::error::{ChannelError, DeviceResult};

/// Configuration for PTY channel behavior.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// How many trailing bytes are searched for a prompt.
    pub search_depth: usize,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self { search_depth: 1000 }
    }
}

/// A shell channel with prompt-terminated reads.
pub struct PtyChannel {
    channel: Channel<Msg>,
    buffer: PatternBuffer,
}

impl PtyChannel {
    /// Wrap an open shell channel.
    pub fn new(channel: Channel<Msg>, config: PtyConfig) -> Self {
        Self {
            channel,
            buffer: PatternBuffer::new(config.search_depth),
        }
    }

    /// Send one line of input.
    pub async fn send(&mut self, line: &str) -> DeviceResult<()> {
        trace!("> {}", line);
        let data = format!("{line}\n");
        self.channel
            .data(data.as_bytes())
            .await
            .map_err(ChannelError::Ssh)?;
        Ok(())
    }

    /// Read until the output ends with `pattern`, returning everything read.
    pub async fn read_until(&mut self, pattern: &Regex, timeout: Duration) -> DeviceResult<Vec<u8>> {
        let deadline = Instant::now() + timeout;

        while !self.buffer.ends_with_match(pattern) {
            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| ChannelError::PatternTimeout {
                    timeout,
                    output: self.buffer.tail_lossy(),
                })?;

            match msg {
                Some(ChannelMsg::Data { ref data }) => self.buffer.extend(data),
                Some(ChannelMsg::ExtendedData { ref data, .. }) => self.buffer.extend(data),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(ChannelError::Closed.into());
                }
                Some(_) => {}
            }
        }

        let data = self.buffer.take();
        trace!("< {}", String::from_utf8_lossy(&data));
        Ok(data)
    }

    /// Close the channel.
    pub async fn close(self) -> DeviceResult<()> {
        self.channel.close().await.map_err(ChannelError::Ssh)?;
        Ok(())
    }
}
