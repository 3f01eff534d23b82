//! SSH transport layer wrapping russh.
//!
//! Connection setup, password login and PTY shell creation. Everything above
//! this layer only sees a [`russh::Channel`].

pub mod config;
mod ssh;

pub use config::{HostKeyVerification, SshConfig};
pub use ssh::SshTransport;
