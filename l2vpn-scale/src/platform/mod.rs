//! Device platform support.
//!
//! A platform describes prompts, privilege levels and failure markers; the
//! driver is generic over it. Only Cisco IOS-XE is provided.

pub mod cisco_iosxe;
mod definition;
mod privilege_level;

pub use definition::PlatformDefinition;
pub use privilege_level::PrivilegeLevel;
