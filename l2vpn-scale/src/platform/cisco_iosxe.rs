//! Cisco IOS-XE platform definition.
//!
//! ```text
//! pe1>                               # exec
//! pe1#                               # privilege_exec
//! pe1(config)#                       # configuration
//! pe1(config-if-srv)#                # configuration, service instance
//! pe1(config-ip-sla-y1731-delay)#    # configuration, IP SLA operation
//! ```
//!
//! ```text
//! exec ──enable──► privilege_exec ──configure terminal──► configuration
//!      ◄─disable──                ◄──────────end─────────
//! ```

use super::{PlatformDefinition, PrivilegeLevel};

/// Build the IOS-XE platform definition.
pub fn platform() -> Result<PlatformDefinition, regex::Error> {
    let exec = PrivilegeLevel::new("exec", r"(?mi)^[\w.\-@/:]{1,63}>\s?$")?;

    // "(config" rules out configuration mode, which also ends in '#'
    let privilege_exec = PrivilegeLevel::new("privilege_exec", r"(?mi)^[\w.\-@/:]{1,63}#\s?$")?
        .with_parent("exec", "enable", "disable")
        .with_auth(r"(?mi)^password:\s?$")?
        .with_not_contains("(conf");

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^[\w.\-@/:]{1,63}\(conf[\w.\-@/:+]{0,63}\)#\s?$",
    )?
    .with_parent("privilege_exec", "configure terminal", "end");

    Ok(PlatformDefinition::new("cisco_iosxe")
        .with_privilege(exec)
        .with_privilege(privilege_exec)
        .with_privilege(configuration)
        .with_default_privilege("privilege_exec")
        .with_failure_pattern("% Invalid input")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Unknown command")
        .with_failure_pattern("%Error")
        .with_failure_pattern("% Error")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 511")
        .with_terminal_size(511, 24))
}
