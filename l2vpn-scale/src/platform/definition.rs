//! Platform definition: prompts, privilege levels and error markers of a
//! device family.

use indexmap::IndexMap;
use regex::bytes::Regex;

use super::privilege_level::PrivilegeLevel;

/// Everything the driver needs to know about a device family.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g. "cisco_iosxe").
    pub name: String,

    /// Privilege levels, root first.
    pub privilege_levels: IndexMap<String, PrivilegeLevel>,

    /// Level the driver settles in after login.
    pub default_privilege: String,

    /// Output substrings that mean the device rejected a command.
    pub failed_when_contains: Vec<String>,

    /// Commands run once after login (paging off and the like).
    pub on_open_commands: Vec<String>,

    /// Terminal width for the PTY.
    pub terminal_width: u32,

    /// Terminal height for the PTY.
    pub terminal_height: u32,
}

impl PlatformDefinition {
    /// Create an empty platform definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            privilege_levels: IndexMap::new(),
            default_privilege: String::new(),
            failed_when_contains: vec![],
            on_open_commands: vec![],
            terminal_width: 511,
            terminal_height: 24,
        }
    }

    /// Add a privilege level.
    pub fn with_privilege(mut self, level: PrivilegeLevel) -> Self {
        self.privilege_levels.insert(level.name.clone(), level);
        self
    }

    /// Set the default privilege level.
    pub fn with_default_privilege(mut self, name: impl Into<String>) -> Self {
        self.default_privilege = name.into();
        self
    }

    /// Add a failure pattern.
    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Add an on_open command.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// Set terminal dimensions.
    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// The level whose escalation command enters configuration mode.
    pub fn config_privilege(&self) -> Option<&str> {
        self.privilege_levels
            .keys()
            .find(|name| name.contains("config"))
            .map(String::as_str)
    }

    /// One regex matching the prompt of any level.
    pub fn prompt_pattern(&self) -> Result<Regex, regex::Error> {
        let combined = self
            .privilege_levels
            .values()
            .map(|level| format!("(?:{})", level.pattern.as_str()))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&combined)
    }

    /// Strip the command echo and the trailing prompt line from raw output.
    pub fn normalize_output(&self, raw: &str, command: &str) -> String {
        let output = raw
            .trim_start_matches(['\r', '\n'])
            .strip_prefix(command)
            .unwrap_or(raw)
            .trim_start_matches(['\r', '\n']);

        match memchr::memrchr(b'\n', output.as_bytes()) {
            Some(pos) => output[..pos].trim_end().to_string(),
            None => String::new(),
        }
    }

    /// The first failure marker present in `output`.
    pub fn detect_failure(&self, output: &str) -> Option<&str> {
        self.failed_when_contains
            .iter()
            .find(|pattern| output.contains(pattern.as_str()))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform() -> PlatformDefinition {
        PlatformDefinition::new("test")
            .with_privilege(PrivilegeLevel::new("user", r"(?m)^\w+>\s?$").unwrap())
            .with_privilege(
                PrivilegeLevel::new("configuration", r"(?m)^\w+\(config[\w\-]*\)#\s?$")
                    .unwrap()
                    .with_parent("user", "configure", "end"),
            )
            .with_failure_pattern("% Invalid input")
    }

    #[test]
    fn test_normalize_output() {
        let platform = platform();
        let raw = "show clock\n*10:00:00.000 UTC Mon Jan 1 2024\nrouter>";
        assert_eq!(
            platform.normalize_output(raw, "show clock"),
            "*10:00:00.000 UTC Mon Jan 1 2024"
        );
    }

    #[test]
    fn test_normalize_output_prompt_only() {
        let platform = platform();
        assert_eq!(platform.normalize_output("end\nrouter>", "end"), "");
        assert_eq!(platform.normalize_output("router>", "end"), "");
    }

    #[test]
    fn test_detect_failure() {
        let platform = platform();
        let output = "encapsulation dot1q 9999\n                       ^\n% Invalid input detected at '^' marker.";
        assert_eq!(platform.detect_failure(output), Some("% Invalid input"));
        assert_eq!(platform.detect_failure("ok"), None);
    }

    #[test]
    fn test_combined_prompt_pattern() {
        let platform = platform();
        let pattern = platform.prompt_pattern().unwrap();
        assert!(pattern.is_match(b"router>"));
        assert!(pattern.is_match(b"router(config-if)#"));
        assert!(!pattern.is_match(b"router#"));
    }

    #[test]
    fn test_config_privilege() {
        assert_eq!(platform().config_privilege(), Some("configuration"));
        assert_eq!(PlatformDefinition::new("empty").config_privilege(), None);
    }
}
