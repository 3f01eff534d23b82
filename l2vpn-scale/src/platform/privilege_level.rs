//! Privilege level definition.

use regex::bytes::Regex;

/// One CLI mode of a device, recognised by its prompt.
///
/// Levels form a tree through `parent`; moving to a child uses the child's
/// `escalate_command`, moving back up uses its `deescalate_command`.
#[derive(Debug, Clone)]
pub struct PrivilegeLevel {
    /// Name of this level (e.g. "exec", "configuration").
    pub name: String,

    /// Prompt pattern for this level.
    pub pattern: Regex,

    /// Parent level, `None` for the root.
    pub parent: Option<String>,

    /// Command entering this level from the parent.
    pub escalate_command: Option<String>,

    /// Command returning from this level to the parent.
    pub deescalate_command: Option<String>,

    /// Password prompt shown while escalating, if any.
    pub escalate_prompt: Option<Regex>,

    /// Prompt substrings that rule this level out (`#` is shared by
    /// privileged exec and config mode).
    pub not_contains: Vec<String>,
}

impl PrivilegeLevel {
    /// Create a level from its name and prompt pattern.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            parent: None,
            escalate_command: None,
            deescalate_command: None,
            escalate_prompt: None,
            not_contains: vec![],
        })
    }

    /// Set the parent level and the commands moving between the two.
    pub fn with_parent(
        mut self,
        parent: impl Into<String>,
        escalate: impl Into<String>,
        deescalate: impl Into<String>,
    ) -> Self {
        self.parent = Some(parent.into());
        self.escalate_command = Some(escalate.into());
        self.deescalate_command = Some(deescalate.into());
        self
    }

    /// Escalation may ask for a password matching `prompt_pattern`.
    pub fn with_auth(mut self, prompt_pattern: &str) -> Result<Self, regex::Error> {
        self.escalate_prompt = Some(Regex::new(prompt_pattern)?);
        Ok(self)
    }

    /// Add a not_contains pattern.
    pub fn with_not_contains(mut self, pattern: impl Into<String>) -> Self {
        self.not_contains.push(pattern.into());
        self
    }

    /// Check if this privilege level matches a prompt.
    pub fn matches(&self, prompt: &str) -> bool {
        !self.not_contains.iter().any(|nc| prompt.contains(nc.as_str()))
            && self.pattern.is_match(prompt.as_bytes())
    }
}
