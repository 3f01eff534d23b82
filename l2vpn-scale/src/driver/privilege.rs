//! Privilege level tracking and navigation.
//!
//! Levels form a tree through their `parent` links, so the route between two
//! levels is: climb from the source to the closest common ancestor, then
//! descend to the target.

use indexmap::IndexMap;
use regex::bytes::Regex;

use crate::error::{DeviceResult, DriverError};
use crate::platform::PrivilegeLevel;

/// Tracks the current privilege level and plans moves between levels.
#[derive(Debug)]
pub struct PrivilegeManager {
    levels: IndexMap<String, PrivilegeLevel>,
    current: Option<String>,
}

/// One step between adjacent levels.
#[derive(Debug, Clone)]
pub struct Transition {
    /// Command to send.
    pub command: String,

    /// Password prompt that may follow the command.
    pub auth_prompt: Option<Regex>,
}

impl PrivilegeManager {
    /// Create a manager with no current level.
    pub fn new(levels: IndexMap<String, PrivilegeLevel>) -> Self {
        Self {
            levels,
            current: None,
        }
    }

    /// The level whose pattern matches `prompt`.
    pub fn determine_from_prompt(&self, prompt: &str) -> DeviceResult<&PrivilegeLevel> {
        self.levels
            .values()
            .find(|level| level.matches(prompt))
            .ok_or_else(|| {
                DriverError::UnknownPrivilege {
                    prompt: prompt.to_string(),
                }
                .into()
            })
    }

    /// Current level name, if known.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Record the current level from a prompt.
    pub fn update_from_prompt(&mut self, prompt: &str) -> DeviceResult<&str> {
        let name = self.determine_from_prompt(prompt)?.name.clone();
        Ok(self.current.insert(name).as_str())
    }

    /// `name` followed by each of its ancestors up to the root.
    fn lineage(&self, name: &str) -> DeviceResult<Vec<String>> {
        let mut chain = Vec::new();
        let mut next = Some(name);

        while let Some(level_name) = next {
            // A parent cycle would never reach a root
            if chain.len() > self.levels.len() || chain.iter().any(|n| n == level_name) {
                break;
            }
            let level = self.levels.get(level_name).ok_or_else(|| {
                DriverError::UnknownPrivilege {
                    prompt: level_name.to_string(),
                }
            })?;
            chain.push(level.name.clone());
            next = level.parent.as_deref();
        }

        Ok(chain)
    }

    /// Levels visited going from `from` to `to`, both included.
    pub fn find_path(&self, from: &str, to: &str) -> DeviceResult<Vec<String>> {
        let up = self.lineage(from)?;
        let down = self.lineage(to)?;

        let Some((up_idx, down_idx)) = up
            .iter()
            .enumerate()
            .find_map(|(i, name)| down.iter().position(|n| n == name).map(|j| (i, j)))
        else {
            return Err(DriverError::NoPrivilegePath {
                from: from.to_string(),
                to: to.to_string(),
            }
            .into());
        };

        let mut path: Vec<String> = up[..=up_idx].to_vec();
        path.extend(down[..down_idx].iter().rev().cloned());
        Ok(path)
    }

    /// The command moving between two adjacent levels.
    pub fn transition(&self, from: &str, to: &str) -> Option<Transition> {
        let from_level = self.levels.get(from)?;
        let to_level = self.levels.get(to)?;

        if to_level.parent.as_deref() == Some(from) {
            return Some(Transition {
                command: to_level.escalate_command.clone()?,
                auth_prompt: to_level.escalate_prompt.clone(),
            });
        }

        if from_level.parent.as_deref() == Some(to) {
            return Some(Transition {
                command: from_level.deescalate_command.clone()?,
                auth_prompt: None,
            });
        }

        None
    }
}
