//! Control commands and the per-frame class confidence map

pub mod confidence;
pub mod table;

pub use confidence::{ClassConfidenceMap, CONFIDENCE_FLOOR};
pub use table::{CommandRule, CommandTable};

use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Actuation command understood by the sorting bin controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Command {
    Paper,
    Plastic,
    Metal,
}

impl Command {
    pub const ALL: [Command; 3] = [Command::Paper, Command::Plastic, Command::Metal];

    /// Wire payload sent to the actuation channel
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Paper => "PAPER",
            Command::Plastic => "PLASTIC",
            Command::Metal => "METAL",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        match Command::ALL.iter().find(|c| c.as_str() == upper) {
            Some(command) => Ok(*command),
            None => bail!("Unknown command: '{}'", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_payloads() {
        assert_eq!(Command::Paper.to_string(), "PAPER");
        assert_eq!(Command::Plastic.as_str(), "PLASTIC");
        assert_eq!(Command::Metal.as_str(), "METAL");
    }

    #[test]
    fn test_command_from_str() {
        assert_eq!("metal".parse::<Command>().unwrap(), Command::Metal);
        assert_eq!(" Paper ".parse::<Command>().unwrap(), Command::Paper);
        assert!("GLASS".parse::<Command>().is_err());
    }
}
