//! Label to command lookup

use super::{ClassConfidenceMap, Command};
use serde::{Deserialize, Serialize};

/// A label containing `pattern` maps to `command`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRule {
    pub pattern: String,
    pub command: Command,
}

impl CommandRule {
    pub fn new(pattern: impl Into<String>, command: Command) -> Self {
        Self {
            pattern: pattern.into().to_uppercase(),
            command,
        }
    }

    fn matches(&self, label: &str) -> bool {
        // Rules loaded from config may not be upper-cased yet.
        label.contains(self.pattern.to_uppercase().as_str())
    }
}

/// Ordered substring rules. The first matching rule decides the command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTable {
    rules: Vec<CommandRule>,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::from_rules(
            Command::ALL
                .iter()
                .map(|command| CommandRule::new(command.as_str(), *command))
                .collect(),
        )
    }
}

impl CommandTable {
    pub fn from_rules(rules: Vec<CommandRule>) -> Self {
        Self { rules }
    }

    /// Append a rule evaluated after the existing ones
    pub fn with_rule(mut self, pattern: impl Into<String>, command: Command) -> Self {
        self.rules.push(CommandRule::new(pattern, command));
        self
    }

    pub fn rules(&self) -> &[CommandRule] {
        &self.rules
    }

    /// Command for a single (already upper-cased) label
    pub fn match_label(&self, label: &str) -> Option<Command> {
        let label = label.to_uppercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&label))
            .map(|rule| rule.command)
    }

    /// Command for the winning class of a frame. A winner that matches no
    /// rule yields no command, even when other classes in the frame would.
    pub fn classify(&self, classes: &ClassConfidenceMap) -> Option<Command> {
        classes
            .best()
            .and_then(|(label, _)| self.match_label(label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_matching() {
        let table = CommandTable::default();
        assert_eq!(table.match_label("CARDBOARD_PAPER"), Some(Command::Paper));
        assert_eq!(table.match_label("plastic_bottle"), Some(Command::Plastic));
        assert_eq!(table.match_label("METAL_CAN"), Some(Command::Metal));
        assert_eq!(table.match_label("GLASS"), None);
    }

    #[test]
    fn test_rule_order_decides() {
        let table = CommandTable::default();
        // Contains both PAPER and METAL; PAPER is listed first.
        assert_eq!(table.match_label("METAL_PAPER_MIX"), Some(Command::Paper));
    }

    #[test]
    fn test_empty_map_gives_no_command() {
        assert_eq!(CommandTable::default().classify(&ClassConfidenceMap::new()), None);
    }

    #[test]
    fn test_unmapped_winner_gives_no_command() {
        let classes: ClassConfidenceMap = [("GLASS", 0.97), ("METAL", 0.7)].into_iter().collect();
        assert_eq!(CommandTable::default().classify(&classes), None);
    }

    #[test]
    fn test_extra_rule_extends_table() {
        let table = CommandTable::default().with_rule("carton", Command::Paper);
        let classes: ClassConfidenceMap = [("CARTON", 0.8)].into_iter().collect();
        assert_eq!(table.classify(&classes), Some(Command::Paper));
        assert_eq!(table.rules().len(), 4);
    }
}
