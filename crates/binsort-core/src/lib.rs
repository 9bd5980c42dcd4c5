//! Decision logic for the recycling sorter: class confidences, command
//! classification, activation lockout and rolling frame-rate samples.

pub mod command;
pub mod labels;
pub mod lockout;
pub mod ring;

pub use command::{ClassConfidenceMap, Command, CommandRule, CommandTable, CONFIDENCE_FLOOR};
pub use labels::ClassNames;
pub use lockout::{Activation, AdvancePolicy, Lockout, LockoutState, Verdict};
pub use ring::SampleWindow;
