//! Activation lockout
//!
//! After a command fires, further commands are suppressed until the lockout
//! window has fully elapsed. The comparison is strict: a command arriving
//! exactly `duration` after the last activation is still suppressed.

use crate::command::Command;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// When the activation timestamp moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancePolicy {
    /// Advance as soon as a fire is decided, whatever happens downstream.
    #[default]
    OnAttempt,
    /// Advance only once the caller confirms the activation went through.
    /// A failed publish or write leaves the machine idle for the next frame.
    OnConfirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutState {
    Idle,
    Locked,
}

/// A decided activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    pub command: Command,
    pub at: SystemTime,
}

/// Outcome of evaluating one frame's command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    NoCommand,
    Fire(Activation),
    Suppressed { command: Command, remaining: Duration },
}

#[derive(Debug, Clone)]
pub struct Lockout {
    duration: Duration,
    policy: AdvancePolicy,
    last_activation: Option<SystemTime>,
}

impl Lockout {
    pub fn new(duration: Duration, policy: AdvancePolicy) -> Self {
        Self {
            duration,
            policy,
            last_activation: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn policy(&self) -> AdvancePolicy {
        self.policy
    }

    pub fn last_activation(&self) -> Option<SystemTime> {
        self.last_activation
    }

    /// Time since the last activation. A clock that went backwards counts
    /// as no time elapsed.
    fn elapsed_at(&self, now: SystemTime) -> Option<Duration> {
        self.last_activation
            .map(|last| now.duration_since(last).unwrap_or(Duration::ZERO))
    }

    pub fn state_at(&self, now: SystemTime) -> LockoutState {
        match self.elapsed_at(now) {
            Some(elapsed) if elapsed <= self.duration => LockoutState::Locked,
            _ => LockoutState::Idle,
        }
    }

    pub fn evaluate(&mut self, now: SystemTime, command: Option<Command>) -> Verdict {
        let Some(command) = command else {
            return Verdict::NoCommand;
        };

        if let Some(elapsed) = self.elapsed_at(now) {
            if elapsed <= self.duration {
                return Verdict::Suppressed {
                    command,
                    remaining: self.duration - elapsed,
                };
            }
        }

        if self.policy == AdvancePolicy::OnAttempt {
            self.last_activation = Some(now);
        }
        Verdict::Fire(Activation { command, at: now })
    }

    /// Report that an activation's side effects succeeded. Only moves the
    /// window under [`AdvancePolicy::OnConfirmed`].
    pub fn confirm(&mut self, activation: &Activation) {
        if self.policy != AdvancePolicy::OnConfirmed {
            return;
        }
        match self.last_activation {
            Some(last) if last >= activation.at => {}
            _ => self.last_activation = Some(activation.at),
        }
    }
}
