// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Registered,
    Planning,
    PlanningComplete,
    Working,
    Shipping,
    ReviewsInProgress,
    PrReady,
    Stuck,
    Paused,
    Complete,
    Cancelled,
    Deleting,
    DeletionFailed,
}

impl SessionStatus {
    /// Terminal states never transition further.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Complete | SessionStatus::Cancelled)
    }

    /// States counted for the staleness predicate.
    pub fn is_active_for_staleness(self) -> bool {
        matches!(
            self,
            SessionStatus::Planning | SessionStatus::PlanningComplete | SessionStatus::Working
        )
    }

    /// Validate a transition from `self` to `next`.
    ///
    /// `registered -> working` is the one transition the service drives
    /// automatically right after spawn; all others are explicit operator or
    /// worker self-reports. `deleting`/`deletion_failed` are reached only
    /// through the dedicated delete/rollback operations, never through
    /// `update`, so they are excluded here and checked by the caller.
    pub fn validate_transition(self, next: SessionStatus) -> Result<(), TransitionError> {
        use SessionStatus::*;
        if self == next {
            return Ok(());
        }
        let allowed = match self {
            Registered => matches!(next, Working | Cancelled),
            Working => matches!(
                next,
                Planning
                    | PlanningComplete
                    | Stuck
                    | Paused
                    | Shipping
                    | Cancelled
            ),
            Planning => matches!(next, Working | PlanningComplete | Stuck | Cancelled),
            PlanningComplete => matches!(next, Working | Planning | Stuck | Cancelled),
            Shipping => matches!(next, ReviewsInProgress | Stuck | Cancelled),
            ReviewsInProgress => matches!(next, PrReady | Stuck | Cancelled),
            PrReady => matches!(next, Complete | Stuck | Cancelled),
            Stuck => matches!(next, Working | Paused | Cancelled),
            Paused => matches!(next, Working | Cancelled),
            Complete | Cancelled => false,
            Deleting | DeletionFailed => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Registered => "registered",
            SessionStatus::Planning => "planning",
            SessionStatus::PlanningComplete => "planning_complete",
            SessionStatus::Working => "working",
            SessionStatus::Shipping => "shipping",
            SessionStatus::ReviewsInProgress => "reviews_in_progress",
            SessionStatus::PrReady => "pr_ready",
            SessionStatus::Stuck => "stuck",
            SessionStatus::Paused => "paused",
            SessionStatus::Complete => "complete",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Deleting => "deleting",
            SessionStatus::DeletionFailed => "deletion_failed",
        };
        write!(f, "{s}")
    }
}

/// Illegal transition attempted via `update`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("illegal transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: SessionStatus,
    pub to: SessionStatus,
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
