// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! orc-engine: the service layer that mediates the version-control
//! adapter, the session store, the worker spawner, and the plan parser.
//!
//! - [`session_service::SessionService`] owns every mutation of a single
//!   repository's session records.
//! - [`multi_repo::MultiRepoService`] fans that out across every
//!   configured repository, dispatches change events, and fires
//!   status-edge hooks with at-least-once, dedup-by-`previousStatus`
//!   semantics.
//! - [`loop_controller::LoopController`] drives the iterative ("ralph")
//!   spawn -> wait-for-exit -> evaluate-plan -> re-spawn cycle for one
//!   session.
//! - [`hook_executor::HookExecutor`] runs command hooks with variable
//!   substitution.

pub mod error;
pub mod hook_executor;
pub mod loop_controller;
pub mod multi_repo;
pub mod session_service;

pub use error::ServiceError;
pub use hook_executor::{HookExecutor, HookOutcome, HookVars};
pub use loop_controller::{LoopController, LoopDecision, LoopError, LoopState, LoopStatus};
pub use multi_repo::MultiRepoService;
pub use session_service::{DeleteResult, HeartbeatResult, SessionService};
