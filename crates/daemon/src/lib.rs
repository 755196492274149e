// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestration daemon library.
//!
//! Exposes the IPC protocol types, the Unix-socket listener, the
//! single-instance startup/shutdown sequencing, and the per-repository
//! application state, so that `orc-cli` can speak the wire protocol without
//! depending on the `orcd` binary crate.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod lifecycle;
pub mod listener;
pub mod protocol;
pub mod protocol_wire;
pub mod ralph;
pub mod state;

pub use lifecycle::{Daemon, LifecycleError};
pub use protocol::{OrphanGroup, PushClientMessage, PushServerMessage, Request, Response};
pub use protocol_wire::{read_message, read_timed, write_message, write_timed, ProtocolError};
pub use state::{AppState, StateError};
