// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `orch dashboard` — a terminal client for the push channel.
//!
//! The dashboard is served over the same Unix control socket as every other
//! command, not a separate HTTP/WebSocket listener (see the push-channel
//! note in the project's design ledger) — `--open`/`--port` are accepted
//! for surface compatibility but have nothing to open or bind to here.

use crate::daemon_process::daemon_socket;
use crate::output::OutputFormat;
use anyhow::{anyhow, Result};
use clap::Args;
use orc_core::{Session, SessionId};
use orc_daemon::protocol_wire;
use orc_daemon::{PushServerMessage, Request};
use std::collections::HashMap;
use tokio::net::UnixStream;

#[derive(Args)]
pub struct DashboardArgs {
    /// Accepted for compatibility; this build has no browser UI to open.
    #[arg(long)]
    pub open: bool,
    /// Accepted for compatibility; the push channel runs over the control
    /// socket, not a TCP port.
    #[arg(long)]
    pub port: Option<u16>,
}

pub async fn dashboard(args: DashboardArgs, format: OutputFormat) -> Result<()> {
    if args.open || args.port.is_some() {
        eprintln!("note: dashboard is served over the local control socket; --open/--port have no effect");
    }

    let socket_path = daemon_socket().map_err(|e| anyhow!("{e}"))?;
    let stream = UnixStream::connect(&socket_path).await.map_err(|_| anyhow!("daemon not running"))?;
    let (mut reader, mut writer) = stream.into_split();

    protocol_wire::write_message(&mut writer, &protocol_wire::encode(&Request::HelloDashboard)?).await?;

    let mut sessions: HashMap<SessionId, Session> = HashMap::new();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            frame = protocol_wire::read_message(&mut reader) => {
                let bytes = frame?;
                let Ok(msg) = protocol_wire::decode::<PushServerMessage>(&bytes) else {
                    continue;
                };
                match msg {
                    PushServerMessage::SessionAdd { session } | PushServerMessage::SessionUpdate { session } => {
                        sessions.insert(session.id.clone(), *session);
                    }
                    PushServerMessage::SessionRemove { session_id } => {
                        sessions.remove(&session_id);
                    }
                    // Terminal proxy messages: out of scope for the plain
                    // session-table view this client renders.
                    PushServerMessage::TerminalConnected { .. }
                    | PushServerMessage::TerminalData { .. }
                    | PushServerMessage::TerminalExit { .. }
                    | PushServerMessage::TerminalError { .. } => {}
                }
                render(&sessions, format);
            }
            _ = &mut ctrl_c => break,
        }
    }

    Ok(())
}

fn render(sessions: &HashMap<SessionId, Session>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            if let Ok(s) = serde_json::to_string(&sessions.values().collect::<Vec<_>>()) {
                println!("{s}");
            }
        }
        OutputFormat::Text => {
            print!("\x1b[2J\x1b[H");
            println!("{} active session(s)", sessions.len());
            for session in sessions.values() {
                println!(
                    "  {} [{}] #{} {}",
                    session.id,
                    crate::color::status(&session.status.to_string()),
                    session.issue.number,
                    session.repo
                );
            }
        }
    }
}
