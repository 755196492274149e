// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error boundary for `orc-core` itself: configuration loading and id
//! parsing failures. Downstream crates define their own error enums at
//! their own boundaries and wrap this one where they call into `orc-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read config at {path}: {source}")]
    ConfigIo {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    ConfigParse {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not determine home directory to locate config")]
    NoHomeDir,
}
