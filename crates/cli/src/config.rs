// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TOML configuration file
//!
//! ```toml
//! [coordinator]
//! lock_key = "job_queue_lock"
//! lock_retry_interval = "10ms"
//! lock_timeout = "30s"
//! turn_lease = "5s"
//! ```

use anyhow::{Context, Result};
use baton_engine::CoordinatorConfig;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    coordinator: CoordinatorConfig,
}

/// Coordinator settings from `path`, or the defaults when no file is given
pub fn load(path: Option<&Path>) -> Result<CoordinatorConfig> {
    let Some(path) = path else {
        return Ok(CoordinatorConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse(&content).with_context(|| format!("invalid config {}", path.display()))
}

fn parse(content: &str) -> Result<CoordinatorConfig> {
    let file: ConfigFile = toml::from_str(content)?;
    Ok(file.coordinator)
}
