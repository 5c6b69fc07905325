// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `baton verify <path>` - Check an output file for interleaved writes

use crate::demo::LINE;
use crate::output::{print, OutputFormat};
use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Args)]
pub struct VerifyArgs {
    /// Output file written by `baton run`
    pub path: PathBuf,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct Report {
    path: PathBuf,
    paragraphs: usize,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ok: {} paragraphs in {}",
            self.paragraphs,
            self.path.display()
        )
    }
}

pub fn verify(args: VerifyArgs) -> Result<()> {
    let contents = std::fs::read_to_string(&args.path)
        .with_context(|| format!("failed to read {}", args.path.display()))?;

    match check(&contents) {
        Ok(paragraphs) => {
            print(
                &Report {
                    path: args.path,
                    paragraphs,
                },
                args.format,
            );
            Ok(())
        }
        Err((index, paragraph)) => {
            bail!("paragraph {index} is corrupted: {paragraph:?}")
        }
    }
}

/// Count complete paragraphs, or return the first one that is neither empty
/// nor the expected line
fn check(contents: &str) -> Result<usize, (usize, &str)> {
    let mut complete = 0;
    for (index, paragraph) in contents.split("\n\n").enumerate() {
        match paragraph.trim() {
            "" => {}
            LINE => complete += 1,
            _ => return Err((index, paragraph)),
        }
    }
    Ok(complete)
}
