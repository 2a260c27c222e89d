// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared argument structs for CLI commands.

use clap::Args;

use super::OutputFormat;

/// Output format selection, flattened into commands with structured output.
#[derive(Args, Clone, Copy, Debug, Default)]
pub struct OutputArgs {
    #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
    pub output: OutputFormat,
}
