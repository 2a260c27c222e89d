// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal color utilities for help and command output.
//!
//! Respects environment variables:
//! - `NO_COLOR=1`: Disables colors
//! - `COLOR=1`: Forces colors even without TTY

use std::io::IsTerminal;

use crate::env;

/// ANSI 256-color codes.
pub mod codes {
    /// Section headers: steel blue
    pub const HEADER: u8 = 74;
    /// Commands and literals: light grey
    pub const LITERAL: u8 = 250;
    /// Defaults and hints: medium grey
    pub const CONTEXT: u8 = 245;
    /// Healthy state: green
    pub const OK: u8 = 71;
    /// Lost or failing state: red
    pub const ALERT: u8 = 167;
}

const RESET: &str = "\x1b[0m";

/// Check if colors should be enabled based on TTY and environment variables.
pub fn should_colorize() -> bool {
    if env::no_color() {
        return false;
    }
    if env::force_color() {
        return true;
    }
    std::io::stdout().is_terminal()
}

fn paint(code: u8, text: &str) -> String {
    if !should_colorize() {
        return text.to_string();
    }
    format!("\x1b[38;5;{code}m{text}{RESET}")
}

pub fn header(text: &str) -> String {
    paint(codes::HEADER, text)
}

pub fn literal(text: &str) -> String {
    paint(codes::LITERAL, text)
}

pub fn context(text: &str) -> String {
    paint(codes::CONTEXT, text)
}

pub fn ok(text: &str) -> String {
    paint(codes::OK, text)
}

pub fn alert(text: &str) -> String {
    paint(codes::ALERT, text)
}

/// Colorize an examples help block.
///
/// Lines ending in `:` become headers. On example lines the command (text
/// before the first run of two or more spaces) is shown as a literal.
pub fn examples(text: &str) -> String {
    if !should_colorize() {
        return text.to_string();
    }

    text.lines()
        .map(|line| {
            let trimmed = line.trim_start();
            let indent = &line[..line.len() - trimmed.len()];
            if trimmed.ends_with(':') && !trimmed.contains("  ") {
                return format!("{indent}{}", header(trimmed));
            }
            match find_description_start(trimmed) {
                Some(end) => format!(
                    "{indent}{}{}",
                    literal(&trimmed[..end]),
                    &trimmed[end..]
                ),
                None if !trimmed.is_empty() => format!("{indent}{}", literal(trimmed)),
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Find where the description starts (at the first run of 2+ spaces).
pub fn find_description_start(line: &str) -> Option<usize> {
    let start = line.find("  ")?;
    let rest = &line[start..];
    (!rest.trim().is_empty()).then_some(start)
}

#[cfg(test)]
#[path = "colors_tests.rs"]
mod tests;
