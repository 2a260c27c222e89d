// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Help text generation with colorization support.

use crate::colors;
use clap::builder::styling::Styles;

/// Clap styles matching the palette in [`colors::codes`].
pub fn styles() -> Styles {
    if !colors::should_colorize() {
        return Styles::plain();
    }

    use anstyle::{Ansi256Color, Color, Style};

    let fg = |code| Style::new().fg_color(Some(Color::Ansi256(Ansi256Color(code))));

    Styles::styled()
        .header(fg(colors::codes::HEADER))
        .usage(fg(colors::codes::HEADER))
        .literal(fg(colors::codes::LITERAL))
        .placeholder(fg(colors::codes::CONTEXT))
        .valid(fg(colors::codes::CONTEXT))
}

/// Main help template with colorized Options header.
pub fn template() -> String {
    format!(
        "{{about-with-newline}}
{{usage-heading}} {{usage}}

{{before-help}}{}
{{options}}{{after-help}}",
        colors::header("Options:")
    )
}

/// Commands list shown before options in main help.
pub fn commands() -> String {
    format!(
        "\
{header_scanning}
  {scan}        Record a scan against a cached session
  {status}      Change a session's status
  {session}     Show a cached session and its progress
  {download}    Cache a session bundle for offline use
  {clear}       Remove a cached session

{header_sync}
  {pending}     Show mutations waiting to sync
  {sync}        Replay the queue now
  {watch}       Keep syncing until interrupted
  {dropped}     List mutations that exhausted their retries

{header_setup}
  {init}        Initialize a scanner work directory
  {completion}  Generate shell completions
",
        header_scanning = colors::header("Scanning:"),
        header_sync = colors::header("Sync:"),
        header_setup = colors::header("Setup:"),
        scan = colors::literal("scan"),
        status = colors::literal("status"),
        session = colors::literal("session"),
        download = colors::literal("download"),
        clear = colors::literal("clear"),
        pending = colors::literal("pending"),
        sync = colors::literal("sync"),
        watch = colors::literal("watch"),
        dropped = colors::literal("dropped"),
        init = colors::literal("init"),
        completion = colors::literal("completion"),
    )
}

/// Quickstart help shown after options in main help.
pub fn quickstart() -> String {
    colors::examples(
        "\
Get started:
  stk init --remote ws://hq:7890    Initialize scanner
  stk download st-42.json           Cache a session
  stk scan st-42 <code>             Record a scan
  stk sync                          Push queued scans",
    )
}

#[cfg(test)]
#[path = "help_tests.rs"]
mod tests;
