// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! The variable name constants are generated by `build.rs` and live in the
//! [`vars`] submodule.

/// Generated environment variable name constants.
pub mod vars {
    include!(concat!(env!("OUT_DIR"), "/env_vars.rs"));
}

/// Returns the log filter directive from `STK_LOG`, if set.
pub fn log_filter() -> Option<String> {
    std::env::var(vars::STK_LOG).ok().filter(|v| !v.is_empty())
}

/// Returns `true` if `NO_COLOR=1`.
pub fn no_color() -> bool {
    std::env::var(vars::NO_COLOR).is_ok_and(|v| v == "1")
}

/// Returns `true` if `COLOR=1`.
pub fn force_color() -> bool {
    std::env::var(vars::COLOR).is_ok_and(|v| v == "1")
}

/// Returns the operator name from `STK_OPERATOR`, overriding the configured one.
pub fn operator() -> Option<String> {
    std::env::var(vars::STK_OPERATOR)
        .ok()
        .filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
