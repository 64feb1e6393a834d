// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured logging support for effects.

/// An operation that can describe itself to a tracing span.
pub trait TracedEffect {
    /// Short snake_case name used as the span's `effect` field.
    fn name(&self) -> &'static str;

    /// Key/value pairs logged when the operation starts.
    fn fields(&self) -> Vec<(&'static str, String)>;
}
