// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Fixed-width table of the ring contents, printed on shutdown.

use std::fmt::Write;

use super::ring::Slot;

const BORDER: &str = "    --------------";
const SEPARATOR: &str = "    |------------|";

/// Rendered value of an empty slot
pub const EMPTY_MARKER: i64 = -1;

/// Render `slots` highest index first, one row per slot.
pub fn render(slots: &[Slot]) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str(BORDER);
    out.push('\n');

    for (index, slot) in slots.iter().enumerate().rev() {
        let value = slot.value().map_or(EMPTY_MARKER, i64::from);
        // Writing to a String cannot fail
        let _ = writeln!(out, "{:<4}|  {:>8}  |", index, value);
        if index > 0 {
            out.push_str(SEPARATOR);
            out.push('\n');
        }
    }

    out.push_str(BORDER);
    out.push('\n');
    out
}
