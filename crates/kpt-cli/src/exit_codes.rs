//! CLI exit codes (spec.md §6): the core defines three outcome classes, and
//! the demo binary's exit codes follow that table directly rather than the
//! donor's finer-grained sysexits.h split.

/// Operation completed without errors.
pub const SUCCESS: i32 = 0;

/// Validation or policy failure (malformed input, lifecycle violation,
/// capability denial, and the like).
pub const VALIDATION_ERROR: i32 = 1;

/// Transport or backend failure (adapter I/O, cancellation).
pub const BACKEND_ERROR: i32 = 2;
