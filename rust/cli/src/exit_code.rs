//! Exit codes returned by [`crate::run`].

pub const SUCCESS: i32 = 0;

/// Any failure: bad arguments, unreadable input, engine errors.
pub const ERROR: i32 = 2;
