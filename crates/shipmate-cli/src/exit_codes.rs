//! Process exit codes
//!
//! Release runs are all-or-nothing from the caller's point of view, so every
//! fatal path shares one code.

/// Every requested step completed
pub const SUCCESS: i32 = 0;

/// Any fatal error: bad input, declined confirmation or remote failure
pub const ERROR: i32 = 1;
