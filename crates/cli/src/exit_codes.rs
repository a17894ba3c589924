//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Code | Description                                    |
//! |------|------------------------------------------------|
//! | 0    | Success                                        |
//! | 1    | General error (unspecified)                    |
//! | 2    | CLI usage / configuration error                |
//! | 3    | Input file could not be read as tabular data   |
//! | 4    | Required column missing during reconciliation  |
//! | 5    | Required column missing during aggregation     |
//! | 6    | Seller name resolved to no known tax id        |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, bad config, rejected upload.
pub const EXIT_USAGE: u8 = 2;

/// Source read error - the input file could not be opened or parsed.
pub const EXIT_SOURCE_READ: u8 = 3;

/// Schema error - a required column was not found in an input dataset.
pub const EXIT_SCHEMA: u8 = 4;

/// Aggregation error - grouping columns missing from the dataset.
pub const EXIT_AGGREGATION: u8 = 5;

/// Unknown seller - a seller display name matched no tax id.
pub const EXIT_UNKNOWN_SELLER: u8 = 6;
