//! Chain-wide constants.

/// Epoch of the `BlockTimestamp` type: 2000-01-01T00:00:00 UTC, in milliseconds
/// since the UNIX epoch.
pub const BLOCK_TIMESTAMP_EPOCH: u64 = 946_684_800_000;

/// Interval between two consecutive blocks, in milliseconds.
pub const BLOCK_INTERVAL_MS: u32 = 500;

/// Maximum nesting depth when resolving an `ABIDefinition` into a type graph.
pub const MAX_RESOLVE_DEPTH: usize = 32;

/// Maximum nesting depth when transcoding a value through a type graph.
pub const MAX_TRANSCODE_DEPTH: usize = 128;
