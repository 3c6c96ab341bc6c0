//! Log sentinel detection
//!
//! A testing payload signals completion by printing the exact line
//! `Capstan Testing Done` to standard output. Detection is a pure function
//! over the retrieved log body, safe to call repeatedly against progressively
//! longer bodies as the completion poll advances.

/// The exact line a testing payload prints on completion
///
/// Matching is case-sensitive and whole-line (after trimming surrounding
/// whitespace). Test payloads must print this constant verbatim.
pub const SENTINEL: &str = "Capstan Testing Done";

/// Return true iff the log body contains the completion sentinel
///
/// The body is split into lines, each trimmed of surrounding whitespace, and
/// compared exactly against [`SENTINEL`]. Substring and partial-line matches
/// do not count.
pub fn is_complete(log_bytes: &[u8]) -> bool {
    let body = String::from_utf8_lossy(log_bytes);
    body.lines().any(|line| line.trim() == SENTINEL)
}
