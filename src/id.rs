//! Job identifier generation.
//!
//! Job IDs double as directory names, so they must be safe in both
//! Windows and POSIX path segments (notably: no colons) and short enough
//! to stay clear of path-length limits. They are also the only ordering
//! signal across a bridge root, so they sort lexicographically in
//! creation order: the fixed-width UTC millisecond timestamp is the most
//! significant component, followed by the submission sequence number.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;

/// Generate a job identifier from a caller-maintained sequence counter.
///
/// The result has the form `<yyyymmddThhmmssmmm>-<seq>-<rand>`: an
/// 18-character UTC timestamp at millisecond resolution, the sequence
/// number modulo 10 000 zero-padded to four digits, and two random bytes
/// as four hex digits. Total length 28, well under the 30-character
/// budget, using only path-safe characters.
///
/// The random suffix, not the sequence, is what makes IDs unique across
/// the 10 000-wrap boundary: two calls with identical timestamp and
/// sequence still collide only with probability 1/65 536.
///
/// # Examples
///
/// ```
/// let id = fsbridge::id::next_id(42);
/// assert!(id.len() <= 30);
/// assert!(!id.contains(':'));
/// assert_eq!(id.split('-').count(), 3);
/// ```
pub fn next_id(sequence: u32) -> String {
    let timestamp = Utc::now().format("%Y%m%dT%H%M%S%3f");
    let suffix: u16 = rand::random();
    format!("{timestamp}-{:04}-{suffix:04x}", sequence % 10_000)
}

/// A sequence-counter wrapper around [`next_id`].
///
/// Holds the monotonically increasing counter so callers submitting from
/// several tasks share one ordering without external locking.
#[derive(Debug, Default)]
pub struct IdGenerator {
    sequence: AtomicU32,
}

impl IdGenerator {
    /// Create a generator with the sequence counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate the next identifier.
    pub fn next(&self) -> String {
        next_id(self.sequence.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_shape() {
        let id = next_id(7);
        assert_eq!(id.len(), 28);
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 18);
        assert_eq!(parts[1], "0007");
        assert_eq!(parts[2].len(), 4);
    }

    #[test]
    fn id_uses_only_path_safe_characters() {
        let id = next_id(9_999);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == 'T'));
    }

    #[test]
    fn sequence_wraps_modulo_10_000() {
        let id = next_id(10_003);
        assert_eq!(id.split('-').nth(1), Some("0003"));
    }

    #[test]
    fn generator_increments() {
        let generator = IdGenerator::new();
        let a = generator.next();
        let b = generator.next();
        assert_eq!(a.split('-').nth(1), Some("0000"));
        assert_eq!(b.split('-').nth(1), Some("0001"));
    }
}
