//! IMAP command tag generator.
//!
//! Tags are used to match commands with their responses.

/// Tag generator for IMAP commands.
///
/// Generates sequential tags such as `A0001`, `A0002`. Each client owns its
/// generators, so tags never leak between connections.
#[derive(Debug, Clone)]
pub struct TagGenerator {
    counter: u64,
    prefix: char,
}

impl TagGenerator {
    /// Creates a generator whose first tag is `{prefix}{start:04}`.
    #[must_use]
    pub const fn new(prefix: char, start: u64) -> Self {
        Self {
            counter: start,
            prefix,
        }
    }

    /// Generator for the main command stream (`A0001`, `A0002`, ...).
    #[must_use]
    pub const fn commands() -> Self {
        Self::new('A', 1)
    }

    /// Generator for section fetches (`F1001`, `F1002`, ...).
    #[must_use]
    pub const fn fetches() -> Self {
        Self::new('F', 1001)
    }

    /// Generates the next tag.
    #[must_use]
    pub fn next(&mut self) -> String {
        let n = self.counter;
        self.counter = self.counter.wrapping_add(1);
        format!("{}{:04}", self.prefix, n)
    }

    /// Returns the number the next tag will carry.
    #[must_use]
    pub const fn peek(&self) -> u64 {
        self.counter
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::commands()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_command_tags_start_at_one() {
        let mut generator = TagGenerator::default();
        assert_eq!(generator.next(), "A0001");
        assert_eq!(generator.next(), "A0002");
        assert_eq!(generator.next(), "A0003");
    }

    #[test]
    fn test_fetch_tags_start_at_1001() {
        let mut generator = TagGenerator::fetches();
        assert_eq!(generator.next(), "F1001");
        assert_eq!(generator.next(), "F1002");
    }

    #[test]
    fn test_generators_are_independent() {
        let mut commands = TagGenerator::commands();
        let mut fetches = TagGenerator::fetches();
        let _ = commands.next();
        let _ = commands.next();
        assert_eq!(fetches.next(), "F1001");
        assert_eq!(commands.next(), "A0003");
    }

    #[test]
    fn test_peek() {
        let mut generator = TagGenerator::new('X', 7);
        assert_eq!(generator.peek(), 7);
        let _ = generator.next();
        assert_eq!(generator.peek(), 8);
    }

    #[test]
    fn test_uniqueness() {
        let mut generator = TagGenerator::default();
        let mut seen = std::collections::HashSet::new();

        for _ in 0..20000 {
            let tag = generator.next();
            assert!(seen.insert(tag), "duplicate tag generated");
        }
    }

    #[test]
    fn test_padding_grows_past_four_digits() {
        let mut generator = TagGenerator::new('A', 9999);
        assert_eq!(generator.next(), "A9999");
        assert_eq!(generator.next(), "A10000");
    }
}
