//! Identifier generation
//!
//! Identifiers are version-4 UUIDs rendered in canonical text form. The
//! generator draws from the OS CSPRNG via the `uuid` crate and is safe to
//! call from any task concurrently.

use uuid::Uuid;

/// Generate a fresh opaque identifier.
pub fn generate() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_canonical_text_form() {
        let id = generate();
        assert_eq!(id.len(), 36);
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_no_duplicates_in_batch() {
        let ids: HashSet<String> = (0..10_000).map(|_| generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_concurrent_generation_is_unique() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| (0..1_000).map(|_| generate()).collect::<Vec<_>>()))
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id), "duplicate identifier generated");
            }
        }
    }
}
