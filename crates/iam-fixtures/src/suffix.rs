use rand::Rng;

/// Length of the random suffix appended to fixture identifiers.
pub const SUFFIX_LEN: usize = 8;

/// Symbols from which suffixes are drawn. Pool and provider IDs only
/// admit lowercase letters, digits, and dashes.
pub const SUFFIX_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

/// Longest suffix for which `pool-{suffix}` fits the 32 character limit
/// on pool and provider IDs.
pub const MAX_SUFFIX_LEN: usize = 32 - "pool-".len();

/// Build a string of `length` characters, each drawn independently and
/// uniformly from `alphabet` using `rng`.
///
/// An empty `alphabet` yields an empty string.
pub fn generate_random_string<R>(rng: &mut R, length: usize, alphabet: &str) -> String
where
    R: Rng + ?Sized,
{
    let symbols: Vec<char> = alphabet.chars().collect();
    if symbols.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(length);
    for _ in 0..length {
        out.push(symbols[rng.gen_range(0..symbols.len())]);
    }
    out
}

/// Generate a fixture suffix of SUFFIX_LEN characters over SUFFIX_ALPHABET.
pub fn generate_suffix<R>(rng: &mut R) -> String
where
    R: Rng + ?Sized,
{
    generate_random_string(rng, SUFFIX_LEN, SUFFIX_ALPHABET)
}

/// Check that a caller-provided suffix may be used to build identifiers.
pub fn validate_suffix(suffix: &str) -> anyhow::Result<()> {
    if suffix.is_empty() {
        anyhow::bail!("suffix must not be empty");
    }
    if suffix.len() > MAX_SUFFIX_LEN {
        anyhow::bail!(
            "suffix {suffix:?} is {} characters, but may be at most {MAX_SUFFIX_LEN}",
            suffix.len()
        );
    }
    if let Some(bad) = suffix.chars().find(|c| !SUFFIX_ALPHABET.contains(*c)) {
        anyhow::bail!("suffix {suffix:?} contains {bad:?}, which is not in [a-z0-9]");
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn test_suffix_shape() {
        let mut rng = rand::thread_rng();

        for _ in 0..1000 {
            let suffix = generate_suffix(&mut rng);
            assert_eq!(suffix.len(), SUFFIX_LEN);
            assert!(
                suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()),
                "{suffix}"
            );
            validate_suffix(&suffix).unwrap();
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = generate_suffix(&mut SmallRng::seed_from_u64(8675309));
        let b = generate_suffix(&mut SmallRng::seed_from_u64(8675309));
        assert_eq!(a, b);

        let c = generate_suffix(&mut SmallRng::seed_from_u64(42));
        assert_ne!(a, c);
    }

    #[test]
    fn test_successive_draws_differ() {
        let mut rng = SmallRng::seed_from_u64(1);
        let first = generate_suffix(&mut rng);
        let second = generate_suffix(&mut rng);
        assert_ne!(first, second);
    }

    #[test]
    fn test_degenerate_inputs() {
        let mut rng = SmallRng::seed_from_u64(7);

        assert_eq!(generate_random_string(&mut rng, 0, SUFFIX_ALPHABET), "");
        assert_eq!(generate_random_string(&mut rng, 5, ""), "");
        assert_eq!(generate_random_string(&mut rng, 4, "x"), "xxxx");

        // Multi-byte symbols are drawn as whole characters.
        let s = generate_random_string(&mut rng, 6, "αβ");
        assert_eq!(s.chars().count(), 6);
        assert!(s.chars().all(|c| c == 'α' || c == 'β'));
    }

    #[test]
    fn test_validate_suffix() {
        validate_suffix("abc12345").unwrap();
        validate_suffix("z").unwrap();

        let err = validate_suffix("").unwrap_err();
        assert_eq!(err.to_string(), "suffix must not be empty");

        let err = validate_suffix("abC1").unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"suffix "abC1" contains 'C', which is not in [a-z0-9]"#
        );
        assert!(validate_suffix("ab-1").is_err());
    }

    #[test]
    fn test_validate_suffix_length() {
        let longest = "a".repeat(MAX_SUFFIX_LEN);
        validate_suffix(&longest).unwrap();
        assert_eq!(format!("pool-{longest}").len(), 32);

        let err = validate_suffix(&"a".repeat(MAX_SUFFIX_LEN + 1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"suffix "aaaaaaaaaaaaaaaaaaaaaaaaaaaa" is 28 characters, but may be at most 27"#
        );
    }
}
