//! Secure randomness for session ids, identity tokens and turn order.
//!
//! Everything here draws from a fallible RNG and reports failure instead of
//! degrading to a predictable source.

use crate::error::{GameError, GameResult};
use rand::rngs::OsRng;
use rand::TryRngCore;

/// Character set for session ids
const SESSION_ID_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
pub const SESSION_ID_LENGTH: usize = 8;

/// Bytes of entropy in an identity token (hex encoded to twice this length)
const IDENTITY_BYTES: usize = 16;

fn randomness_error(e: impl std::fmt::Display) -> GameError {
    GameError::Randomness(e.to_string())
}

/// Uniform index in `0..bound` using rejection sampling.
pub fn uniform_index<R: TryRngCore + ?Sized>(rng: &mut R, bound: usize) -> GameResult<usize> {
    let bound = u32::try_from(bound)
        .map_err(|_| GameError::Randomness(format!("range too large: {}", bound)))?;
    if bound == 0 {
        return Err(GameError::Randomness("empty range".to_string()));
    }

    // Largest multiple of `bound` that fits; anything at or above it is biased
    let limit = u32::MAX - (u32::MAX % bound);
    loop {
        let value = rng.try_next_u32().map_err(randomness_error)?;
        if value < limit {
            return Ok((value % bound) as usize);
        }
    }
}

/// Fisher-Yates shuffle where every swap index is drawn uniformly.
pub fn shuffle<T, R: TryRngCore + ?Sized>(items: &mut [T], rng: &mut R) -> GameResult<()> {
    for i in (1..items.len()).rev() {
        let j = uniform_index(rng, i + 1)?;
        items.swap(i, j);
    }
    Ok(())
}

/// Shuffle with the OS random source
pub fn secure_shuffle<T>(items: &mut [T]) -> GameResult<()> {
    shuffle(items, &mut OsRng)
}

/// Random session id, e.g. `aZ3kQ9xP`
pub fn session_id<R: TryRngCore + ?Sized>(rng: &mut R) -> GameResult<String> {
    (0..SESSION_ID_LENGTH)
        .map(|_| uniform_index(rng, SESSION_ID_CHARS.len()).map(|i| SESSION_ID_CHARS[i] as char))
        .collect()
}

/// Opaque identity token: 16 random bytes, hex encoded
pub fn identity_token() -> GameResult<String> {
    let mut buf = [0u8; IDENTITY_BYTES];
    OsRng.try_fill_bytes(&mut buf).map_err(randomness_error)?;
    Ok(hex::encode(buf))
}


#[cfg(test)]
mod tests {
    use super::test_support::ScriptedRng;
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    /// RNG that always fails, standing in for an unavailable OS source
    struct BrokenRng;

    impl TryRngCore for BrokenRng {
        type Error = std::fmt::Error;

        fn try_next_u32(&mut self) -> Result<u32, Self::Error> {
            Err(std::fmt::Error)
        }

        fn try_next_u64(&mut self) -> Result<u64, Self::Error> {
            Err(std::fmt::Error)
        }

        fn try_fill_bytes(&mut self, _dst: &mut [u8]) -> Result<(), Self::Error> {
            Err(std::fmt::Error)
        }
    }

    #[test]
    fn test_uniform_index_rejects_biased_values() {
        // For bound 3, u32::MAX itself lies in the rejected tail
        let mut rng = ScriptedRng(vec![u32::MAX, 7]);
        assert_eq!(uniform_index(&mut rng, 3).unwrap(), 1);
    }

    #[test]
    fn test_uniform_index_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for bound in 1..50 {
            for _ in 0..20 {
                assert!(uniform_index(&mut rng, bound).unwrap() < bound);
            }
        }
    }

    #[test]
    fn test_uniform_index_empty_range() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(uniform_index(&mut rng, 0).is_err());
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut items: Vec<u32> = (0..20).collect();
        shuffle(&mut items, &mut rng).unwrap();

        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_reaches_every_ordering() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = HashSet::new();
        for _ in 0..500 {
            let mut items = vec!['a', 'b', 'c'];
            shuffle(&mut items, &mut rng).unwrap();
            seen.insert(items);
        }
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn test_shuffle_single_item_needs_no_randomness() {
        let mut items = vec!["solo"];
        assert!(shuffle(&mut items, &mut BrokenRng).is_ok());
    }

    #[test]
    fn test_randomness_failure_is_reported() {
        let mut items = vec![1, 2, 3];
        let result = shuffle(&mut items, &mut BrokenRng);
        assert!(matches!(result, Err(GameError::Randomness(_))));
        assert!(session_id(&mut BrokenRng).is_err());
    }

    #[test]
    fn test_session_id_format() {
        let mut rng = StdRng::seed_from_u64(9);
        let id = session_id(&mut rng).unwrap();
        assert_eq!(id.len(), SESSION_ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_identity_token_format() {
        let a = identity_token().unwrap();
        let b = identity_token().unwrap();
        assert_eq!(a.len(), IDENTITY_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
