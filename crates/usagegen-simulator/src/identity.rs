//! Identifier generation for workspaces and branches.

use rand::Rng;

/// Generates a random (version 4) UUID string from `rng`.
///
/// Drawing the bytes from the run's random source instead of the OS keeps
/// seeded runs reproducible, ids included.
pub fn new_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let bytes: [u8; 16] = rng.gen();
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .hyphenated()
        .to_string()
}

/// Generates `count` unique identifiers.
pub fn generate_ids<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<String> {
    (0..count).map(|_| new_id(rng)).collect()
}
