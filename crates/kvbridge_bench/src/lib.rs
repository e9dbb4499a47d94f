//! Benchmark utilities.

use rand::Rng;

/// Generate random bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate wide text of exactly `size` encoded bytes (ASCII only).
pub fn wide_text(size: usize) -> Vec<u16> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen_range(0x20u16..0x7f)).collect()
}

/// Generate `count` distinct keys of `size` bytes.
pub fn generate_keys(count: usize, size: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| {
            let mut key = format!("{i:08}").into_bytes();
            key.resize(size.max(key.len()), b'k');
            key
        })
        .collect()
}
