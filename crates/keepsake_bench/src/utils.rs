//! Benchmark utilities.

use keepsake_testkit::Counter;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Generate random bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate a random alphanumeric string.
pub fn random_text(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate a counter carrying `tags` tags of `tag_len` characters each.
pub fn counter_with_tags(tags: usize, tag_len: usize) -> Counter {
    let mut rng = rand::thread_rng();
    Counter::new(rng.gen(), rng.gen_range(1..u32::MAX))
        .with_label(random_text(32))
        .with_tags((0..tags).map(|_| random_text(tag_len)))
}
