use chrono::Utc;
use rand::Rng;

const SUFFIX_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SUFFIX_LEN: usize = 9;

/// `BKG-<unix millis>-<9 base36 chars>`. Collisions are practically
/// impossible; the unique index on `booking_reference` is the backstop.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();

    format!("BKG-{}-{}", Utc::now().timestamp_millis(), suffix)
}
