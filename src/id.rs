//! Record identifiers
//!
//! Generated ids look like `<prefix>-<unix-millis>-<suffix>` where the suffix
//! is seven random base36 characters, e.g. `like-1718000000000-k3x9a0q`.
//! Featured references use positional ids: `featured-<index>`.

use chrono::Utc;
use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 7;

/// Generate a fresh, practically unique identifier with the given prefix
pub fn generate(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{}-{}-{}", prefix, millis, suffix)
}

/// Identifier of the featured reference at `index`
pub fn featured(index: usize) -> String {
    format!("featured-{}", index)
}
