//! Slug and secret generation.

use rand::rngs::OsRng;
use rand::{Rng, RngCore};

// Wordlists are intentionally short; uniqueness comes from the hex suffix
// and the store's unique index, not from wordlist size. Words are picked to
// be unambiguous when spoken aloud and safe in a professional context.
const ADJECTIVES: &[&str] = &[
    "amber", "azure", "bold", "brisk", "calm", "cedar", "civic", "clear", "coral", "crisp",
    "early", "ember", "fair", "fleet", "frost", "gold", "grand", "green", "iron", "jade",
    "keen", "lean", "lunar", "mellow", "misty", "noble", "north", "olive", "opal", "pale",
    "prime", "quiet", "rapid", "regal", "ridge", "rosy", "rust", "sage", "sharp", "silver",
    "slate", "solar", "steady", "stone", "swift", "teal", "tidal", "vivid", "warm", "wild",
];

const NOUNS: &[&str] = &[
    "anchor", "arch", "basin", "beacon", "bluff", "branch", "breeze", "brook", "canyon",
    "cape", "cliff", "comet", "cove", "crag", "creek", "delta", "drift", "dune", "falcon",
    "fjord", "glade", "grove", "harbor", "heron", "inlet", "knoll", "lagoon", "marsh",
    "meadow", "mesa", "orchard", "osprey", "otter", "pier", "plateau", "prairie", "quarry",
    "reef", "ridge", "sound", "spruce", "summit", "swale", "tern", "thicket", "tundra",
    "valley", "vista", "wharf", "willow",
];

/// Generate a URL-safe slug of the form `adjective-noun-xxxx`, where xxxx
/// is a 4-character lowercase hex suffix. The suffix gives 65536 values,
/// enough to make collisions negligible on a single-node deployment; the
/// store's unique index on slug is the final arbiter.
pub fn generate_slug() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
    let suffix: u16 = rng.gen();
    format!("{adjective}-{noun}-{suffix:04x}")
}

/// Generate a 256-bit webhook signing secret as 64 lowercase hex chars.
/// Drawn from the OS entropy source because this value is a credential
/// (HMAC-SHA256 key for webhook signature verification), not an identifier.
pub fn generate_webhook_secret() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_has_three_parts_with_hex_suffix() {
        for _ in 0..50 {
            let slug = generate_slug();
            let parts: Vec<&str> = slug.split('-').collect();
            assert_eq!(parts.len(), 3, "unexpected slug shape: {slug}");
            assert_eq!(parts[2].len(), 4);
            assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn webhook_secret_is_64_hex_chars() {
        let secret = generate_webhook_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(secret, generate_webhook_secret());
    }
}
