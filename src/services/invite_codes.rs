use rand::Rng;
use sha2::{Digest, Sha256};

use crate::db::types::OrgRole;

const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const SUFFIX_LEN: usize = 10;

/// Human-typeable code such as `ACME-INST-7KQ2M9XWRT`. Only its hash is stored.
pub(crate) fn generate_invite_code(organization_slug: &str, role: OrgRole) -> String {
    let role_prefix = match role {
        OrgRole::Owner => "OWN",
        OrgRole::Admin => "ADM",
        OrgRole::Instructor => "INST",
        OrgRole::Student => "STUD",
    };

    let slug_prefix = organization_slug
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .take(6)
        .collect::<String>()
        .to_uppercase();

    format!("{slug_prefix}-{role_prefix}-{}", random_suffix(SUFFIX_LEN))
}

/// Codes are matched case-insensitively and ignore surrounding whitespace.
pub(crate) fn hash_invite_code(invite_code: &str) -> String {
    let normalized = invite_code.trim().to_uppercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char).collect()
}
