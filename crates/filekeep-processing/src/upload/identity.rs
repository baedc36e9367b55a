//! Unique file names for stored uploads.
//!
//! Format: `{YYYYmmddHHMMSS}_{token}_{hash8}.{ext}`. The random token and the hash
//! fragment keep names apart when the same caller uploads several files within
//! one second; the timestamp alone would not.

use chrono::{DateTime, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

use super::types::{GeneratedIdentity, UploadOptions, UploadRequest};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
pub const TOKEN_LENGTH: usize = 8;
/// Alphanumerics without `0 O o 1 l I`
pub const TOKEN_ALPHABET: &[u8] = b"23456789abcdefghijkmnpqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ";
const HASH_FRAGMENT_LENGTH: usize = 8;

/// Generate the stored name and path for `request` under `options.path`.
pub fn generate_identity(request: &UploadRequest, options: &UploadOptions) -> GeneratedIdentity {
    generate_identity_at(Utc::now(), request, options)
}

pub fn generate_identity_at(
    now: DateTime<Utc>,
    request: &UploadRequest,
    options: &UploadOptions,
) -> GeneratedIdentity {
    let mut file_name = format!(
        "{}_{}_{}",
        now.format(TIMESTAMP_FORMAT),
        random_token(TOKEN_LENGTH),
        hash_fragment(request.hash_name()),
    );
    if !request.extension().is_empty() {
        file_name.push('.');
        file_name.push_str(request.extension());
    }

    GeneratedIdentity::new(&options.path, file_name)
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

fn hash_fragment(hash_name: &str) -> String {
    let digest = Sha256::digest(hash_name.as_bytes());
    let mut fragment = hex::encode(digest);
    fragment.truncate(HASH_FRAGMENT_LENGTH);
    fragment
}
