use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Builds `{namespace}:{sha256-hex}` from the request parameters.
///
/// Pairs are sorted by name before hashing, so the same parameters in any
/// order produce the same key. Each name and value is length-prefixed so
/// that `("a", "bc")` and `("ab", "c")` do not collide.
pub fn build_key<I, K, V>(namespace: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let sorted: BTreeMap<String, String> = params
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();

    let mut hasher = Sha256::new();
    for (name, value) in &sorted {
        hasher.update((name.len() as u64).to_be_bytes());
        hasher.update(name.as_bytes());
        hasher.update((value.len() as u64).to_be_bytes());
        hasher.update(value.as_bytes());
    }

    format!("{namespace}:{:x}", hasher.finalize())
}
