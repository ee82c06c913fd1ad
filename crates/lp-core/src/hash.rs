//! Hashing helpers.
//!
//! Two kinds of hashing live here:
//!
//! - [`FxHashMap`] and [`FxHashSet`] aliases from the `rustc-hash` crate for
//!   in-memory tables keyed by paths and record ids. Fx is fast for string
//!   keys but is not stable across releases, so it never reaches disk.
//! - SHA-256 helpers ([`stable_path_key`], [`canonical_json_hash`]) for values
//!   that must be identical across process restarts, such as the file names
//!   of offset checkpoints.
//!
//! # Examples
//!
//! ```
//! use lp_core::{FxHashSet, fx_hash_set_with_capacity, stable_path_key};
//! use camino::Utf8Path;
//!
//! let mut seen: FxHashSet<String> = fx_hash_set_with_capacity(16);
//! seen.insert("sig-001".to_owned());
//!
//! let key = stable_path_key(Utf8Path::new("/inbox/signals.ndjson"));
//! assert!(key.starts_with("sha256_"));
//! ```

/// Fx-hashed map, used for per-path offsets and poll fingerprints.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// Fx-hashed set, used for the dedup window's id membership.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Creates an empty [`FxHashMap`].
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

/// Creates an [`FxHashSet`] that holds `capacity` ids without reallocating.
#[inline]
#[must_use]
pub fn fx_hash_set_with_capacity<V>(capacity: usize) -> FxHashSet<V> {
    FxHashSet::with_capacity_and_hasher(capacity, rustc_hash::FxBuildHasher)
}

/// Returns the `sha256:<hex>` digest of a JSON value in canonical form.
///
/// Canonical form is compact JSON with object keys sorted and `null` members
/// removed, so two values that differ only in key order or in absent-vs-null
/// optional fields hash identically.
///
/// # Examples
///
/// ```
/// use lp_core::canonical_json_hash;
/// use serde_json::json;
///
/// let a = canonical_json_hash(&json!({"b": 1, "a": 2, "c": null}));
/// let b = canonical_json_hash(&json!({"a": 2, "b": 1}));
/// assert_eq!(a, b);
/// assert!(a.starts_with("sha256:"));
/// ```
#[must_use]
pub fn canonical_json_hash(value: &serde_json::Value) -> String {
    let pruned = prune_nulls(value);
    // serde_json's default map is ordered by key, so serialization is canonical.
    let encoded = pruned.to_string();
    format!("sha256:{}", sha256_hex(encoded.as_bytes()))
}

/// Returns the stable key for a watched file path.
///
/// The key is the SHA-256 of the JSON-encoded path string, rendered as
/// `sha256_<hex>` so it can be used directly as a file name.
///
/// # Examples
///
/// ```
/// use lp_core::stable_path_key;
/// use camino::Utf8Path;
///
/// let key = stable_path_key(Utf8Path::new("/inbox/signals.ndjson"));
/// assert!(key.starts_with("sha256_"));
/// assert_eq!(key.len(), "sha256_".len() + 64);
/// assert_eq!(key, stable_path_key(Utf8Path::new("/inbox/signals.ndjson")));
/// ```
#[must_use]
pub fn stable_path_key(path: &camino::Utf8Path) -> String {
    let encoded = serde_json::Value::String(path.as_str().to_owned()).to_string();
    format!("sha256_{}", sha256_hex(encoded.as_bytes()))
}

fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn prune_nulls(value: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), prune_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(prune_nulls).collect()),
        other => other.clone(),
    }
}
