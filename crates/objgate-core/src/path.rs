//! Object key construction from logical `(folder, name)` pairs.
//!
//! Keys are built with path-join semantics: folder and name are joined with
//! a single `/` and empty segments are dropped from the whole key, so no
//! key ends in `/`. An empty folder leaves the name untouched. No escaping
//! or validation of either component is performed; callers own key safety
//! for user input.

/// Build the canonical object key for `name` inside `folder`.
///
/// # Examples
///
/// ```
/// use objgate_core::path::build_key;
///
/// assert_eq!(build_key("", "x"), "x");
/// assert_eq!(build_key("/a/", "x"), "a/x");
/// assert_eq!(build_key("a//b", "x"), "a/b/x");
/// ```
#[must_use]
pub fn build_key(folder: &str, name: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        return name.to_owned();
    }

    let mut key = String::with_capacity(folder.len() + name.len() + 1);
    for segment in folder.split('/').chain(name.split('/')) {
        if segment.is_empty() {
            continue;
        }
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(segment);
    }
    key
}

/// Build the listing prefix selecting everything inside `folder`.
///
/// Unlike [`build_key`], the result keeps a trailing `/` so that `images`
/// does not also match `images2/...`. An empty folder selects the whole bucket.
#[must_use]
pub fn folder_prefix(folder: &str) -> String {
    let key = build_key(folder, "");
    if key.is_empty() { key } else { key + "/" }
}

/// Split a key into `(folder, name)` on the last `/`.
///
/// Keys without a separator have an empty folder.
#[must_use]
pub fn split_key(key: &str) -> (&str, &str) {
    key.rsplit_once('/').unwrap_or(("", key))
}
