//! Region display name → machine key.

use unicode_normalization::UnicodeNormalization;

/// ASCII, lowercase, underscore-joined key used to join regions with
/// capitals, high points and locations.
///
/// Diacritics are stripped via NFKD decomposition, `&` becomes `and`,
/// apostrophes vanish, and spaces, hyphens and slashes become `_`.
/// Applying it twice gives the same key.
pub fn normalize_name(name: &str) -> String {
    let ascii: String = name
        .nfkd()
        .filter(char::is_ascii)
        .collect::<String>()
        .to_lowercase();

    let mut key = String::with_capacity(ascii.len());
    for c in ascii.chars() {
        match c {
            '&' => key.push_str("and"),
            '\'' => {}
            ' ' | '-' | '/' => key.push('_'),
            other => key.push(other),
        }
    }
    key
}
