use crate::config::Lang;

/// Cache key for translated fragments.
///
/// Keys are opaque MD5 hashes of all inputs that influence a translation:
/// the fragment text, the backend and model producing it, and the target
/// language. Same inputs = same key; any change produces a different key;
/// keys are fixed-length (32 hex chars) for consistent storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hash: String,
}

impl CacheKey {
    pub fn from_fragment(text: &str, translator: &str, model: &str, target_lang: &Lang) -> Self {
        // Null-byte separators prevent collisions between inputs like
        // ("a", "bc") and ("ab", "c")
        let combined = format!(
            "{}\0{}\0{}\0{}",
            text,
            translator.to_lowercase(),
            model,
            target_lang.as_str(),
        );

        Self {
            hash: format!("{:x}", md5::compute(combined.as_bytes())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}
