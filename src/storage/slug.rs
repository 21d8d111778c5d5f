use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Turns free text into a filesystem-safe token.
///
/// Accented characters degrade to their base letter ("é" -> "e"),
/// anything outside `[A-Za-z0-9_-]` and whitespace is dropped, and each
/// internal whitespace run becomes a single underscore. Empty or
/// all-punctuation input yields an empty string; callers must tolerate that.
pub fn slug(text: &str) -> String {
    let folded: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '_' || *c == '-')
        .collect();

    let mut out = String::with_capacity(folded.len());
    for word in folded.split_whitespace() {
        if !out.is_empty() {
            out.push('_');
        }
        out.push_str(word);
    }
    out
}
