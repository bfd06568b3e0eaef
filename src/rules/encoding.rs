//! Encoding token validation for attribute files and config.

/// Default local (workstation) text encoding.
pub const DEFAULT_LOCAL_ENCODING: &str = "ISO8859-1";
/// Default remote text encoding (EBCDIC code page used by the store).
pub const DEFAULT_REMOTE_ENCODING: &str = "IBM-1047";

/// Encoding pair applied when no rule names one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingDefaults {
    pub local: String,
    pub remote: String,
}

impl Default for EncodingDefaults {
    fn default() -> Self {
        Self {
            local: DEFAULT_LOCAL_ENCODING.to_string(),
            remote: DEFAULT_REMOTE_ENCODING.to_string(),
        }
    }
}

/// True for encoding tokens the store understands (case-insensitive).
///
/// Accepts any WHATWG label (`UTF-8`, `UTF-16LE`, `UCS-2`, `latin1`, ...),
/// plain `EBCDIC`, `UCS-2BE`/`UCS-2LE`, and the numbered families
/// `ISO8859-<n>`, `IBM-<n>`, `CP<n>`, `WINDOWS-<n>`.
pub fn is_known_encoding(token: &str) -> bool {
    let token = token.trim();
    if token.is_empty() {
        return false;
    }
    if encoding_rs::Encoding::for_label(token.as_bytes()).is_some() {
        return true;
    }
    let upper = token.to_ascii_uppercase();
    if matches!(upper.as_str(), "EBCDIC" | "UTF8" | "UCS-2BE" | "UCS-2LE") {
        return true;
    }
    ["ISO8859-", "IBM-", "CP", "WINDOWS-"]
        .iter()
        .any(|prefix| numbered(&upper, prefix))
}

fn numbered(token: &str, prefix: &str) -> bool {
    token
        .strip_prefix(prefix)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_families_accepted() {
        for t in [
            "utf-8", "UTF-8", "ISO8859-1", "IBM-1047", "ibm-037", "CP1252", "Windows-1252", "ASCII",
            "UCS-2", "ucs-2be", "UTF-16", "UTF-16LE", "utf-16be", "EBCDIC", "ebcdic", "latin1",
        ] {
            assert!(is_known_encoding(t), "{t} should be known");
        }
    }

    #[test]
    fn unknown_tokens_rejected() {
        for t in ["", "  ", "IBM-", "IBM-10x7", "CP", "binaryish", "NOT-AN-ENCODING", "UTF-32X"] {
            assert!(!is_known_encoding(t), "{t} should be rejected");
        }
    }
}
