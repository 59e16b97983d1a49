//! Canonical form of a destination URL.
//!
//! The same function is applied when storing a link and when searching for
//! one, so `normalize(a) == normalize(b)` is the equality test for dedup.

const SCHEME_SEPARATOR: &str = "://";
const WWW_PREFIX: &str = "www.";

/// Strip the scheme, a leading `www.` and trailing slashes.
///
/// No validation happens here; malformed input passes through otherwise
/// untouched.
pub fn normalize(raw: &str) -> String {
    let without_scheme = raw
        .split_once(SCHEME_SEPARATOR)
        .map_or(raw, |(_, rest)| rest);
    let without_www = without_scheme
        .strip_prefix(WWW_PREFIX)
        .unwrap_or(without_scheme);

    without_www.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_scheme_www_and_trailing_slash() {
        assert_eq!(normalize("https://www.example.com/"), "example.com");
        assert_eq!(normalize("example.com"), "example.com");
        assert_eq!(normalize("http://example.com/page"), "example.com/page");
        assert_eq!(normalize("ftp://files.example.com/pub/"), "files.example.com/pub");
    }

    #[test]
    fn test_only_first_scheme_separator_is_removed() {
        assert_eq!(
            normalize("https://example.com/?next=https://other.org"),
            "example.com/?next=https://other.org"
        );
    }

    #[test]
    fn test_www_only_stripped_as_prefix() {
        assert_eq!(normalize("https://docs.www.example.com"), "docs.www.example.com");
        assert_eq!(normalize("wwwexample.com"), "wwwexample.com");
    }

    #[test]
    fn test_malformed_input_passes_through() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("not a url"), "not a url");
        assert_eq!(normalize("://"), "");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "https://www.example.com/",
            "http://example.com/a/b/",
            "example.com//",
            "www.example.com/path?q=1",
            "https://sub.example.org:8443/x",
        ];

        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input}");
        }
    }
}
