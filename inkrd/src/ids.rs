//! Helpers for local-fragment references.
//!
//! InkML reference attributes (`brushRef`, `contextRef`, `priorRef`, ...)
//! name a target in the same document with a `#`-prefixed fragment. These
//! helpers classify a reference string and strip the prefix so it can be
//! used as a table key.

/// Returns true if `uri` is a local-fragment reference (`#foo`).
///
/// A bare `#` is not a reference to anything and is not considered local.
pub fn is_local(uri: &str) -> bool {
    uri.len() > 1 && uri.starts_with('#')
}

/// Strips the leading `#` from a local reference.
///
/// Non-local input is returned unchanged, so the result can always be used
/// as a lookup key when external references are assumed to be local.
pub fn to_local(uri: &str) -> &str {
    if is_local(uri) {
        &uri[1..]
    } else {
        uri
    }
}

/// Strips the leading `#` from a local reference, `None` for anything else.
pub fn to_optional_local(uri: &str) -> Option<&str> {
    if is_local(uri) {
        Some(&uri[1..])
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn local_ids() {
        assert!(is_local("#brush0"));
        assert!(!is_local("brush0"));
        assert!(!is_local("#"));
        assert!(!is_local(""));

        assert_eq!(to_local("#brush0"), "brush0");
        assert_eq!(to_local("brush0"), "brush0");
        assert_eq!(to_local("#"), "#");

        assert_eq!(to_optional_local("#brush0"), Some("brush0"));
        assert_eq!(to_optional_local("brush0"), None);
        assert_eq!(to_optional_local("#"), None);
    }
}
