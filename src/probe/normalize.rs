use crate::error::ProbeError;

/// Returns `host` unchanged when it is plain ASCII, its IDNA (punycode) form
/// otherwise.
pub fn normalize_host(host: &str) -> Result<String, ProbeError> {
    if host.is_ascii() {
        return Ok(host.to_string());
    }

    idna::domain_to_ascii(host).map_err(|err| ProbeError::Encoding {
        host: host.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_through_untouched() {
        assert_eq!(normalize_host("Example.COM").unwrap(), "Example.COM");
    }

    #[test]
    fn encodes_unicode_labels() {
        assert_eq!(
            normalize_host("bücher.example").unwrap(),
            "xn--bcher-kva.example"
        );
        assert_eq!(normalize_host("пример.рф").unwrap(), "xn--e1afmkfd.xn--p1ai");
    }

    #[test]
    fn rejects_label_starting_with_combining_mark() {
        let err = normalize_host("\u{0301}foo.example").unwrap_err();
        assert_eq!(err.kind(), "encoding");
    }
}
