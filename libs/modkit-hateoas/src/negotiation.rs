//! `Accept`-header negotiation for hypermedia links.
//!
//! There is no registered media type for "JSON with links". The convention
//! recognised here is a heuristic: a client asks for links by mentioning the
//! token `hateoas` in its `Accept` header, either inside a media range
//! (`application/hateoas+json`, `application/vnd.acme.hateoas+json`, or a bare
//! `hateoas` entry) or as a media-range parameter
//! (`application/vnd.api+json; hateoas=true`).
//!
//! Matching is permissive: a case-insensitive substring test on
//! the media range. Anything malformed simply means "links not requested".

/// Token a client uses to ask for hypermedia links.
pub const HATEOAS_TOKEN: &str = "hateoas";

/// Parameter values that explicitly decline links (`hateoas=false`).
const DECLINING_VALUES: [&str; 3] = ["false", "0", "no"];

/// Whether the `Accept` header value asks for hypermedia links.
///
/// ```
/// use modkit_hateoas::accepts_hateoas;
///
/// assert!(accepts_hateoas("text/html, application/hateoas+json"));
/// assert!(accepts_hateoas("application/json; hateoas=true"));
/// assert!(!accepts_hateoas("application/json"));
/// assert!(!accepts_hateoas(""));
/// ```
#[must_use]
pub fn accepts_hateoas(header: &str) -> bool {
    header.split(',').any(entry_requests_links)
}

fn entry_requests_links(entry: &str) -> bool {
    let mut parts = entry.split(';');
    let media_range = parts.next().unwrap_or_default().trim();
    if media_range.to_ascii_lowercase().contains(HATEOAS_TOKEN) {
        return true;
    }

    parts.any(|param| {
        let (name, value) = param.split_once('=').unwrap_or((param, ""));
        let value = value.trim().trim_matches('"');
        name.trim().eq_ignore_ascii_case(HATEOAS_TOKEN)
            && !DECLINING_VALUES
                .iter()
                .any(|declined| value.eq_ignore_ascii_case(declined))
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn media_range_token_matches_case_insensitively() {
        assert!(accepts_hateoas("application/HATEOAS+json"));
        assert!(accepts_hateoas("application/json, hateoas"));
        assert!(accepts_hateoas("  application/vnd.acme.hateoas+json ; q=0.9"));
    }

    #[test]
    fn plain_media_types_do_not_match() {
        assert!(!accepts_hateoas("application/json"));
        assert!(!accepts_hateoas("text/html, application/xml;q=0.9, */*;q=0.8"));
        assert!(!accepts_hateoas(""));
        assert!(!accepts_hateoas("   "));
    }

    #[test]
    fn hateoas_parameter_requests_links() {
        assert!(accepts_hateoas("application/json; hateoas=true"));
        assert!(accepts_hateoas("application/vnd.api+json; hateoas=\"yes\""));
        assert!(accepts_hateoas("application/json;HATEOAS"));
    }

    #[test]
    fn declining_parameter_or_unrelated_parameter_does_not_match() {
        assert!(!accepts_hateoas("application/json; hateoas=false"));
        assert!(!accepts_hateoas("application/json; hateoas=0"));
        assert!(!accepts_hateoas("application/json; profile=hateoas-less"));
    }

    #[test]
    fn malformed_input_is_not_an_error() {
        assert!(!accepts_hateoas(",,;;=,"));
        assert!(!accepts_hateoas(";hateoas-ish=1"));
    }
}
