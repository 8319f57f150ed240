//! # License Challenges
//!
//! Turns a challenge produced by the DRM engine into the request sent to the
//! license server.
//!
//! Engines prefix the challenge payload with a tag terminated by `:Type:`.
//! Only what follows the first marker goes on the wire.

use bridge_traits::http::{ConnectionMode, HttpMethod, HttpRequest, MIME_TEXT_XML};

/// Marker separating the engine's tag from the challenge body.
pub const CHALLENGE_TYPE_MARKER: &str = ":Type:";

/// Body of a tagged challenge string.
///
/// Returns everything after the first `:Type:` marker, or the whole input
/// when there is no marker.
pub fn challenge_body(challenge: &str) -> &str {
    match challenge.find(CHALLENGE_TYPE_MARKER) {
        Some(index) => &challenge[index + CHALLENGE_TYPE_MARKER.len()..],
        None => challenge,
    }
}

/// Build the license request for `challenge`, addressed to `url`.
///
/// The request is a `POST` with a `text/xml` body, `Connection: close`, and a
/// `Content-Length` matching the body. Non UTF-8 bytes in the engine's
/// challenge are replaced rather than rejected.
pub fn prepare_challenge(url: &str, challenge: &[u8]) -> HttpRequest {
    let challenge = String::from_utf8_lossy(challenge);

    HttpRequest::new(HttpMethod::Post, url)
        .text_body(MIME_TEXT_XML, challenge_body(&challenge))
        .connection(ConnectionMode::Close)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_after_marker() {
        assert_eq!(challenge_body("ABC:Type:<xml>"), "<xml>");
    }

    #[test]
    fn test_body_without_marker() {
        assert_eq!(challenge_body("<soap:Envelope/>"), "<soap:Envelope/>");
        assert_eq!(challenge_body(""), "");
    }

    #[test]
    fn test_only_first_marker_is_split() {
        assert_eq!(challenge_body("A:Type:B:Type:C"), "B:Type:C");
        assert_eq!(challenge_body(":Type:"), "");
    }

    #[test]
    fn test_prepare_challenge_request() {
        let request = prepare_challenge(
            "https://license.example.com/rightsmanager.asmx",
            b"PlayReady:Type:<Challenge/>",
        );

        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, "https://license.example.com/rightsmanager.asmx");
        assert_eq!(request.body_text(), Some("<Challenge/>"));
        assert_eq!(request.content_length(), 12);
        assert_eq!(
            request.headers.get("Content-Type").map(String::as_str),
            Some("text/xml")
        );
        assert_eq!(
            request.headers.get("Content-Length").map(String::as_str),
            Some("12")
        );
        assert_eq!(
            request.headers.get("Connection").map(String::as_str),
            Some("close")
        );
    }
}
