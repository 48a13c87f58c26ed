//! Unverified claim extraction from access tokens.
//!
//! Access tokens are three dot-separated segments (header, payload,
//! signature). The functions here drop the signature segment and read the
//! payload without checking it: the token was just issued to us by the API
//! over TLS, so this is information extraction, not trust establishment.
//!
//! Nothing in this module may be used on a token received from a peer. A
//! signature-verifying decoder, if one is ever needed, belongs elsewhere.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use letpot_core::{LetPotError, Result};
use serde_json::{Map, Value};

/// Claim holding the user identifier.
const UID_CLAIM: &str = "uid";

/// Extract the `uid` claim from an access token without verifying it.
pub fn unverified_uid(token: &str) -> Result<String> {
    let claims = unverified_claims(token)?;
    claims
        .get(UID_CLAIM)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| LetPotError::MalformedToken(format!("missing `{UID_CLAIM}` claim")))
}

/// Decode the payload segment of a token into its claims map.
///
/// Everything after the last `.` (the signature) is discarded first; what
/// remains must be exactly `header.payload`.
pub fn unverified_claims(token: &str) -> Result<Map<String, Value>> {
    let Some(last_dot) = token.rfind('.') else {
        return Err(LetPotError::MalformedToken("no `.` separator".to_string()));
    };
    let unsigned = &token[..last_dot];

    let mut segments = unsigned.split('.');
    let (Some(_header), Some(payload), None) = (segments.next(), segments.next(), segments.next())
    else {
        return Err(LetPotError::MalformedToken(
            "expected header and payload segments".to_string(),
        ));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| LetPotError::MalformedToken(format!("payload is not base64url: {e}")))?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(_) => Err(LetPotError::MalformedToken(
            "payload is not a JSON object".to_string(),
        )),
        Err(e) => Err(LetPotError::MalformedToken(format!(
            "payload is not JSON: {e}"
        ))),
    }
}

/// Build an unsigned-looking token carrying `claims`, for tests.
#[cfg(test)]
pub(crate) fn test_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn extracts_uid() {
        let token = test_token(&json!({"uid": "uid-123", "exp": 1_700_000_000}));
        assert_eq!(unverified_uid(&token).unwrap(), "uid-123");
    }

    #[test]
    fn accepts_padded_payload() {
        let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.\
                     eyJ1aWQiOiJ1aWQtMTIzIiwiZXhwIjoxNzAwMDAwMDAwfQ==.sig";
        assert_eq!(unverified_uid(token).unwrap(), "uid-123");
    }

    #[test]
    fn signature_is_ignored() {
        let token = test_token(&json!({"uid": "u"}));
        let (unsigned, _) = token.rsplit_once('.').unwrap();
        let tampered = format!("{unsigned}.not-a-real-signature");
        assert_eq!(unverified_uid(&tampered).unwrap(), "u");
    }

    #[test]
    fn empty_signature_segment_is_fine() {
        let token = test_token(&json!({"uid": "u"}));
        let (unsigned, _) = token.rsplit_once('.').unwrap();
        assert_eq!(unverified_uid(&format!("{unsigned}.")).unwrap(), "u");
    }

    #[test]
    fn no_dot_is_malformed() {
        assert_matches!(unverified_uid("opaque"), Err(LetPotError::MalformedToken(_)));
    }

    #[test]
    fn two_segments_is_malformed() {
        // "header.payload" loses the payload once the last segment is dropped
        let token = test_token(&json!({"uid": "u"}));
        let (unsigned, _) = token.rsplit_once('.').unwrap();
        assert_matches!(unverified_uid(unsigned), Err(LetPotError::MalformedToken(_)));
    }

    #[test]
    fn missing_uid_is_malformed() {
        let token = test_token(&json!({"sub": "someone"}));
        let err = unverified_uid(&token).unwrap_err();
        assert!(err.to_string().contains("uid"));
    }

    #[test]
    fn non_string_uid_is_malformed() {
        let token = test_token(&json!({"uid": 42}));
        assert_matches!(unverified_uid(&token), Err(LetPotError::MalformedToken(_)));
    }

    #[test]
    fn garbage_payload_is_malformed() {
        assert_matches!(
            unverified_uid("aGVhZGVy.!!!.sig"),
            Err(LetPotError::MalformedToken(_))
        );
        let not_json = URL_SAFE_NO_PAD.encode("plain text");
        assert_matches!(
            unverified_uid(&format!("aGVhZGVy.{not_json}.sig")),
            Err(LetPotError::MalformedToken(_))
        );
    }

    #[test]
    fn claims_map_exposes_all_claims() {
        let token = test_token(&json!({"uid": "u", "exp": 5}));
        let claims = unverified_claims(&token).unwrap();
        assert_eq!(claims.get("exp"), Some(&json!(5)));
    }
}
