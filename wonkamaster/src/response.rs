//! Mapping engine outcomes to an HTTP status and JSON body.

use serde::Serialize;
use tracing::debug;
use wonka::GenericResponse;
use wonka::constants::result;

use crate::error::AuthError;

/// Renders an engine outcome as a status and JSON body.
///
/// Successes serialize the response value with status 200. Failures carry
/// only the result code in a [`GenericResponse`]; the internal reason is
/// never rendered.
///
/// ```
/// use wonkamaster::{AuthError, respond};
///
/// let (status, body) = respond::<wonka::ClaimResponse>(Err(AuthError::rejected("bad signature")));
/// assert_eq!(status, 403);
/// assert_eq!(body, r#"{"result":"REJECTED"}"#);
/// ```
#[must_use]
pub fn respond<T: Serialize>(outcome: Result<T, AuthError>) -> (u16, String) {
    match outcome {
        Ok(value) => match serde_json::to_string(&value) {
            Ok(body) => (200, body),
            Err(e) => {
                debug!(error = %e, "failed to encode response");
                (500, generic(result::INTERNAL_ERROR))
            }
        },
        Err(e) => {
            debug!(
                result = e.result_code(),
                status_code = e.status(),
                "rendering error response"
            );
            (e.status(), generic(e.result_code()))
        }
    }
}

/// Renders a request body that failed to decode.
#[must_use]
pub fn decode_failure(reason: impl ToString) -> (u16, String) {
    respond::<GenericResponse>(Err(AuthError::Decode {
        reason: reason.to_string(),
    }))
}

fn generic(code: &str) -> String {
    let response = GenericResponse {
        result: code.to_string(),
    };
    // A single string field always serializes.
    serde_json::to_string(&response).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use wonka::ClaimResponse;

    use super::*;
    use crate::error::ChainCheck;

    #[test]
    fn success_is_rendered_in_full() {
        let (status, body) = respond(Ok(ClaimResponse {
            result: "OK".into(),
            token: "abc".into(),
        }));
        assert_eq!(status, 200);
        assert_eq!(body, r#"{"result":"OK","claim_token":"abc"}"#);
    }

    #[test]
    fn csr_failures_hide_the_failing_link() {
        let (status, body) = respond::<ClaimResponse>(Err(AuthError::bad_csr(
            ChainCheck::LaunchHostBinding,
            "h1 != h2",
        )));
        assert_eq!(status, 403);
        assert_eq!(body, r#"{"result":"INVALID_CERTIFICATE_SIGNING_REQUEST"}"#);
        assert!(!body.contains("h1"));
    }

    #[test]
    fn decode_failures_are_bad_requests() {
        let (status, body) = decode_failure("unexpected end of input");
        assert_eq!(status, 400);
        assert_eq!(body, r#"{"result":"DECODE_ERROR"}"#);
    }

    #[test]
    fn lookup_failures_are_server_errors() {
        let (status, _) = respond::<ClaimResponse>(Err(AuthError::lookup("store down")));
        assert_eq!(status, 500);
    }
}
