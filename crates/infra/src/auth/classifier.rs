//! Response classification shared by every OAuth request.
//!
//! Turns a raw [`TransportResponse`] into a [`RequestOutcome`]. The order of
//! checks is: transport success, content type, HTTP status, provider error.

use loopauth_domain::constants::{
    CONTENT_TYPE_JSON, ERROR_INVALID_GRANT, FIELD_ERROR, FIELD_ERROR_DESCRIPTION,
};
use loopauth_domain::{JsonDocument, RequestOutcome, StatusKind};
use tracing::{error, info};

use crate::http::TransportResponse;

/// Classify a transport outcome.
///
/// The provider's `error` / `error_description` strings are logged here and
/// go nowhere else.
#[must_use]
pub fn classify(response: &TransportResponse) -> RequestOutcome {
    if !response.succeeded {
        error!("The auth-related request couldn't be completed due to connectivity problems");
        return RequestOutcome::Failure(StatusKind::ConnectionError);
    }

    info!(status = response.status, "The auth-related request has returned");

    let mime = extract_mime(&response.content_type);
    if mime != CONTENT_TYPE_JSON {
        error!(
            content_type = %mime,
            expected = CONTENT_TYPE_JSON,
            "Unsupported response content type"
        );
        return RequestOutcome::Failure(StatusKind::UnsupportedContentType);
    }

    // Providers sometimes send an empty body on errors; that yields an empty
    // document rather than a failure.
    let document = JsonDocument::parse(&response.body);

    if (200..300).contains(&response.status) {
        info!("The auth-related request has been successfully completed");
        return RequestOutcome::Success(document);
    }

    let code = document.try_get_string(FIELD_ERROR).unwrap_or_default();
    let description = document.try_get_string(FIELD_ERROR_DESCRIPTION).unwrap_or_default();

    if code == ERROR_INVALID_GRANT {
        error!(
            error = code,
            error_description = description,
            "Invalid grant error happened when performing an auth-related request"
        );
        RequestOutcome::Failure(StatusKind::InvalidGrant)
    } else {
        error!(
            status = response.status,
            error = code,
            error_description = description,
            "An error happened when performing an auth-related request"
        );
        RequestOutcome::Failure(StatusKind::UnknownError)
    }
}

/// MIME type of a `Content-Type` value without parameters, lowercased.
#[must_use]
pub fn extract_mime(content_type: &str) -> String {
    content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}
