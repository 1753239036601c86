//! Standardized diagnostics for HTTP status codes returned by the release service

use crate::error::PublishError;

/// Maps raw status/body pairs to operator-facing messages
pub struct HttpErrorHandler;

impl HttpErrorHandler {
    /// Describe a failed asset upload
    pub fn describe_upload_failure(status: u16, body: &str) -> String {
        let body = Self::excerpt(body);
        match status {
            301 | 302 | 307 | 308 => format!("Upload redirected (status {}), not followed: {}", status, body),
            400 => format!("Bad upload request: {}", body),
            401 => format!("Token rejected during upload: {}", body),
            403 => format!("Token lacks permission to upload assets: {}", body),
            404 => format!("Release or upload endpoint not found: {}", body),
            413 => format!("File too large for the release service: {}", body),
            422 => format!("Asset validation failed (name may already exist): {}", body),
            500 => format!("Release service error during upload: {}", body),
            502 | 503 | 504 => format!("Release service unavailable during upload: {}", body),
            _ => format!("Upload failed (status {}): {}", status, body),
        }
    }

    /// Map a failed release lookup to the matching run-fatal error
    pub fn release_lookup_error(status: u16, body: &str, tag: &str) -> PublishError {
        match status {
            401 | 403 => PublishError::AuthRejected {
                status,
                message: Self::excerpt(body),
            },
            404 => PublishError::ReleaseNotFound {
                tag: tag.to_string(),
            },
            _ => PublishError::RejectedByServer {
                status,
                body: Self::excerpt(body),
            },
        }
    }

    /// Describe a failed asset delete
    pub fn describe_delete_failure(status: u16, body: &str) -> String {
        let body = Self::excerpt(body);
        match status {
            403 => format!("Token lacks permission to delete assets: {}", body),
            404 => format!("Asset vanished before it could be deleted: {}", body),
            _ => format!("Delete failed (status {}): {}", status, body),
        }
    }

    /// Trim response bodies so diagnostics stay on one screen
    pub fn excerpt(body: &str) -> String {
        const LIMIT: usize = 512;
        let trimmed = body.trim();
        if trimmed.chars().count() <= LIMIT {
            trimmed.to_string()
        } else {
            let cut: String = trimmed.chars().take(LIMIT).collect();
            format!("{}…", cut)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_404_is_release_not_found() {
        let err = HttpErrorHandler::release_lookup_error(404, "{\"message\":\"Not Found\"}", "v1.0.0");
        assert!(matches!(err, PublishError::ReleaseNotFound { ref tag } if tag == "v1.0.0"));
    }

    #[test]
    fn lookup_401_is_auth_rejected() {
        let err = HttpErrorHandler::release_lookup_error(401, "Bad credentials", "v1.0.0");
        assert!(matches!(err, PublishError::AuthRejected { status: 401, .. }));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(2000);
        let excerpt = HttpErrorHandler::excerpt(&body);
        assert_eq!(excerpt.chars().count(), 513);
    }

    #[test]
    fn redirect_is_described_as_not_followed() {
        let msg = HttpErrorHandler::describe_upload_failure(302, "");
        assert!(msg.contains("redirected"));
    }
}
