//! Content type inference for asset names

/// Content type for any extension missing from [`CONTENT_TYPES`]
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Fixed extension table, matched case-insensitively
pub const CONTENT_TYPES: &[(&str, &str)] = &[("zip", "application/zip")];

/// Infer the upload content type from a target asset name
pub fn content_type_for(name: &str) -> &'static str {
    let Some((_, extension)) = name.rsplit_once('.') else {
        return DEFAULT_CONTENT_TYPE;
    };
    CONTENT_TYPES
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        .map(|(_, content_type)| *content_type)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}
