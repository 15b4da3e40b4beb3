use std::collections::BTreeMap;

/// Transport headers a resource entry may carry and a resolved response may
/// forward. Everything else is dropped — a deliberate narrowing of the
/// response surface, not an omission.
pub const ALLOWED_HEADERS: &[&str] = &[
    "content-disposition",
    "content-encoding",
    "content-language",
    "content-security-policy",
    "content-type",
    "link",
    "permissions-policy",
    "referrer-policy",
    "service-worker-allowed",
    "sourcemap",
    "speculation-rules",
    "supports-loading-mode",
    "x-content-type-options",
];

pub fn is_allowed_header(name: &str) -> bool {
    ALLOWED_HEADERS.contains(&name)
}

/// Keep only allow-listed headers. Every path-loader backend routes its
/// successful responses through this single transform.
pub fn filter_headers(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter(|(k, _)| is_allowed_header(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
