// Endpoint classification
// Decides which API calls go out without a bearer credential

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Method;

/// POST endpoints reachable without a session (exact path match)
pub const PUBLIC_POST_PATHS: &[&str] = &["/auth/sign-up", "/auth/sign-in", "/auth/refresh-token"];

/// GET namespaces readable without a session (prefix match)
pub const PUBLIC_GET_PREFIXES: &[&str] = &["/profiles", "/articles"];

/// GET sub-resource patterns readable without a session (`*` = one path segment)
///
/// The current entry also falls under the `/articles` prefix. Patterns are
/// meant for public sub-resources of otherwise protected namespaces.
pub const PUBLIC_GET_PATTERNS: &[&str] = &["/articles/*/comments"];

// NOTE: this table is maintained by hand and has to follow the server's
// authorization rules. Nothing checks it against the server.

static PUBLIC_GET_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    PUBLIC_GET_PATTERNS
        .iter()
        .map(|pattern| pattern_to_regex(pattern))
        .collect()
});

/// Compile a `*` segment pattern into an anchored regex.
/// Matching sub-paths below the pattern are accepted as well.
fn pattern_to_regex(pattern: &str) -> Regex {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("[^/]+");
    // Escaped literals and a fixed segment class always form a valid regex
    Regex::new(&format!("^{}(?:/.*)?$", body)).expect("endpoint pattern compiles")
}

/// Strip the query string, classification only looks at the path
fn path_only(path: &str) -> &str {
    match path.find('?') {
        Some(idx) => &path[..idx],
        None => path,
    }
}

/// Check whether a request can be sent without credentials
///
/// - POST: public only for the auth endpoints in [`PUBLIC_POST_PATHS`]
/// - GET: public for everything under [`PUBLIC_GET_PREFIXES`] and [`PUBLIC_GET_PATTERNS`]
/// - anything else: protected
pub fn is_public(method: &Method, path: &str) -> bool {
    let path = path_only(path);

    match method.as_str().to_ascii_uppercase().as_str() {
        "POST" => PUBLIC_POST_PATHS.contains(&path),
        "GET" => {
            PUBLIC_GET_PREFIXES
                .iter()
                .any(|prefix| path.starts_with(prefix))
                || PUBLIC_GET_REGEXES.iter().any(|re| re.is_match(path))
        }
        _ => false,
    }
}

/// Convenience for callers holding the method as text
pub fn is_public_str(method: &str, path: &str) -> bool {
    match Method::from_bytes(method.to_ascii_uppercase().as_bytes()) {
        Ok(method) => is_public(&method, path),
        Err(_) => false,
    }
}
