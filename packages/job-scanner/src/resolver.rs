//! Resolution of candidate posting URLs against their source page.
//!
//! Agents return links the way they appear on the page: absolute, rooted
//! (`/jobs/42`) or bare relative (`jobs/42`). Everything that is not already
//! absolute is resolved against the source's scheme + host + `/`, never against
//! the search page's own path, so bare relative links do not pick up the
//! search path's segments.

use url::Url;

use crate::error::ResolveError;

/// Resolve `candidate` to an absolute http(s) URL.
///
/// Rules, in order:
/// 1. `http://` or `https://` (any case) is returned unchanged.
/// 2. A leading `/` is rooted at the source's scheme + host.
/// 3. Anything else is joined against scheme + host + `/`.
pub fn resolve(candidate: &str, source_url: &str) -> Result<String, ResolveError> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return Err(ResolveError::Empty);
    }

    if has_http_scheme(candidate) {
        return Ok(candidate.to_string());
    }

    let root = site_root(source_url)?;
    let resolved = root
        .join(candidate)
        .map_err(|e| ResolveError::Unresolvable {
            candidate: candidate.to_string(),
            reason: e.to_string(),
        })?;

    match resolved.scheme() {
        "http" | "https" => Ok(resolved.to_string()),
        _ => Err(ResolveError::UnsupportedScheme(candidate.to_string())),
    }
}

fn has_http_scheme(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Scheme + host (+ port) of the source, with path `/`.
fn site_root(source_url: &str) -> Result<Url, ResolveError> {
    let parsed = Url::parse(source_url.trim())
        .map_err(|e| ResolveError::InvalidSource(format!("{}: {}", source_url, e)))?;

    if parsed.cannot_be_a_base() || parsed.host_str().is_none() {
        return Err(ResolveError::InvalidSource(source_url.to_string()));
    }

    let mut root = parsed;
    root.set_path("/");
    root.set_query(None);
    root.set_fragment(None);
    Ok(root)
}
