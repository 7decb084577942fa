use url::Url;

/// Resolves `path` below `base`, keeping any path prefix `base` already has.
pub(crate) fn endpoint_url(base: &str, path: &str) -> Result<Url, url::ParseError> {
    let mut base = base.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base)?.join(path.trim_start_matches('/'))
}
