//! Stable identity keys for matching fetched entries to stored channels.

use url::Url;

/// Compute the identity key for a channel or playlist entry.
///
/// A non-empty tvg-id is the most stable broadcaster identity and wins
/// outright. Otherwise the URL is reduced to scheme, host and path - query
/// string and fragment are dropped so rotating CDN tokens or timestamps do
/// not defeat matching, while a genuine host or path change still produces
/// a different key. Unparseable URLs are used verbatim.
pub fn channel_key(tvg_id: &str, url: &str) -> String {
    if !tvg_id.is_empty() {
        return format!("tvg:{}", tvg_id);
    }
    format!("url:{}", stable_url(url))
}

/// Reduce a stream URL to its stable part: scheme, host (with any explicit
/// port) and path. Query string and fragment are dropped. Returns the input
/// verbatim when it does not parse as an absolute URL.
pub fn stable_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) if parsed.host_str().is_some() => {
            let host = parsed.host_str().unwrap_or_default();
            match parsed.port() {
                Some(port) => {
                    format!("{}://{}:{}{}", parsed.scheme(), host, port, parsed.path())
                }
                None => format!("{}://{}{}", parsed.scheme(), host, parsed.path()),
            }
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tvg_id_takes_precedence_over_url() {
        assert_eq!(channel_key("BBC1", "http://a.com/x.m3u8"), "tvg:BBC1");
        assert_eq!(channel_key("BBC1", "totally different"), "tvg:BBC1");
    }

    #[test]
    fn key_is_invariant_under_query_rotation() {
        let a = channel_key("", "http://a.com/cnn.m3u8?tok=123");
        let b = channel_key("", "http://a.com/cnn.m3u8?tok=999&ts=42");
        assert_eq!(a, b);
        assert_eq!(a, "url:http://a.com/cnn.m3u8");
    }

    #[test]
    fn host_or_path_change_changes_the_key() {
        let base = channel_key("", "http://a.com/cnn.m3u8");
        assert_ne!(base, channel_key("", "http://b.com/cnn.m3u8"));
        assert_ne!(base, channel_key("", "http://a.com/cnn-hd.m3u8"));
        assert_ne!(base, channel_key("", "http://a.com:8080/cnn.m3u8"));
    }

    #[test]
    fn unparseable_url_is_used_verbatim() {
        assert_eq!(channel_key("", "not a url"), "url:not a url");
    }
}
