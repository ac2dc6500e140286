use super::types::FetchError;
use crate::types::HeaderSet;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, REFERER,
    USER_AGENT,
};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

/// Baseline headers of every image request: Chrome on Windows loading an
/// `<img>` embedded in weibo.com.
pub(crate) fn baseline_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in baseline_header_pairs() {
        headers.insert(name, HeaderValue::from_static(value));
    }
    headers
}

/// Header pairs of the baseline. Names are typed so none can collide.
fn baseline_header_pairs() -> [(HeaderName, &'static str); 11] {
    [
        (ACCEPT, "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8"),
        (ACCEPT_ENCODING, "gzip, deflate, br"),
        (ACCEPT_LANGUAGE, "zh-CN,zh;q=0.9"),
        (REFERER, "https://weibo.com/"),
        (
            HeaderName::from_static("sec-ch-ua"),
            "\"Google Chrome\";v=\"119\", \"Chromium\";v=\"119\", \"Not?A_Brand\";v=\"24\"",
        ),
        (HeaderName::from_static("sec-ch-ua-mobile"), "?0"),
        (HeaderName::from_static("sec-ch-ua-platform"), "\"Windows\""),
        (HeaderName::from_static("sec-fetch-dest"), "image"),
        (HeaderName::from_static("sec-fetch-mode"), "no-cors"),
        (HeaderName::from_static("sec-fetch-site"), "cross-site"),
        (USER_AGENT, BROWSER_USER_AGENT),
    ]
}

/// Merge caller overrides into `base`.
///
/// A non-empty override replaces every baseline value of that header, an
/// override whose first value is empty (or that has no values) removes it,
/// anything not mentioned keeps its baseline value.
pub(crate) fn apply_overrides(
    mut base: HeaderMap,
    overrides: &HeaderSet,
) -> Result<HeaderMap, FetchError> {
    for (k, values) in &overrides.0 {
        let name = HeaderName::from_bytes(k.as_bytes())
            .map_err(|e| FetchError::InvalidRequest(format!("invalid header name {:?}: {}", k, e)))?;

        base.remove(&name);
        match values.first() {
            Some(first) if !first.is_empty() => {
                for v in values {
                    let value = HeaderValue::from_str(v).map_err(|e| {
                        FetchError::InvalidRequest(format!("invalid value for header {}: {}", k, e))
                    })?;
                    base.append(name.clone(), value);
                }
            }
            _ => {}
        }
    }
    Ok(base)
}

/// Baseline merged with `overrides`, ready to send.
pub(crate) fn request_headers(overrides: &HeaderSet) -> Result<HeaderMap, FetchError> {
    apply_overrides(baseline_headers(), overrides)
}
