//! Weibo image URLs
//!
//! Weibo serves each picture under a set of quality tiers that only differ in
//! one path segment, e.g. `https://wx1.sinaimg.cn/large/<name>.jpg`. A tier
//! censored on one edge is often still served on another tier.


use url::Url;

const IMAGE_DOMAIN: &str = "sinaimg.cn";
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "png", "gif"];

/// Quality tiers, best first.
pub const QUALITIES: [&str; 17] = [
    "mw2000",
    "woriginal",
    "large",
    "orj1080",
    "mw1024",
    "orj960",
    "sti960",
    "wapb720",
    "mw690",
    "orj480",
    "bmiddle",
    "wap360",
    "thumbnail",
    "thumb180",
    "wap180",
    "small",
    "square",
];

const HOST_PREFIXES: [&str; 5] = ["wx", "ww", "tva", "tvax", "ws"];
const HOST_SHARDS: u8 = 4;

/// A parsed `<host>.sinaimg.cn/<quality>/<name>` image URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUrl {
    pub host: String,
    pub quality: String,
    pub file_name: String,
}

impl ImageUrl {
    /// Parse an image URL; the scheme may be missing, protocol-relative or in
    /// any letter case.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let lower = raw.to_ascii_lowercase();
        let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
            raw.to_string()
        } else if let Some(rest) = raw.strip_prefix("//") {
            format!("https://{}", rest)
        } else {
            format!("https://{}", raw)
        };
        let url = Url::parse(&with_scheme).ok()?;

        let host = url.host_str()?.to_ascii_lowercase();
        if !is_image_host(&host) {
            return None;
        }

        let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
        if segments.len() < 2 {
            return None;
        }
        let file_name = segments[segments.len() - 1];
        if !is_image_file_name(file_name) {
            return None;
        }

        Some(Self {
            host,
            quality: segments[..segments.len() - 1].join("/"),
            file_name: file_name.to_string(),
        })
    }

    /// This image at `quality`.
    pub fn at_quality(&self, quality: &str) -> String {
        format!("https://{}/{}/{}", self.host, quality, self.file_name)
    }
}

/// Every quality variant of `raw`, best first.
///
/// Returns `None` when `raw` is not a Weibo image URL.
pub fn urls_of_all_qualities(raw: &str) -> Option<Vec<String>> {
    let image = ImageUrl::parse(raw)?;
    Some(QUALITIES.iter().map(|q| image.at_quality(q)).collect())
}

/// Quality variants of `raw`, or just `raw` when it cannot be templated.
pub fn variants_or_original(raw: &str) -> Vec<String> {
    urls_of_all_qualities(raw).unwrap_or_else(|| vec![raw.to_string()])
}

/// Hostnames the image CDN serves pictures from.
pub fn hostnames() -> Vec<String> {
    let mut out = Vec::with_capacity(HOST_PREFIXES.len() * HOST_SHARDS as usize);
    for prefix in HOST_PREFIXES {
        for shard in 1..=HOST_SHARDS {
            out.push(format!("{}{}.{}", prefix, shard, IMAGE_DOMAIN));
        }
    }
    out
}

fn is_image_host(host: &str) -> bool {
    match host.strip_suffix(IMAGE_DOMAIN) {
        Some(prefix) => {
            let label = prefix.trim_end_matches('.');
            prefix.ends_with('.')
                && !label.is_empty()
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        }
        None => false,
    }
}

fn is_image_file_name(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty()
                && stem.chars().all(|c| c.is_ascii_alphanumeric())
                && IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        }
        None => false,
    }
}
