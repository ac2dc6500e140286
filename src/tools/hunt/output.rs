use crate::error::{HoundError, Result};
use crate::tools::fetch::{sniff_image_type, Fetched};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

/// A hunt target with its effective port filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl {
    pub url: Url,
    pub port: u16,
}

/// Parse the URL given on the command line.
///
/// `//host/path` is treated as HTTPS; a missing port becomes 443 or 80 by scheme.
pub fn parse_target_url(raw: &str) -> Result<TargetUrl> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(HoundError::InvalidUrl("empty".to_string()));
    }
    let normalized = match raw.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => raw.to_string(),
    };

    let url = Url::parse(&normalized).map_err(|e| match e {
        url::ParseError::InvalidPort => HoundError::InvalidPort(raw_port(&normalized).to_string()),
        url::ParseError::RelativeUrlWithoutBase => {
            HoundError::InvalidUrl(format!("{} (missing scheme)", raw))
        }
        other => HoundError::InvalidUrl(format!("{} ({})", raw, other)),
    })?;

    let default_port = match url.scheme() {
        "https" => 443,
        "http" => 80,
        other => return Err(HoundError::UnsupportedScheme(other.to_string())),
    };
    if url.host_str().map_or(true, str::is_empty) {
        return Err(HoundError::InvalidUrl(format!("{} (missing host)", raw)));
    }

    let port = match url.port() {
        Some(0) => return Err(HoundError::InvalidPort("0".to_string())),
        Some(p) => p,
        None => default_port,
    };
    Ok(TargetUrl { url, port })
}

/// Port text of an authority that failed to parse, for error messages.
fn raw_port(url: &str) -> &str {
    let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = after_scheme
        .split(|c| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or(after_scheme);
    authority.rsplit_once(':').map_or("", |(_, port)| port)
}

/// Where to write the found image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPath {
    pub dir: PathBuf,
    /// `None` when the file name should be inferred from the response
    pub file_name: Option<String>,
}

impl OutputPath {
    /// Final file path for `response`, fetched for `url`.
    pub fn file_for(&self, url: &Url, response: &Fetched) -> PathBuf {
        match &self.file_name {
            Some(name) => self.dir.join(name),
            None => self.dir.join(infer_file_name(url, response)),
        }
    }
}

/// Resolve `-o` against the current directory.
pub fn parse_output_path(raw: &str) -> Result<OutputPath> {
    let cwd = std::env::current_dir().map_err(|e| {
        HoundError::InvalidOutputPath(format!("failed to get current working directory: {}", e))
    })?;
    parse_output_path_in(raw, &cwd)
}

/// Resolve `raw` against `cwd`. An existing directory means "infer a file name".
pub fn parse_output_path_in(raw: &str, cwd: &Path) -> Result<OutputPath> {
    let path = if Path::new(raw).is_absolute() {
        PathBuf::from(raw)
    } else {
        cwd.join(raw)
    };

    if path.is_dir() {
        return Ok(OutputPath {
            dir: path,
            file_name: None,
        });
    }
    if raw.ends_with('/') || raw.ends_with(MAIN_SEPARATOR) {
        return Err(HoundError::InvalidOutputPath(format!(
            "directory does not exist: {}",
            path.display()
        )));
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| HoundError::InvalidOutputPath(format!("no file name in {}", path.display())))?;
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.to_path_buf());
    if !dir.is_dir() {
        return Err(HoundError::InvalidOutputPath(format!(
            "directory does not exist: {}",
            dir.display()
        )));
    }

    Ok(OutputPath {
        dir,
        file_name: Some(file_name),
    })
}

/// File name for a found image: the URL's last path segment, with an
/// extension derived from the response when the segment has none.
pub fn infer_file_name(url: &Url, response: &Fetched) -> String {
    let last = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("")
        .to_string();
    if last.contains('.') {
        return last;
    }

    let mime = match response.content_type() {
        Some(ct) if !ct.trim().is_empty() => ct.to_string(),
        _ => sniff_image_type(&response.body).unwrap_or("application/octet-stream").to_string(),
    };
    let stem = if last.is_empty() {
        unix_timestamp().to_string()
    } else {
        last
    };
    format!("{}{}", stem, extension_for(&mime))
}

/// File extension for a MIME type, `.bin` when unknown.
pub fn extension_for(mime: &str) -> &'static str {
    let essence = mime
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/bmp" => ".bmp",
        "image/avif" => ".avif",
        "image/svg+xml" => ".svg",
        _ => ".bin",
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
