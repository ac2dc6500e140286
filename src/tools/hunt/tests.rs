#[cfg(test)]
mod tests {
    use crate::error::HoundError;
    use crate::tools::fetch::Fetched;
    use crate::tools::hunt::{
        extension_for, infer_file_name, logged_outcome, parse_output_path_in, parse_target_url,
        variants_for,
    };
    use crate::services::HuntOutcome;
    use crate::tools::weibo::QUALITIES;
    use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
    use reqwest::StatusCode;
    use url::Url;

    fn fetched(content_type: Option<&'static str>, body: &[u8]) -> Fetched {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        Fetched {
            ip: "10.0.0.1".parse().unwrap(),
            status: StatusCode::OK,
            headers,
            body: body.to_vec(),
        }
    }

    #[test]
    fn test_target_url_default_ports() {
        let https = parse_target_url("https://wx1.sinaimg.cn/large/abc.jpg").unwrap();
        assert_eq!(https.port, 443);
        let http = parse_target_url("http://wx1.sinaimg.cn/large/abc.jpg").unwrap();
        assert_eq!(http.port, 80);
        let explicit = parse_target_url("https://wx1.sinaimg.cn:8443/large/abc.jpg").unwrap();
        assert_eq!(explicit.port, 8443);
    }

    #[test]
    fn test_protocol_relative_url_becomes_https() {
        let target = parse_target_url("//wx1.sinaimg.cn/large/abc.jpg").unwrap();
        assert_eq!(target.url.scheme(), "https");
        assert_eq!(target.port, 443);
        assert_eq!(target.url.host_str(), Some("wx1.sinaimg.cn"));
    }

    #[test]
    fn test_target_url_rejections() {
        assert!(matches!(parse_target_url(""), Err(HoundError::InvalidUrl(_))));
        assert!(matches!(
            parse_target_url("ftp://wx1.sinaimg.cn/large/abc.jpg"),
            Err(HoundError::UnsupportedScheme(s)) if s == "ftp"
        ));
        assert!(matches!(
            parse_target_url("https://wx1.sinaimg.cn:0/large/abc.jpg"),
            Err(HoundError::InvalidPort(p)) if p == "0"
        ));
        assert!(matches!(
            parse_target_url("https://wx1.sinaimg.cn:70000/large/abc.jpg"),
            Err(HoundError::InvalidPort(p)) if p == "70000"
        ));
        assert!(matches!(
            parse_target_url("wx1.sinaimg.cn/large/abc.jpg"),
            Err(HoundError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_output_existing_directory_infers_name() {
        let dir = tempfile::tempdir().unwrap();
        let out = parse_output_path_in("", dir.path()).unwrap();
        assert_eq!(out.dir, dir.path().join(""));
        assert!(out.file_name.is_none());

        std::fs::create_dir(dir.path().join("pics")).unwrap();
        let out = parse_output_path_in("pics", dir.path()).unwrap();
        assert_eq!(out.dir, dir.path().join("pics"));
        assert!(out.file_name.is_none());
    }

    #[test]
    fn test_output_file_in_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = parse_output_path_in("found.jpg", dir.path()).unwrap();
        assert_eq!(out.dir, dir.path());
        assert_eq!(out.file_name.as_deref(), Some("found.jpg"));

        let absolute = dir.path().join("abs.png");
        let out = parse_output_path_in(absolute.to_str().unwrap(), std::path::Path::new("/nonexistent")).unwrap();
        assert_eq!(out.dir, dir.path());
        assert_eq!(out.file_name.as_deref(), Some("abs.png"));

        let url = Url::parse("https://wx1.sinaimg.cn/large/abc.jpg").unwrap();
        assert_eq!(
            out.file_for(&url, &fetched(None, b"x")),
            dir.path().join("abs.png")
        );
    }

    #[test]
    fn test_output_missing_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            parse_output_path_in("missing/found.jpg", dir.path()),
            Err(HoundError::InvalidOutputPath(_))
        ));
        assert!(matches!(
            parse_output_path_in("missing/", dir.path()),
            Err(HoundError::InvalidOutputPath(_))
        ));
    }

    #[test]
    fn test_file_name_keeps_url_extension() {
        let url = Url::parse("https://wx1.sinaimg.cn/large/abc.gif").unwrap();
        assert_eq!(infer_file_name(&url, &fetched(Some("image/jpeg"), b"x")), "abc.gif");
    }

    #[test]
    fn test_file_name_extension_from_content_type_or_body() {
        let url = Url::parse("https://wx1.sinaimg.cn/large/abc").unwrap();
        assert_eq!(infer_file_name(&url, &fetched(Some("image/jpeg"), b"x")), "abc.jpg");
        assert_eq!(
            infer_file_name(&url, &fetched(Some("image/png; charset=binary"), b"x")),
            "abc.png"
        );
        assert_eq!(
            infer_file_name(&url, &fetched(None, b"GIF89a\x01\x00")),
            "abc.gif"
        );
        assert_eq!(infer_file_name(&url, &fetched(None, b"plain")), "abc.bin");
        assert_eq!(
            infer_file_name(&url, &fetched(Some("application/octet-stream"), b"\xFF\xD8\xFF")),
            "abc.bin"
        );
    }

    #[test]
    fn test_file_name_falls_back_to_timestamp() {
        let url = Url::parse("https://wx1.sinaimg.cn/").unwrap();
        let name = infer_file_name(&url, &fetched(Some("image/webp"), b"x"));
        let stem = name.strip_suffix(".webp").unwrap();
        assert!(!stem.is_empty());
        assert!(stem.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_extension_table() {
        assert_eq!(extension_for("IMAGE/JPEG"), ".jpg");
        assert_eq!(extension_for("image/avif"), ".avif");
        assert_eq!(extension_for("text/html"), ".bin");
        assert_eq!(extension_for(""), ".bin");
    }

    #[test]
    fn test_variants_and_port() {
        let raw = "https://wx1.sinaimg.cn:8443/mw690/abc.jpg";
        let (variants, port) = variants_for(raw, &parse_target_url(raw).unwrap());
        assert_eq!(variants.len(), QUALITIES.len());
        assert_eq!(port, 8443);

        let raw = "http://wx1.sinaimg.cn/mw690/abc.jpg";
        let (variants, port) = variants_for(raw, &parse_target_url(raw).unwrap());
        assert!(variants[0].starts_with("https://"));
        assert_eq!(port, 443);

        let raw = "//example.com/pic";
        let (variants, port) = variants_for(raw, &parse_target_url(raw).unwrap());
        assert_eq!(variants, vec!["https://example.com/pic".to_string()]);
        assert_eq!(port, 443);
    }

    #[test]
    fn test_exhaustion_is_logged_with_counts() {
        let outcome: anyhow::Result<HuntOutcome> = Err(HoundError::AllVariantsExhausted {
            variants: 17,
            attempts: 340,
        }
        .into());
        assert_eq!(
            logged_outcome(&outcome),
            HuntOutcome::Exhausted {
                variants: 17,
                attempts: 340
            }
        );
    }

    #[test]
    fn test_other_errors_are_logged_with_context() {
        let outcome: anyhow::Result<HuntOutcome> =
            Err(anyhow::anyhow!("no such directory").context("failed to parse output path"));
        assert_eq!(
            logged_outcome(&outcome),
            HuntOutcome::Failed {
                error: "failed to parse output path: no such directory".to_string()
            }
        );
        assert_eq!(
            logged_outcome(&Ok(HuntOutcome::NoCachedResolves)),
            HuntOutcome::NoCachedResolves
        );
    }
}
