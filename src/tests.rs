//! Tests

#[cfg(test)]
mod tests {
    use crate::engine::{Hound, HuntObserver, NoopObserver};
    use crate::error::HoundError;
    use crate::tools::fetch::{FetchError, FetchResult, ImageResponse, StatusOk};
    use crate::tools::race::stub::{ips, Reply, StubFetcher};
    use std::sync::Arc;
    use std::time::Duration;

    const V1: &str = "https://wx1.sinaimg.cn/mw2000/abc.jpg";
    const V2: &str = "https://wx1.sinaimg.cn/large/abc.jpg";
    const V3: &str = "https://wx1.sinaimg.cn/mw690/abc.jpg";

    #[derive(Default)]
    struct Recorder {
        started: Vec<String>,
        exhausted: Vec<String>,
        results: Vec<(String, bool)>,
    }

    impl HuntObserver for Recorder {
        fn variant_started(&mut self, _index: usize, url: &str) {
            self.started.push(url.to_string());
        }
        fn attempt_finished(&mut self, _url: &str, result: &FetchResult, rejection: Option<&str>) {
            self.results.push((result.ip().to_string(), rejection.is_none()));
        }
        fn variant_exhausted(&mut self, _index: usize, url: &str) {
            self.exhausted.push(url.to_string());
        }
    }

    fn variants(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_hunt_stops_at_first_success() {
        let stub = Arc::new(
            StubFetcher::new()
                .on("10.0.0.1", 30, Reply::Fail(FetchError::Timeout(Duration::from_secs(10))))
                .on("10.0.0.2", 5, Reply::Status(200, b"PNGDATA"))
                .on("10.0.0.3", 1, Reply::Status(403, b"")),
        );
        let hound = Hound::new(stub.clone(), Arc::new(StatusOk));
        let mut recorder = Recorder::default();

        let found = hound
            .hunt(
                &variants(&[V1, V2, V3]),
                443,
                &ips(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]),
                &mut recorder,
            )
            .await
            .unwrap();

        assert_eq!(found.url, V1);
        assert_eq!(found.variant_index, 0);
        assert_eq!(found.response.ip.to_string(), "10.0.0.2");
        assert_eq!(found.response.status.as_u16(), 200);
        assert_eq!(found.response.body, b"PNGDATA");

        // Only the first variant was raced
        assert_eq!(recorder.started, vec![V1]);
        assert!(recorder.exhausted.is_empty());
        assert_eq!(recorder.results.iter().filter(|(_, ok)| *ok).count(), 1);
        assert_eq!(stub.started(), 3);
    }

    #[tokio::test]
    async fn test_hunt_falls_back_to_next_variant() {
        let stub = Arc::new(
            StubFetcher::new()
                .on_url(V1, "10.0.0.1", 1, Reply::Status(403, b"blocked"))
                .on_url(V1, "10.0.0.2", 2, Reply::Fail(FetchError::Connect("refused".into())))
                .on_url(V2, "10.0.0.1", 1, Reply::Status(404, b""))
                .on_url(V2, "10.0.0.2", 3, Reply::Status(200, b"JPEGDATA")),
        );
        let hound = Hound::new(stub, Arc::new(StatusOk));
        let mut recorder = Recorder::default();

        let found = hound
            .hunt(
                &variants(&[V1, V2, V3]),
                443,
                &ips(&["10.0.0.1", "10.0.0.2"]),
                &mut recorder,
            )
            .await
            .unwrap();

        assert_eq!(found.url, V2);
        assert_eq!(found.variant_index, 1);
        assert_eq!(found.response.body, b"JPEGDATA");
        assert_eq!(found.attempts, 4);
        assert_eq!(recorder.started, vec![V1, V2]);
        assert_eq!(recorder.exhausted, vec![V1]);
    }

    #[tokio::test]
    async fn test_hunt_reports_exhaustion() {
        let stub = Arc::new(
            StubFetcher::new()
                .on("10.0.0.1", 1, Reply::Status(403, b""))
                .on("10.0.0.2", 1, Reply::Fail(FetchError::Timeout(Duration::from_secs(10))))
                .on("10.0.0.3", 1, Reply::Fail(FetchError::Body("truncated".into()))),
        );
        let hound = Hound::new(stub.clone(), Arc::new(StatusOk));
        let mut recorder = Recorder::default();

        let err = hound
            .hunt(
                &variants(&[V1, V2]),
                443,
                &ips(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]),
                &mut recorder,
            )
            .await
            .unwrap_err();

        match err {
            HoundError::AllVariantsExhausted { variants, attempts } => {
                assert_eq!(variants, 2);
                assert_eq!(attempts, 6);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(recorder.exhausted, vec![V1, V2]);
        assert!(recorder.results.iter().all(|(_, ok)| !ok));
        assert_eq!(stub.completed(), 6);
    }

    #[tokio::test]
    async fn test_hunt_returns_before_slow_edges_finish() {
        let stub = Arc::new(
            StubFetcher::new()
                .on("10.0.0.1", 0, Reply::Hang)
                .on("10.0.0.2", 0, Reply::Status(200, b"x"))
                .on("10.0.0.3", 0, Reply::Hang),
        );
        let hound = Hound::new(stub.clone(), Arc::new(StatusOk));

        let found = tokio::time::timeout(
            Duration::from_secs(5),
            hound.hunt(
                &variants(&[V1]),
                443,
                &ips(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]),
                &mut NoopObserver,
            ),
        )
        .await
        .expect("hunt must not wait for hanging edges")
        .unwrap();

        assert_eq!(found.response.ip.to_string(), "10.0.0.2");
        assert_eq!(stub.completed(), 1);
    }

    #[tokio::test]
    async fn test_hunt_policy_is_pluggable() {
        let stub = Arc::new(
            StubFetcher::new()
                .on("10.0.0.1", 1, Reply::Status(200, b"<html><body>censored</body></html>"))
                .on("10.0.0.2", 20, Reply::Status(200, b"GIF89a-image")),
        );
        let ip_list = ips(&["10.0.0.1", "10.0.0.2"]);

        let lenient = Hound::new(stub.clone(), Arc::new(StatusOk));
        let found = lenient
            .hunt(&variants(&[V1]), 443, &ip_list, &mut NoopObserver)
            .await
            .unwrap();
        assert_eq!(found.response.ip.to_string(), "10.0.0.1");

        let strict = Hound::new(stub, Arc::new(ImageResponse));
        assert_eq!(strict.policy_name(), "image");
        let found = strict
            .hunt(&variants(&[V1]), 443, &ip_list, &mut NoopObserver)
            .await
            .unwrap();
        assert_eq!(found.response.ip.to_string(), "10.0.0.2");
        assert_eq!(found.response.body, b"GIF89a-image");
    }

    #[tokio::test]
    async fn test_hunt_without_variants_or_ips() {
        let hound = Hound::new(Arc::new(StubFetcher::new()), Arc::new(StatusOk));

        let err = hound
            .hunt(&[], 443, &ips(&["10.0.0.1"]), &mut NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HoundError::AllVariantsExhausted { variants: 0, attempts: 0 }
        ));

        let err = hound
            .hunt(&variants(&[V1, V2]), 443, &[], &mut NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HoundError::AllVariantsExhausted { variants: 2, attempts: 0 }
        ));
    }
}
