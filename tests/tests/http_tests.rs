//! End-to-end tests: `HttpFetcher` + `LeaseCache` against a local fixture
//! server.

use lease_cache::{CacheError, FetchError, HttpFetcher, LeaseCache};

mod image_fixture;

use image_fixture::ImageFixture;

#[test]
fn lease_roundtrip_over_http() {
    setup::SERVER_RT.block_on(async {
        let fixture = ImageFixture::new();
        fixture.insert("a.png", &b"PNGDATA"[..]);
        let base = fixture.start().await;

        let (_root_guard, root) = setup::fresh_cache_root();
        let cache = LeaseCache::new(HttpFetcher::new(), root).unwrap();
        let url = format!("{base}img/a.png");

        let path = cache.lease(&url).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"PNGDATA");

        // The second lease is served from disk; the server sees no new
        // request.
        let again = cache.lease(&url).await.unwrap();
        assert_eq!(again, path);
        assert_eq!(fixture.request_count("a.png"), 1);

        cache.release(&url).await.unwrap();
        assert!(path.is_file());
        cache.release(&url).await.unwrap();
        assert!(!path.exists());

        let err = cache.release(&url).await.unwrap_err();
        assert!(matches!(err, CacheError::NoSuchLease(_)));
    });
}

#[test]
fn missing_image_surfaces_fetch_failure() {
    setup::SERVER_RT.block_on(async {
        let fixture = ImageFixture::new();
        let base = fixture.start().await;

        let (_root_guard, root) = setup::fresh_cache_root();
        // A 404 is not going to get better; skip the retries.
        let fetcher = HttpFetcher::new().with_max_retries(0);
        let cache = LeaseCache::new(fetcher, root).unwrap();
        let url = format!("{base}img/absent.png");

        let err = cache.lease(&url).await.unwrap_err();
        match err {
            CacheError::FetchFailed {
                source: FetchError::Http { status, .. },
                ..
            } => assert_eq!(status, 404),
            other => panic!("expected http fetch failure, got: {other}"),
        }

        // The failed lease left no bookkeeping behind.
        let err = cache.release(&url).await.unwrap_err();
        assert!(matches!(err, CacheError::NoSuchLease(_)));
    });
}

#[test]
fn unparseable_url_is_rejected() {
    setup::SERVER_RT.block_on(async {
        let (_root_guard, root) = setup::fresh_cache_root();
        let cache = LeaseCache::new(HttpFetcher::new(), root).unwrap();

        let err = cache.lease("not a url").await.unwrap_err();
        assert!(matches!(
            err,
            CacheError::FetchFailed {
                source: FetchError::InvalidUrl { .. },
                ..
            }
        ));
    });
}
