use std::time::Duration;
use stelle_config::FetchConfig;
use stelle_scraper::{BrowserFetcher, HttpError, NO_TITLE, PageFetcher, Quality, scrape};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = r#"<html><head><title>Sunset timelapse</title></head>
<body><script>{"video":{"browser_native_sd_url":"https:\/\/video.example\/sd.mp4?efg=1","browser_native_hd_url":"https:\/\/video.example\/hd.mp4?efg=2"}}</script></body></html>"#;

fn fetcher() -> BrowserFetcher {
    BrowserFetcher::from_config(&FetchConfig::default()).expect("fetcher builds")
}

#[tokio::test]
async fn fetch_sends_fixed_browser_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/watch/42"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let html = fetcher()
        .fetch(&format!("{}/watch/42", server.uri()))
        .await
        .unwrap();
    assert_eq!(html, PAGE);

    // Compare raw values; wiremock's `header` matcher splits on commas.
    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    let headers = &requests[0].headers;
    assert_eq!(
        headers["user-agent"],
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64)"
    );
    assert_eq!(headers["accept-language"], "en-US,en;q=0.9");
    assert_eq!(
        headers["accept"],
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
    );
}

#[tokio::test]
async fn scrape_extracts_every_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .mount(&server)
        .await;

    let url = format!("{}/user/videos/1122334455/", server.uri());
    let record = scrape(&fetcher(), &url).await.unwrap();

    assert_eq!(record.id, "1122334455");
    assert_eq!(record.title, "Sunset timelapse");
    assert_eq!(
        record.link(Quality::Low),
        Some("https://video.example/sd.mp4?efg=1")
    );
    assert_eq!(
        record.link(Quality::High),
        Some("https://video.example/hd.mp4?efg=2")
    );
}

#[tokio::test]
async fn scrape_of_bare_page_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>login required</p>"))
        .mount(&server)
        .await;

    let record = scrape(&fetcher(), &server.uri()).await.unwrap();
    assert_eq!(record.title, NO_TITLE);
    assert!(!record.has_links());
}

#[tokio::test]
async fn upstream_failure_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = scrape(&fetcher(), &server.uri()).await.unwrap_err();
    assert_eq!(err.to_string(), "failed to fetch page");
}

#[tokio::test]
async fn configured_timeout_bounds_the_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let cfg = FetchConfig {
        timeout_secs: 1,
        ..FetchConfig::default()
    };
    let fetcher = BrowserFetcher::from_config(&cfg).unwrap();
    let err = fetcher.fetch(&server.uri()).await.unwrap_err();
    assert!(matches!(err, HttpError::Timeout(_)));
}

#[test]
fn invalid_user_agent_is_rejected() {
    let cfg = FetchConfig {
        user_agent: "bad\nagent".into(),
        ..FetchConfig::default()
    };
    assert!(BrowserFetcher::from_config(&cfg).is_err());
}
