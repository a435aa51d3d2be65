//! End-to-end adapter runs against mock sites.

use nexus::scrapers::{
    apibay, limetorrents, nyaa, torrentproject, Apibay, DetailResolver, FetchOptions, Fetcher,
    LimeTorrents, Nyaa, ScrapeError, Scraper, SiteConfig, SiteCore, TorrentProject,
};
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> Fetcher {
    Fetcher::new(&FetchOptions::default()).expect("failed to build client")
}

fn core_for(mut config: SiteConfig, server: &MockServer) -> SiteCore {
    config.base_url = server.uri();
    config.mirrors.clear();
    SiteCore::new(config, fetcher(), DetailResolver::default())
}

fn hash(i: usize) -> String {
    format!("{:040X}", i + 1)
}

fn lime_listing(count: usize, stats: &str) -> String {
    let rows: String = (0..count)
        .map(|i| {
            format!(
                r#"<tr><td class="tdleft"><div class="tt-name"><a href="http://itorrents.org/torrent/x.torrent" class="csprite_dl14"></a><a href="/ubuntu-{i}-torrent.html">Ubuntu build {i}</a></div></td><td>1 GB</td></tr>"#
            )
        })
        .collect();
    format!(
        r#"<html><body><table class="table2"><tr><th>Torrent Name</th></tr>{rows}</table>{stats}</body></html>"#
    )
}

fn lime_detail(hash: &str) -> String {
    format!(
        r#"<html><body><div class="downloadarea"><a class="csprite_dltorrent" href="http://itorrents.org/torrent/{hash}.torrent?title=ubuntu">Download torrent</a></div></body></html>"#
    )
}

async fn mount_lime_details(server: &MockServer, resolvable: usize) {
    for i in 0..resolvable {
        Mock::given(method("GET"))
            .and(path(format!("/ubuntu-{i}-torrent.html")))
            .respond_with(ResponseTemplate::new(200).set_body_string(lime_detail(&hash(i))))
            .expect(1)
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn search_resolves_what_it_can_and_keeps_the_rest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex("^/search/all/ubuntu"))
        .respond_with(ResponseTemplate::new(200).set_body_string(lime_listing(5, "")))
        .expect(1)
        .mount(&server)
        .await;
    // the fifth detail page is not mounted and answers 404
    mount_lime_details(&server, 4).await;

    let adapter = LimeTorrents::new(core_for(limetorrents::default_config(), &server));
    let result = adapter.search("ubuntu", 1, 5).await.unwrap();

    assert_eq!(result.query, "ubuntu");
    assert_eq!(result.total, 5);
    assert_eq!(result.entries.len(), 5);
    assert_eq!(result.resolved_count(), 4);
    assert!(result.time > 0.0);
    assert!(result.error.is_none());

    for (i, entry) in result.entries.iter().enumerate().take(4) {
        assert_eq!(entry.name, format!("Ubuntu build {i}"));
        assert_eq!(entry.infohash.as_deref(), Some(hash(i).as_str()));
        assert_eq!(entry.site.as_deref(), Some(server.uri().as_str()));
        assert_eq!(entry.detail_url, None);
    }
    let unresolved = &result.entries[4];
    assert_eq!(unresolved.name, "Ubuntu build 4");
    assert_eq!(unresolved.infohash, None);
    assert!(unresolved.detail_url.is_some());
}

#[tokio::test]
async fn listing_is_cut_at_the_limit_before_detail_fetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex("^/search/all/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(lime_listing(8, "")))
        .mount(&server)
        .await;
    mount_lime_details(&server, 3).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/ubuntu-[3-7]-torrent\.html$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let adapter = LimeTorrents::new(core_for(limetorrents::default_config(), &server));
    let result = adapter.search("ubuntu", 1, 3).await.unwrap();

    assert_eq!(result.total, 3);
    assert_eq!(result.resolved_count(), 3);
}

#[tokio::test]
async fn site_limit_caps_the_call_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex("^/search/all/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(lime_listing(6, "")))
        .mount(&server)
        .await;
    mount_lime_details(&server, 2).await;

    let config = limetorrents::default_config().with_limit(2);
    let adapter = LimeTorrents::new(core_for(config, &server));
    let result = adapter.search("ubuntu", 1, 10).await.unwrap();

    assert_eq!(result.total, 2);
}

#[tokio::test]
async fn inconsistent_pagination_is_clamped() {
    let server = MockServer::start().await;
    let stats = r#"<div class="search_stat"><a href="/search/all/ubuntu//1">1</a><a href="/search/all/ubuntu//2">2</a><span class="active">3</span><a href="/search/all/ubuntu//4">Next</a></div>"#;
    Mock::given(method("GET"))
        .and(path_regex("^/search/all/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(lime_listing(1, stats)))
        .mount(&server)
        .await;
    mount_lime_details(&server, 1).await;

    let adapter = LimeTorrents::new(core_for(limetorrents::default_config(), &server));
    let result = adapter.search("ubuntu", 3, 5).await.unwrap();

    assert_eq!(result.current_page, Some(3));
    assert_eq!(result.total_pages, Some(3));
}

#[tokio::test]
async fn unreachable_listing_gives_an_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let adapter = LimeTorrents::new(core_for(limetorrents::default_config(), &server));
    let result = adapter.search("ubuntu", 1, 5).await.unwrap();

    assert_eq!(result.total, 0);
    assert!(result.entries.is_empty());
    assert!(result.error.is_none());
    assert!(result.is_empty());
}

#[tokio::test]
async fn recent_maps_category_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/browse-torrents/Applications/date/2/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(lime_listing(1, "")))
        .expect(1)
        .mount(&server)
        .await;
    mount_lime_details(&server, 1).await;

    let adapter = LimeTorrents::new(core_for(limetorrents::default_config(), &server));
    let result = adapter.recent(Some("Apps"), 2, 5).await.unwrap();

    assert_eq!(result.query, "apps");
    assert_eq!(result.total, 1);
}

#[tokio::test]
async fn unknown_category_is_an_adapter_error() {
    let server = MockServer::start().await;
    let adapter = LimeTorrents::new(core_for(limetorrents::default_config(), &server));

    let err = adapter.recent(Some("podcasts"), 1, 5).await.unwrap_err();
    assert!(matches!(err, ScrapeError::UnknownCategory { ref category, .. } if category == "podcasts"));
}

#[tokio::test]
async fn torrentproject_only_searches() {
    let server = MockServer::start().await;
    let adapter = TorrentProject::new(core_for(torrentproject::default_config(), &server));

    assert!(matches!(
        adapter.recent(None, 1, 5).await,
        Err(ScrapeError::Unsupported { .. })
    ));
    assert!(matches!(
        adapter.trending(None, 1, 5).await,
        Err(ScrapeError::Unsupported { .. })
    ));
    assert!(matches!(
        adapter.category_search("ubuntu", "apps", 1, 5).await,
        Err(ScrapeError::Unsupported { .. })
    ));
}

#[tokio::test]
async fn nyaa_returns_listing_entries_without_detail_fetches() {
    let server = MockServer::start().await;
    let listing = format!(
        r#"<table class="torrent-list"><tbody>
        <tr><td><a href="/?c=1_2">Anime</a></td><td colspan="2"><a href="/view/7" title="Show - 01">Show - 01</a></td><td><a href="magnet:?xt=urn:btih:{}&amp;dn=show">m</a></td></tr>
        </tbody></table>"#,
        "a".repeat(40)
    );
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("q", "show"))
        .and(query_param("p", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = Nyaa::new(core_for(nyaa::default_config(), &server));
    let result = adapter.search("show", 1, 5).await.unwrap();

    assert_eq!(result.total, 1);
    assert_eq!(result.entries[0].infohash.as_deref(), Some("a".repeat(40).as_str()));
    assert_eq!(result.entries[0].site.as_deref(), Some(server.uri().as_str()));
}

#[tokio::test]
async fn apibay_search_reads_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/q.php"))
        .and(query_param("q", "ubuntu iso"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[{"id":"1","name":"Ubuntu ISO","info_hash":"ABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD"}]"#,
        ))
        .mount(&server)
        .await;

    let adapter = Apibay::new(core_for(apibay::default_config(), &server));
    let result = adapter.search("ubuntu iso", 1, 5).await.unwrap();
    assert_eq!(result.total, 1);
    assert_eq!(result.entries[0].name, "Ubuntu ISO");

    let second_page = adapter.search("ubuntu iso", 2, 5).await.unwrap();
    assert_eq!(second_page.total, 0);
}
