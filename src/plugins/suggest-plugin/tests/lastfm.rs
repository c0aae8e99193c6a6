use suggest_plugin::{LastFmClient, SimilarArtist, SimilarArtistSource, SuggestError, SuggestResult};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// The blocking client runs its own runtime, so it must live off the async
/// test thread.
async fn similar(base_url: String, artist: &'static str) -> SuggestResult<Vec<SimilarArtist>> {
    tokio::task::spawn_blocking(move || {
        let client = LastFmClient::new(base_url, "test-key")?;
        client.similar_artists(artist, 3)
    })
    .await
    .expect("blocking task")
}

#[tokio::test(flavor = "multi_thread")]
async fn fetches_similar_artists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2.0/"))
        .and(query_param("method", "artist.getsimilar"))
        .and(query_param("artist", "Cher"))
        .and(query_param("limit", "3"))
        .and(query_param("autocorrect", "1"))
        .and(query_param("api_key", "test-key"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"similarartists":{"artist":[
                {"name":"Sonny & Cher","mbid":"","match":"1","url":"https://www.last.fm/music/Sonny+&+Cher"},
                {"name":"Madonna","match":0.71}
            ],"@attr":{"artist":"Cher"}}}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let artists = similar(format!("{}/2.0/", server.uri()), "Cher")
        .await
        .expect("similar artists");
    assert_eq!(
        artists,
        vec![
            SimilarArtist::new("Sonny & Cher", 1.0),
            SimilarArtist::new("Madonna", 0.71),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn error_body_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"error":6,"message":"The artist you supplied could not be found","links":[]}"#,
        ))
        .mount(&server)
        .await;

    let err = similar(format!("{}/2.0/", server.uri()), "Nobody")
        .await
        .unwrap_err();
    assert!(
        matches!(err, SuggestError::Api { code: 6, ref message } if message.contains("could not be found")),
        "unexpected error: {err:?}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn forbidden_is_an_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string(
            r#"{"error":10,"message":"Invalid API key - You must be granted a valid key by last.fm"}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let err = similar(format!("{}/2.0/", server.uri()), "Cher")
        .await
        .unwrap_err();
    assert!(matches!(err, SuggestError::Authentication { .. }), "unexpected error: {err:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn server_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = similar(format!("{}/2.0/", server.uri()), "Cher")
        .await
        .unwrap_err();
    assert!(matches!(err, SuggestError::Http { status: 503 }), "unexpected error: {err:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_host_is_a_network_error() {
    // Reserve a port, then free it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    let base_url = format!("http://127.0.0.1:{port}/2.0/");

    let err = similar(base_url, "Cher").await.unwrap_err();
    assert!(matches!(err, SuggestError::Network { .. }), "unexpected error: {err:?}");
}
