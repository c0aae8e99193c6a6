use crate::error::{SuggestError, SuggestResult};
use crate::models::{ErrorBody, SimilarArtist, SimilarArtistsResponse};
use playtally_core::redact::redact_secrets;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://ws.audioscrobbler.com/2.0/";

/// Something that knows which artists sound alike.
pub trait SimilarArtistSource {
    /// Up to `limit` artists similar to `artist`, best match first.
    fn similar_artists(&self, artist: &str, limit: u32) -> SuggestResult<Vec<SimilarArtist>>;
}

/// Blocking Last.fm web service client.
pub struct LastFmClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for LastFmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LastFmClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl LastFmClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> SuggestResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("playtally/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SuggestError::Network {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    fn similar_url(&self, artist: &str, limit: u32) -> SuggestResult<Url> {
        let limit = limit.to_string();
        Url::parse_with_params(
            &self.base_url,
            [
                ("method", "artist.getsimilar"),
                ("artist", artist),
                ("limit", limit.as_str()),
                ("autocorrect", "1"),
                ("api_key", self.api_key.as_str()),
                ("format", "json"),
            ],
        )
        .map_err(|e| SuggestError::Network {
            message: format!("invalid base URL {}: {e}", self.base_url),
        })
    }
}

impl SimilarArtistSource for LastFmClient {
    fn similar_artists(&self, artist: &str, limit: u32) -> SuggestResult<Vec<SimilarArtist>> {
        let url = self.similar_url(artist, limit)?;
        tracing::debug!(url = %redact_secrets(url.as_str()), "requesting similar artists");

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| SuggestError::Network {
                message: redact_secrets(&e.to_string()).into_owned(),
            })?;
        let status = response.status();
        let body = response.text().map_err(|e| SuggestError::Network {
            message: redact_secrets(&e.to_string()).into_owned(),
        })?;

        let error_body = serde_json::from_str::<ErrorBody>(&body).ok();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(SuggestError::Authentication {
                message: error_body
                    .map(|e| e.message)
                    .unwrap_or_else(|| format!("HTTP {status}")),
            });
        }
        if let Some(ErrorBody { error, message }) = error_body {
            return Err(SuggestError::Api {
                code: error,
                message,
            });
        }
        if !status.is_success() {
            return Err(SuggestError::Http {
                status: status.as_u16(),
            });
        }

        let parsed: SimilarArtistsResponse =
            serde_json::from_str(&body).map_err(|e| SuggestError::Decode {
                message: e.to_string(),
            })?;
        let artists: Vec<SimilarArtist> = parsed
            .similar_artists
            .artist
            .into_vec()
            .into_iter()
            .map(SimilarArtist::from)
            .collect();
        tracing::debug!(artist, count = artists.len(), "similar artists received");
        Ok(artists)
    }
}
