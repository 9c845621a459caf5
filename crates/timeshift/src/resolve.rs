// Time-shift URI resolution: an authorized call against the broadcaster's
// API that yields the media-playlist URI for a past broadcast window.

use crate::error::EngineError;
use crate::program::Program;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

pub const AREA_ID_HEADER: &str = "X-Radiko-AreaId";
pub const AUTH_TOKEN_HEADER: &str = "X-Radiko-AuthToken";

const TIMESHIFT_PLAYLIST_PATH: &str = "v2/api/ts/playlist.m3u8";
// The endpoint rejects requests without a page-size parameter.
const TIMESHIFT_PAGE_SIZE: &str = "15";

/// Opaque authorization collaborator. How the area id and token are obtained
/// is the broadcaster client's business, not this crate's.
#[async_trait]
pub trait RequestSigner: Send + Sync {
    fn area_id(&self, station_id: &str) -> String;
    async fn auth_token(
        &self,
        area_id: &str,
        token: &CancellationToken,
    ) -> Result<String, EngineError>;
}

/// Resolves a program to the media-playlist URI of its time-shifted stream.
#[async_trait]
pub trait TimeshiftResolver: Send + Sync {
    async fn resolve(
        &self,
        program: &Program,
        token: &CancellationToken,
    ) -> Result<String, EngineError>;
}

/// [`TimeshiftResolver`] over the broadcaster's playlist endpoint.
pub struct TimeshiftClient {
    http: reqwest::Client,
    base_url: Url,
    signer: Arc<dyn RequestSigner>,
}

impl TimeshiftClient {
    pub fn new(base_url: Url, signer: Arc<dyn RequestSigner>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            signer,
        }
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        signer: Arc<dyn RequestSigner>,
    ) -> Self {
        Self {
            http,
            base_url,
            signer,
        }
    }
}

#[async_trait]
impl TimeshiftResolver for TimeshiftClient {
    async fn resolve(
        &self,
        program: &Program,
        token: &CancellationToken,
    ) -> Result<String, EngineError> {
        let area_id = self.signer.area_id(&program.station_id);
        let auth_token = self.signer.auth_token(&area_id, token).await?;
        debug!(station = %program.station_id, area_id, "authorized time-shift request");

        let url = self
            .base_url
            .join(TIMESHIFT_PLAYLIST_PATH)
            .map_err(|e| EngineError::configuration(format!("invalid time-shift URL: {e}")))?;
        let request = self
            .http
            .post(url.clone())
            .query(&[
                ("station_id", program.station_id.as_str()),
                ("ft", program.start.as_str()),
                ("to", program.end.as_str()),
                ("l", TIMESHIFT_PAGE_SIZE),
            ])
            .header(AREA_ID_HEADER, &area_id)
            .header(AUTH_TOKEN_HEADER, &auth_token);

        let response = tokio::select! {
            _ = token.cancelled() => return Err(EngineError::Cancelled),
            result = request.send() => result?,
        };
        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::http_status(
                status,
                url.as_str(),
                "time-shift resolution",
            ));
        }

        let body = response.bytes().await?;
        Ok(chunklist::resolve_variant(&body)?)
    }
}
