//! Request/response access to the game backend.
//!
//! The gateway holds no game state. Every call either returns the decoded
//! payload or a [`GatewayError`]; retry policy belongs to the caller.

use crate::model::{
    ClickReceipt,
    GameSnapshot,
    LoadReceipt,
    PurchaseReceipt,
    PurchaseRequest,
    SaveReceipt,
    SelectReceipt,
    TargetId,
};
use reqwest::StatusCode;
use serde::{
    Serialize,
    de::DeserializeOwned,
};
use std::{
    future::Future,
    time::Duration,
};

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Transport-level failure talking to the backend. Callers treat every
/// variant as "no new information".
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("failed to build HTTP client for the game backend")]
    Client(#[source] reqwest::Error),
    #[error("request to {endpoint} failed")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} responded with {status}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
    #[error("invalid payload from {endpoint}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The remote authority as seen by the client.
pub trait GameGateway: Clone + Send + Sync + 'static {
    fn fetch_state(&self) -> impl Future<Output = GatewayResult<GameSnapshot>> + Send;

    fn submit_click(
        &self,
        target: TargetId,
    ) -> impl Future<Output = GatewayResult<ClickReceipt>> + Send;

    fn submit_select(
        &self,
        target: TargetId,
    ) -> impl Future<Output = GatewayResult<SelectReceipt>> + Send;

    fn submit_purchase(
        &self,
        kind: &str,
        target: Option<TargetId>,
    ) -> impl Future<Output = GatewayResult<PurchaseReceipt>> + Send;

    fn save(&self) -> impl Future<Output = GatewayResult<SaveReceipt>> + Send;

    fn load(&self) -> impl Future<Output = GatewayResult<LoadReceipt>> + Send;
}

#[derive(Clone, Debug)]
pub struct HttpGateway {
    base_url: String,
    http: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> GatewayResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GatewayError::Client)?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| GatewayError::Request {
                endpoint: path.to_string(),
                source,
            })?;
        Self::decode(path, res).await
    }

    async fn post_json<T, B>(&self, path: &str, body: Option<&B>) -> GatewayResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let res = request
            .send()
            .await
            .map_err(|source| GatewayError::Request {
                endpoint: path.to_string(),
                source,
            })?;
        Self::decode(path, res).await
    }

    async fn decode<T: DeserializeOwned>(
        path: &str,
        res: reqwest::Response,
    ) -> GatewayResult<T> {
        let status = res.status();
        let bytes = res.bytes().await.map_err(|source| GatewayError::Request {
            endpoint: path.to_string(),
            source,
        })?;
        if !status.is_success() {
            return Err(GatewayError::Status {
                endpoint: path.to_string(),
                status,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        serde_json::from_slice(&bytes).map_err(|source| GatewayError::Decode {
            endpoint: path.to_string(),
            source,
        })
    }
}

impl GameGateway for HttpGateway {
    async fn fetch_state(&self) -> GatewayResult<GameSnapshot> {
        self.get_json("/game").await
    }

    async fn submit_click(&self, target: TargetId) -> GatewayResult<ClickReceipt> {
        self.post_json::<_, ()>(&format!("/clic/{target}"), None)
            .await
    }

    async fn submit_select(&self, target: TargetId) -> GatewayResult<SelectReceipt> {
        self.post_json::<_, ()>(&format!("/select/{target}"), None)
            .await
    }

    async fn submit_purchase(
        &self,
        kind: &str,
        target: Option<TargetId>,
    ) -> GatewayResult<PurchaseReceipt> {
        let body = PurchaseRequest { kind, target };
        self.post_json("/amelioration/acheter", Some(&body)).await
    }

    async fn save(&self) -> GatewayResult<SaveReceipt> {
        self.post_json::<_, ()>("/save", None).await
    }

    async fn load(&self) -> GatewayResult<LoadReceipt> {
        self.post_json::<_, ()>("/load", None).await
    }
}
