//! Shared helpers: a scripted transport and pre-authenticated clients

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shinchoku_cli::api::constants::{headers, TOKEN_PATH};
use shinchoku_cli::api::transport::RequestBody;
use shinchoku_cli::api::{
    ForceClient, HttpRequest, HttpResponse, HttpTransport, SessionUpdate, TransportError,
};
use shinchoku_cli::config::{ClientConfig, KeyValueStorage};

pub const INSTANCE_URL: &str = "https://na1.salesforce.com";

type Handler = dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync;
type Delay = dyn Fn(&HttpRequest) -> Duration + Send + Sync;

/// Transport answering from a handler and recording every request
pub struct FakeTransport {
    handler: Box<Handler>,
    delay: Box<Delay>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        Self::with_delay(|_| Duration::ZERO, handler)
    }

    /// Token requests wait `delay` before answering
    pub fn with_token_delay<F>(delay: Duration, handler: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        Self::with_delay(
            move |request| {
                if is_token_request(request) {
                    delay
                } else {
                    Duration::ZERO
                }
            },
            handler,
        )
    }

    /// Each request waits for whatever `delay` picks for it before answering
    pub fn with_delay<D, F>(delay: D, handler: F) -> Arc<Self>
    where
        D: Fn(&HttpRequest) -> Duration + Send + Sync + 'static,
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            delay: Box::new(delay),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Answers with `responses` in order, repeating the last one when exhausted
    pub fn scripted(responses: Vec<HttpResponse>) -> Arc<Self> {
        let calls = AtomicUsize::new(0);
        Self::new(move |_| {
            let index = calls.fetch_add(1, Ordering::SeqCst).min(responses.len() - 1);
            Ok(responses[index].clone())
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn token_requests(&self) -> Vec<HttpRequest> {
        self.requests().into_iter().filter(is_token_request).collect()
    }

    pub fn api_requests(&self) -> Vec<HttpRequest> {
        self.requests().into_iter().filter(|r| !is_token_request(r)).collect()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let delay = (self.delay)(&request);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(&request)
    }
}

/// Token endpoint call, direct or routed through the proxy
pub fn is_token_request(request: &HttpRequest) -> bool {
    request.url.ends_with(TOKEN_PATH)
        || request
            .header_value(headers::PROXY_ENDPOINT)
            .is_some_and(|endpoint| endpoint.ends_with(TOKEN_PATH))
}

/// Authorization header value, direct or proxied
pub fn authorization(request: &HttpRequest) -> Option<String> {
    request
        .header_value(headers::AUTHORIZATION)
        .or_else(|| request.header_value(headers::PROXY_AUTHORIZATION))
        .map(|v| v.to_string())
}

/// JSON body of a request, `Null` when it has none
pub fn json_body(request: &HttpRequest) -> Value {
    match &request.body {
        Some(RequestBody::Json(value)) => value.clone(),
        _ => Value::Null,
    }
}

/// Decoded `q` parameter of a query or search URL
pub fn statement(request: &HttpRequest) -> Option<String> {
    let (_, encoded) = request.url.split_once("?q=")?;
    urlencoding::decode(encoded).ok().map(|s| s.into_owned())
}

pub fn unauthorized() -> HttpResponse {
    HttpResponse::json(
        401,
        &json!([{"message": "Session expired or invalid", "errorCode": "INVALID_SESSION_ID"}]),
    )
}

pub fn token_response(access_token: &str) -> HttpResponse {
    HttpResponse::json(
        200,
        &json!({
            "access_token": access_token,
            "instance_url": INSTANCE_URL,
            "token_type": "Bearer",
            "issued_at": "1392627045325"
        }),
    )
}

pub fn ok(body: Value) -> HttpResponse {
    HttpResponse::json(200, &body)
}

pub fn config() -> ClientConfig {
    let mut config = ClientConfig::new("3MVG9test");
    config.save_token_locally = false;
    config
}

pub fn client(config: ClientConfig, transport: Arc<FakeTransport>) -> ForceClient {
    ForceClient::new(config, transport, None)
}

pub fn client_with_storage(
    config: ClientConfig,
    transport: Arc<FakeTransport>,
    storage: Arc<dyn KeyValueStorage>,
) -> ForceClient {
    ForceClient::new(config, transport, Some(storage))
}

/// Put a session in place without going through the auth flow
pub async fn sign_in(client: &ForceClient, access_token: &str, refresh_token: Option<&str>) {
    let mut update = SessionUpdate::token(access_token).instance_url(INSTANCE_URL);
    update.refresh_token = refresh_token.map(|t| t.to_string());
    client.session().set(update).await.unwrap();
}
