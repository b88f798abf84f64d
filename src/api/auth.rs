//! Authentication flow
//!
//! Obtains the first access token (browser redirect, delegated login,
//! persisted session, or a host-supplied session id) and refreshes it when
//! the API reports it expired.
//!
//! Refreshes are single-flight: while one token request is in flight, every
//! other caller of [`AuthFlow::refresh`] awaits that same request instead of
//! issuing its own.

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Method;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::constants::{self, headers, AUTHORIZE_PATH, CUSTOM_DOMAIN_MARKER, TOKEN_PATH};
use super::error::AuthError;
use super::models::{Credentials, OAuthResponse, Session, SessionUpdate};
use super::session::SessionStore;
use super::transport::{HttpRequest, HttpTransport, RequestBody};
use crate::config::ClientConfig;

/// Where the flow currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Failed,
}

/// How `begin` should obtain a token
#[derive(Debug, Clone)]
pub enum AuthHint {
    /// Browser redirect flow. `callback_url` is the URL the browser came back
    /// on, if it already did; its fragment carries the token.
    Redirect {
        redirect_uri: String,
        callback_url: Option<String>,
    },
    /// Delegated native login that already produced a token
    Credentials(Credentials),
    /// Running inside a host page that supplied a session id at construction
    Embedded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    Authenticated(Session),
    /// The host must send the user to this authorize URL, then call `begin`
    /// again with the callback URL
    Redirect(String),
}

type CompletionHook = Arc<dyn Fn(Option<&Session>) + Send + Sync>;
type RefreshFuture = Shared<BoxFuture<'static, Result<Session, AuthError>>>;

#[derive(Clone)]
pub struct AuthFlow {
    config: Arc<ClientConfig>,
    session: SessionStore,
    transport: Arc<dyn HttpTransport>,
    state: Arc<RwLock<AuthState>>,
    in_flight: Arc<Mutex<Option<RefreshFuture>>>,
    on_complete: Option<CompletionHook>,
}

impl AuthFlow {
    pub fn new(
        config: Arc<ClientConfig>,
        session: SessionStore,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            config,
            session,
            transport,
            state: Arc::new(RwLock::new(AuthState::Unauthenticated)),
            in_flight: Arc::new(Mutex::new(None)),
            on_complete: None,
        }
    }

    /// Hook invoked once `begin` settles: with the session on success, `None` on failure
    pub fn on_complete<F>(mut self, hook: F) -> Self
    where
        F: Fn(Option<&Session>) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(hook));
        self
    }

    pub async fn state(&self) -> AuthState {
        *self.state.read().await
    }

    pub fn session_store(&self) -> &SessionStore {
        &self.session
    }

    /// Authorize URL for the browser redirect flow
    pub fn authorize_url(&self, redirect_uri: &str) -> String {
        format!(
            "{}?display=touch&response_type=token&client_id={}&redirect_uri={}",
            constants::join_url(&self.config.login_url, AUTHORIZE_PATH),
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(redirect_uri)
        )
    }

    /// Obtain the first token
    ///
    /// Sources are tried in order: the redirect callback fragment, the
    /// credentials object, then the persisted session.
    pub async fn begin(&self, hint: AuthHint) -> Result<AuthOutcome, AuthError> {
        self.set_state(AuthState::Authenticating).await;

        if let AuthHint::Embedded = hint {
            let result = self.begin_embedded().await;
            return self.settle(result).await.map(AuthOutcome::Authenticated);
        }

        let mut response = match &hint {
            AuthHint::Redirect {
                callback_url: Some(callback_url),
                ..
            } => parse_fragment(callback_url),
            AuthHint::Credentials(credentials) => Some(credentials.clone().into()),
            _ => None,
        }
        .filter(OAuthResponse::has_token);

        if response.is_none() {
            match self.session.load_persisted().await {
                Ok(persisted) => {
                    response = persisted.map(OAuthResponse::from).filter(OAuthResponse::has_token)
                }
                Err(e) => log::warn!("Could not read persisted session: {}", e),
            }
        }

        match response {
            Some(response) => {
                let result = self.establish(response).await;
                self.settle(result).await.map(AuthOutcome::Authenticated)
            }
            None => match hint {
                AuthHint::Redirect { redirect_uri, .. } => {
                    let url = self.authorize_url(&redirect_uri);
                    log::info!("No token available, redirect required");
                    Ok(AuthOutcome::Redirect(url))
                }
                _ => {
                    log::error!("Don't know how to authenticate: no token from any source");
                    self.settle(Err(AuthError::NoToken)).await.map(AuthOutcome::Authenticated)
                }
            },
        }
    }

    /// Exchange the stored refresh token for a new access token
    ///
    /// Only the access token and instance URL change; the refresh token and
    /// user id are kept.
    pub async fn refresh(&self) -> Result<Session, AuthError> {
        let shared = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref().filter(|pending| pending.peek().is_none()) {
                Some(pending) => {
                    log::debug!("Joining in-flight token refresh");
                    pending.clone()
                }
                None => {
                    let pending = self.clone().refresh_once().boxed().shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        shared.await
    }

    /// Clear the session (and its durable copy) and start over
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.session
            .clear()
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        self.set_state(AuthState::Unauthenticated).await;
        log::info!("Logged out");
        Ok(())
    }

    async fn refresh_once(self) -> Result<Session, AuthError> {
        let session = self.session.get().await;
        let refresh_token = session.refresh_token.ok_or(AuthError::NoRefreshToken)?;

        let token_url = constants::join_url(&self.config.login_url, TOKEN_PATH);
        let mut request = match &self.config.proxy_url {
            Some(proxy_url) => HttpRequest::new(Method::POST, proxy_url.clone())
                .header(headers::PROXY_ENDPOINT, token_url.clone()),
            None => HttpRequest::new(Method::POST, token_url.clone()),
        };
        request.body = Some(RequestBody::Form(vec![
            ("grant_type".to_string(), "refresh_token".to_string()),
            ("client_id".to_string(), self.config.client_id.clone()),
            ("refresh_token".to_string(), refresh_token),
        ]));

        log::info!("Refreshing access token");
        let response = self.transport.execute(request).await?;
        log::debug!("Token request status: {}", response.status);

        if !response.is_success() {
            return Err(AuthError::Rejected(response.into_failure()));
        }

        let token: OAuthResponse = serde_json::from_slice(&response.body)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        let access_token = token
            .access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AuthError::InvalidResponse("No access token in response".to_string()))?;
        let instance_url = match token.instance_url {
            Some(url) => url,
            None => self.derive_instance_url()?,
        };

        let update = SessionUpdate::token(access_token).instance_url(instance_url);
        match self.session.set(update).await {
            Ok(session) => {
                log::info!("Access token refreshed");
                Ok(session)
            }
            Err(e) => {
                log::warn!("Refreshed token could not be persisted: {}", e);
                Ok(self.session.get().await)
            }
        }
    }

    async fn begin_embedded(&self) -> Result<Session, AuthError> {
        let session_id = self.config.session_id.clone().ok_or(AuthError::NoSessionId)?;
        let host = self
            .config
            .host
            .clone()
            .ok_or_else(|| AuthError::UnresolvableInstance(String::new()))?;

        self.establish(OAuthResponse {
            access_token: Some(session_id),
            instance_url: Some(format!("https://{}", host)),
            user_id: self.session.get().await.user_id,
            ..Default::default()
        })
        .await
    }

    async fn establish(&self, response: OAuthResponse) -> Result<Session, AuthError> {
        let user_id = response.resolved_user_id();
        let access_token = response
            .access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or(AuthError::NoToken)?;
        let instance_url = match response.instance_url {
            Some(url) => url,
            None => self.derive_instance_url()?,
        };

        let mut update = SessionUpdate::token(access_token).instance_url(instance_url);
        update.refresh_token = response.refresh_token;
        update.user_id = user_id;

        let session = self
            .session
            .set(update)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        if !session.persist {
            // A stored token may be obsolete by the time it would be used again
            if let Err(e) = self.session.remove_persisted().await {
                log::warn!("Could not remove stale persisted session: {}", e);
            }
        }

        Ok(session)
    }

    fn derive_instance_url(&self) -> Result<String, AuthError> {
        let host = self.config.host.as_deref().unwrap_or_default();
        instance_root(host)
            .map(|instance| format!("https://{}.salesforce.com", instance))
            .ok_or_else(|| AuthError::UnresolvableInstance(host.to_string()))
    }

    async fn settle(&self, result: Result<Session, AuthError>) -> Result<Session, AuthError> {
        match &result {
            Ok(session) => {
                self.set_state(AuthState::Authenticated).await;
                log::info!("Authenticated against {:?}", session.instance_url);
                if let Some(hook) = &self.on_complete {
                    hook(Some(session));
                }
            }
            Err(e) => {
                self.set_state(AuthState::Failed).await;
                log::warn!("Did not receive a token, not authenticated: {}", e);
                if let Some(hook) = &self.on_complete {
                    hook(None);
                }
            }
        }
        result
    }

    async fn set_state(&self, state: AuthState) {
        *self.state.write().await = state;
    }
}

/// Instance root for a host name
///
/// `abc.my.salesforce.com` (custom domain) gives `abc.my`, `na1.salesforce.com`
/// gives `na1`, anything else (`abc.na1.visual.force.com`) gives the second label.
pub fn instance_root(host: &str) -> Option<String> {
    let labels: Vec<&str> = host.split('.').collect();
    match labels.as_slice() {
        [first, second, _, _] if *second == CUSTOM_DOMAIN_MARKER => {
            Some(format!("{}.{}", first, second))
        }
        [first, _, _] => Some(first.to_string()),
        [_, second, ..] => Some(second.to_string()),
        _ => None,
    }
}

/// Token fields from the fragment of a redirect callback URL
pub fn parse_fragment(url: &str) -> Option<OAuthResponse> {
    let (_, fragment) = url.split_once('#')?;
    if !fragment.contains("access_token") {
        return None;
    }

    let mut response = OAuthResponse::default();
    for pair in fragment.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = urlencoding::decode(&value.replace('+', " "))
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        match key {
            "access_token" => response.access_token = Some(value),
            "refresh_token" => response.refresh_token = Some(value),
            "instance_url" => response.instance_url = Some(value),
            "user_id" => response.user_id = Some(value),
            "id" => response.id = Some(value),
            _ => {}
        }
    }
    Some(response)
}
