//! Force.com REST client
//!
//! `ForceClient` is the request pipeline: it signs every call with the
//! current session, routes it through the proxy when one is configured and
//! recovers from one expired token per request by refreshing and resending.
//! The REST helpers below are thin wrappers over [`ForceClient::send`].

use reqwest::Method;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::auth::AuthFlow;
use super::constants::{self, headers, APEX_REST_PATH, DATA_PATH, USER_AGENT_PRODUCT};
use super::error::{AuthError, HttpFailure, RequestError};
use super::logging::{self, RequestContext};
use super::models::{Session, UserInfo};
use super::query::{FieldDef, FilterTerm, QueryDescriptor, QueryResponse};
use super::request::{ApiResponse, RequestDescriptor};
use super::session::SessionStore;
use super::transport::{HttpRequest, HttpResponse, HttpTransport, RequestBody, ReqwestTransport};
use crate::config::{ClientConfig, KeyValueStorage, SqliteStorage};

const STATUS_UNAUTHORIZED: u16 = 401;

/// Authenticated client for one org
///
/// Cheap to clone; clones share the session, the transport and the
/// in-flight refresh.
#[derive(Clone)]
pub struct ForceClient {
    config: Arc<ClientConfig>,
    session: SessionStore,
    auth: AuthFlow,
    transport: Arc<dyn HttpTransport>,
}

impl ForceClient {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        storage: Option<Arc<dyn KeyValueStorage>>,
    ) -> Self {
        let config = Arc::new(config);
        let session = match storage {
            Some(storage) => {
                SessionStore::with_storage(&config.api_version, config.save_token_locally, storage)
            }
            None => SessionStore::new(&config.api_version, config.save_token_locally),
        };
        let auth = AuthFlow::new(config.clone(), session.clone(), transport.clone());

        Self {
            config,
            session,
            auth,
            transport,
        }
    }

    /// Client on the reqwest transport with SQLite-backed session storage
    pub async fn connect(config: ClientConfig) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(config.timeout())?;
        let storage: Option<Arc<dyn KeyValueStorage>> = if config.save_token_locally {
            let path = config.resolved_storage_path()?;
            Some(Arc::new(SqliteStorage::open(&path).await?))
        } else {
            None
        };
        Ok(Self::new(config, Arc::new(transport), storage))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn auth(&self) -> &AuthFlow {
        &self.auth
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Clear the session and its durable copy
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.auth.logout().await
    }

    /// Send a JSON request; an empty success body decodes to `Value::Null`
    pub async fn send(&self, descriptor: RequestDescriptor) -> Result<ApiResponse, RequestError> {
        let response = self.dispatch(descriptor).await?;
        let body = if response.body.iter().all(|b| b.is_ascii_whitespace()) {
            Value::Null
        } else {
            serde_json::from_slice(&response.body).map_err(|e| RequestError::Decode(e.to_string()))?
        };

        Ok(ApiResponse {
            status: response.status,
            headers: response.headers,
            body,
        })
    }

    /// Send a request whose answer is raw content, returned undecoded
    pub async fn send_bytes(&self, descriptor: RequestDescriptor) -> Result<Vec<u8>, RequestError> {
        Ok(self.dispatch(descriptor).await?.body)
    }

    async fn dispatch(
        &self,
        mut descriptor: RequestDescriptor,
    ) -> Result<HttpResponse, RequestError> {
        loop {
            let session = self.session.get().await;
            let request = self.build_request(&descriptor, &session)?;

            let attempt = u32::from(descriptor.is_retried());
            let context =
                RequestContext::new(descriptor.method.as_str(), &descriptor.path, attempt);
            let request = request.header(headers::X_CORRELATION_ID, context.correlation_id.clone());
            logging::log_request(&context, &request.url, &request.headers);

            let response = self.transport.execute(request).await?;
            logging::log_response(&context, response.status);

            if response.is_success() {
                return Ok(response);
            }

            let failure = response.into_failure();
            if failure.status != STATUS_UNAUTHORIZED {
                return Err(RequestError::RemoteRejected(failure));
            }

            if session.refresh_token.is_none() || descriptor.is_retried() {
                log::warn!(
                    "Authorization rejected for {} {} with no refresh left",
                    descriptor.method,
                    descriptor.path
                );
                return Err(RequestError::AuthorizationExpired(failure));
            }

            let current = self.session.get().await;
            if current.access_token.is_some() && current.access_token != session.access_token {
                log::debug!("Token already replaced since this attempt was sent, skipping refresh");
            } else {
                self.refresh_after(failure).await?;
            }
            descriptor.mark_retried();
            log::info!(
                "Resending {} {} with the refreshed token",
                descriptor.method,
                descriptor.path
            );
        }
    }

    /// Refresh once after a 401; a failed refresh surfaces as the original failure
    async fn refresh_after(&self, failure: HttpFailure) -> Result<(), RequestError> {
        match self.auth.refresh().await {
            Ok(_) => Ok(()),
            Err(e) => {
                log::warn!("Token refresh failed, returning the original failure: {}", e);
                Err(RequestError::AuthorizationExpired(failure))
            }
        }
    }

    fn build_request(
        &self,
        descriptor: &RequestDescriptor,
        session: &Session,
    ) -> Result<HttpRequest, RequestError> {
        let Some(access_token) = session.access_token.as_deref() else {
            return Err(RequestError::Unauthenticated);
        };

        let absolute =
            descriptor.path.starts_with("http://") || descriptor.path.starts_with("https://");
        let target = if absolute {
            descriptor.path.clone()
        } else {
            let Some(instance_url) = session.instance_url.as_deref() else {
                log::warn!("Session has a token but no instance URL");
                return Err(RequestError::Unauthenticated);
            };
            constants::join_url(instance_url, &descriptor.path)
        };

        let authorization = format!("{} {}", headers::TOKEN_SCHEME, access_token);
        let mut request = match &self.config.proxy_url {
            Some(proxy_url) => HttpRequest::new(descriptor.method.clone(), proxy_url.clone())
                .header(headers::PROXY_ENDPOINT, target)
                .header(headers::PROXY_AUTHORIZATION, authorization),
            None => HttpRequest::new(descriptor.method.clone(), target)
                .header(headers::AUTHORIZATION, authorization),
        };

        request = request
            .header("Content-Type", headers::CONTENT_TYPE_JSON)
            .header(
                headers::USER_AGENT,
                format!("{}/{}", USER_AGENT_PRODUCT, session.api_version),
            );
        for (name, value) in &descriptor.headers {
            request = request.header(name.clone(), value.clone());
        }
        request.body = descriptor.body.clone().map(RequestBody::Json);

        Ok(request)
    }

    async fn api_version(&self) -> String {
        self.session.get().await.api_version
    }

    async fn get_json(&self, path: String) -> Result<Value, RequestError> {
        Ok(self.send(RequestDescriptor::get(path)).await?.body)
    }

    /// Available API versions
    pub async fn versions(&self) -> Result<Value, RequestError> {
        self.get_json(format!("{}/", DATA_PATH)).await
    }

    /// Resources available under the current API version
    pub async fn resources(&self) -> Result<Value, RequestError> {
        let version = self.api_version().await;
        self.get_json(format!("{}/", constants::api_path(&version))).await
    }

    /// Every object type in the org
    pub async fn describe_global(&self) -> Result<Value, RequestError> {
        let version = self.api_version().await;
        self.get_json(format!("{}/sobjects/", constants::api_path(&version))).await
    }

    /// Basic metadata of one object type
    pub async fn metadata(&self, collection: &str) -> Result<Value, RequestError> {
        let version = self.api_version().await;
        self.get_json(constants::sobject_endpoint(&version, collection)).await
    }

    /// Full field-level description of one object type
    pub async fn describe(&self, collection: &str) -> Result<Value, RequestError> {
        let version = self.api_version().await;
        self.get_json(format!("{}describe/", constants::sobject_endpoint(&version, collection)))
            .await
    }

    /// Create a record; the answer carries the new id
    pub async fn create(&self, collection: &str, fields: Value) -> Result<Value, RequestError> {
        let version = self.api_version().await;
        let descriptor =
            RequestDescriptor::post(constants::sobject_endpoint(&version, collection), fields);
        Ok(self.send(descriptor).await?.body)
    }

    /// One record, optionally limited to `fields`
    pub async fn retrieve(
        &self,
        collection: &str,
        id: &str,
        fields: Option<&[&str]>,
    ) -> Result<Value, RequestError> {
        let version = self.api_version().await;
        let mut path = constants::record_endpoint(&version, collection, id);
        if let Some(fields) = fields.filter(|f| !f.is_empty()) {
            path.push_str(&format!("?fields={}", fields.join(",")));
        }
        self.get_json(path).await
    }

    /// Create or update by external id
    pub async fn upsert(
        &self,
        collection: &str,
        external_id_field: &str,
        external_id: &str,
        fields: Value,
    ) -> Result<Value, RequestError> {
        let version = self.api_version().await;
        let path = format!(
            "{}{}/{}?{}",
            constants::sobject_endpoint(&version, collection),
            external_id_field,
            external_id,
            constants::METHOD_OVERRIDE_PATCH
        );
        Ok(self.send(RequestDescriptor::post(path, fields)).await?.body)
    }

    /// Update the given fields of one record
    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Value,
    ) -> Result<Value, RequestError> {
        let version = self.api_version().await;
        let descriptor =
            RequestDescriptor::post(constants::patch_endpoint(&version, collection, id), fields);
        Ok(self.send(descriptor).await?.body)
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<Value, RequestError> {
        let version = self.api_version().await;
        let descriptor =
            RequestDescriptor::delete(constants::record_endpoint(&version, collection, id));
        Ok(self.send(descriptor).await?.body)
    }

    /// Run a SOQL statement
    pub async fn query(&self, soql: &str) -> Result<QueryResponse, RequestError> {
        let version = self.api_version().await;
        let body = self.get_json(constants::query_endpoint(&version, soql)).await?;
        QueryResponse::from_json(&body)
    }

    /// Next batch of a query, from its `nextRecordsUrl`
    pub async fn query_more(&self, next_records_url: &str) -> Result<QueryResponse, RequestError> {
        let path = match next_records_url.find(DATA_PATH) {
            Some(index) => &next_records_url[index..],
            None => next_records_url,
        };
        let body = self.get_json(path.to_string()).await?;
        QueryResponse::from_json(&body)
    }

    /// Run a SOSL search
    pub async fn search(&self, sosl: &str) -> Result<Value, RequestError> {
        let version = self.api_version().await;
        self.get_json(constants::search_endpoint(&version, sosl)).await
    }

    /// Call a custom Apex REST resource; `path` is relative to `/services/apexrest`
    pub async fn apex_rest(
        &self,
        path: &str,
        method: Method,
        payload: Option<Value>,
        extra_headers: HashMap<String, String>,
    ) -> Result<ApiResponse, RequestError> {
        let mut descriptor =
            RequestDescriptor::new(method, constants::join_url(APEX_REST_PATH, path));
        descriptor.body = payload;
        descriptor.headers.extend(extra_headers);
        self.send(descriptor).await
    }

    /// Post to the current user's feed, mentioning `to_user_id`
    pub async fn post_feed_with_mention(
        &self,
        to_user_id: &str,
        text: &str,
    ) -> Result<Value, RequestError> {
        let version = self.api_version().await;
        let body = json!({
            "body": {
                "messageSegments": [
                    {"type": "mention", "id": to_user_id},
                    {"type": "text", "text": text}
                ]
            }
        });
        let path = format!(
            "{}/chatter/feeds/user-profile/me/feed-items",
            constants::api_path(&version)
        );
        Ok(self.send(RequestDescriptor::post(path, body)).await?.body)
    }

    /// Comment on a feed item
    pub async fn post_comment(
        &self,
        feed_item_id: &str,
        text: &str,
    ) -> Result<Value, RequestError> {
        let version = self.api_version().await;
        let body = json!({
            "body": {
                "messageSegments": [
                    {"type": "text", "text": text}
                ]
            }
        });
        let path = format!(
            "{}/chatter/feed-items/{}/comments",
            constants::api_path(&version),
            feed_item_id
        );
        Ok(self.send(RequestDescriptor::post(path, body)).await?.body)
    }

    /// Download a Chatter file; `path` is relative to the instance URL
    pub async fn chatter_file(&self, path: &str) -> Result<Vec<u8>, RequestError> {
        self.send_bytes(RequestDescriptor::get(path)).await
    }

    /// Look up the signed-in user and record the display name on the session
    pub async fn load_current_user(&self) -> Result<UserInfo, RequestError> {
        let user_id = self
            .session
            .get()
            .await
            .user_id
            .ok_or_else(|| RequestError::Malformed("session has no user id".to_string()))?;

        let mut descriptor = QueryDescriptor::new(
            "User",
            ["Id", "Name", "Username", "Title", "Email"]
                .into_iter()
                .map(FieldDef::string)
                .collect(),
        );
        descriptor.filters.push(FilterTerm::new("Id", user_id.as_str()));

        let response = self.query(&descriptor.encode()?).await?;
        let record = response
            .records
            .into_iter()
            .next()
            .ok_or_else(|| RequestError::Decode(format!("no User record with id {}", user_id)))?;
        let user: UserInfo =
            serde_json::from_value(record).map_err(|e| RequestError::Decode(e.to_string()))?;

        self.session.set_display_name(user.name.clone()).await;
        log::info!("Signed in as {}", user.name.as_deref().unwrap_or(user.id.as_str()));
        Ok(user)
    }
}
