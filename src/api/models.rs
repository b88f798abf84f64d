use serde::{Deserialize, Serialize};

/// The authenticated identity bound to a client
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub instance_url: Option<String>,
    pub api_version: String,
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    /// Whether the session survives a process restart
    pub persist: bool,
}

impl Session {
    pub fn new(api_version: impl Into<String>, persist: bool) -> Self {
        Self {
            api_version: api_version.into(),
            persist,
            ..Default::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn to_persisted(&self) -> Option<PersistedSession> {
        Some(PersistedSession {
            access_token: self.access_token.clone()?,
            instance_url: self.instance_url.clone(),
            refresh_token: self.refresh_token.clone(),
            user_id: self.user_id.clone(),
        })
    }
}

/// Fields merged into the current session by `SessionStore::set`
///
/// Anything left as `None` keeps its previous value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub instance_url: Option<String>,
    pub api_version: Option<String>,
    pub user_id: Option<String>,
}

impl SessionUpdate {
    pub fn token(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..Default::default()
        }
    }

    pub fn refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn instance_url(mut self, instance_url: impl Into<String>) -> Self {
        self.instance_url = Some(instance_url.into());
        self
    }

    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Durable form of the session, stored as plain key/value JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Credentials handed over by a delegated (native) login
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_token: String,
    #[serde(default)]
    pub instance_url: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Token fields as delivered by the OAuth endpoints (fragment or JSON body)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OAuthResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub instance_url: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Identity URL, `https://login.salesforce.com/id/<org id>/<user id>`
    #[serde(default)]
    pub id: Option<String>,
}

impl OAuthResponse {
    /// User id, falling back to the last segment of the identity URL
    pub fn resolved_user_id(&self) -> Option<String> {
        if let Some(user_id) = &self.user_id {
            return Some(user_id.clone());
        }
        self.id
            .as_deref()
            .and_then(|id| id.trim_end_matches('/').rsplit('/').next())
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.to_string())
    }

    /// Whether a usable (non-blank) access token is present
    pub fn has_token(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

impl From<Credentials> for OAuthResponse {
    fn from(credentials: Credentials) -> Self {
        Self {
            access_token: Some(credentials.access_token),
            refresh_token: credentials.refresh_token,
            instance_url: credentials.instance_url,
            user_id: credentials.user_id,
            id: None,
        }
    }
}

impl From<PersistedSession> for OAuthResponse {
    fn from(persisted: PersistedSession) -> Self {
        Self {
            access_token: Some(persisted.access_token),
            refresh_token: persisted.refresh_token,
            instance_url: persisted.instance_url,
            user_id: persisted.user_id,
            id: None,
        }
    }
}

/// Row returned by the current-user lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}
