//! API Constants and Configuration for the Salesforce REST API

/// Default REST API version when none has been negotiated
pub const DEFAULT_API_VERSION: &str = "v29.0";

/// Default login root for the OAuth endpoints
pub const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";

/// Base path of the data API
pub const DATA_PATH: &str = "/services/data";

/// Base path of custom Apex REST resources
pub const APEX_REST_PATH: &str = "/services/apexrest";

/// OAuth token endpoint (relative to the login root)
pub const TOKEN_PATH: &str = "/services/oauth2/token";

/// OAuth authorize endpoint (relative to the login root)
pub const AUTHORIZE_PATH: &str = "/services/oauth2/authorize";

/// Key under which the session record is kept in durable storage
pub const SESSION_STORAGE_KEY: &str = "salesforceToken";

/// Product token prefixed to the API version in the user-agent header
pub const USER_AGENT_PRODUCT: &str = "shinchoku-cli";

/// Host label that marks a My Domain (custom domain) login host
pub const CUSTOM_DOMAIN_MARKER: &str = "my";

/// Standard headers for Salesforce requests
pub mod headers {
    /// Content type for JSON requests
    pub const CONTENT_TYPE_JSON: &str = "application/json";

    /// Authorization header when calling the API directly
    pub const AUTHORIZATION: &str = "Authorization";

    /// Authorization header when calling through a proxy
    pub const PROXY_AUTHORIZATION: &str = "X-Authorization";

    /// Header carrying the real target URL when routed through a proxy
    pub const PROXY_ENDPOINT: &str = "SalesforceProxy-Endpoint";

    /// Client identification header (browsers refuse to let scripts set User-Agent)
    pub const USER_AGENT: &str = "X-User-Agent";

    /// Per-request correlation id
    pub const X_CORRELATION_ID: &str = "X-Correlation-Id";

    /// Token scheme used in the authorization header value
    pub const TOKEN_SCHEME: &str = "OAuth";
}

/// Query parameter that asks the API to treat a POST as PATCH
pub const METHOD_OVERRIDE_PATCH: &str = "_HttpMethod=PATCH";

/// Versioned data API root, e.g. `/services/data/v29.0`
pub fn api_path(api_version: &str) -> String {
    format!("{}/{}", DATA_PATH, api_version)
}

/// Collection endpoint, e.g. `/services/data/v29.0/sobjects/Account/`
pub fn sobject_endpoint(api_version: &str, collection: &str) -> String {
    format!("{}/sobjects/{}/", api_path(api_version), collection)
}

/// Record endpoint, e.g. `/services/data/v29.0/sobjects/Account/001...`
pub fn record_endpoint(api_version: &str, collection: &str, id: &str) -> String {
    format!("{}/sobjects/{}/{}", api_path(api_version), collection, id)
}

/// Record endpoint with the PATCH method override appended
pub fn patch_endpoint(api_version: &str, collection: &str, id: &str) -> String {
    format!("{}?{}", record_endpoint(api_version, collection, id), METHOD_OVERRIDE_PATCH)
}

/// Query endpoint carrying an already-built statement
pub fn query_endpoint(api_version: &str, statement: &str) -> String {
    format!("{}/query?q={}", api_path(api_version), urlencoding::encode(statement))
}

/// Search endpoint carrying a SOSL statement
pub fn search_endpoint(api_version: &str, statement: &str) -> String {
    format!("{}/search?q={}", api_path(api_version), urlencoding::encode(statement))
}

/// Join a root URL and a path without doubling or dropping the slash between them
pub fn join_url(root: &str, path: &str) -> String {
    let root = root.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", root, path)
    } else {
        format!("{}/{}", root, path)
    }
}
