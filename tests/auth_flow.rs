mod common;

use common::*;
use serde_json::json;
use std::sync::{Arc, Mutex};

use shinchoku_cli::api::auth::instance_root;
use shinchoku_cli::api::constants::SESSION_STORAGE_KEY;
use shinchoku_cli::api::{
    AuthError, AuthFlow, AuthHint, AuthOutcome, AuthState, Credentials, HttpTransport,
    RequestDescriptor, SessionStore,
};
use shinchoku_cli::config::{ClientConfig, KeyValueStorage, MemoryStorage};

fn credentials(access_token: &str) -> Credentials {
    Credentials {
        access_token: access_token.to_string(),
        instance_url: Some(INSTANCE_URL.to_string()),
        refresh_token: Some("R1".to_string()),
        user_id: Some("005D0000001Az1P".to_string()),
    }
}

fn redirect(callback_url: Option<&str>) -> AuthHint {
    AuthHint::Redirect {
        redirect_uri: "http://localhost:8888/callback".to_string(),
        callback_url: callback_url.map(|u| u.to_string()),
    }
}

#[tokio::test]
async fn test_credentials_establish_session() {
    let transport = FakeTransport::scripted(vec![ok(json!({}))]);
    let client = client(config(), transport.clone());

    let outcome = client.auth().begin(AuthHint::Credentials(credentials("T1"))).await.unwrap();
    let AuthOutcome::Authenticated(session) = outcome else {
        panic!("expected an authenticated outcome");
    };

    assert_eq!(session.access_token.as_deref(), Some("T1"));
    assert_eq!(session.refresh_token.as_deref(), Some("R1"));
    assert_eq!(session.instance_url.as_deref(), Some(INSTANCE_URL));
    assert_eq!(session.user_id.as_deref(), Some("005D0000001Az1P"));
    assert_eq!(client.auth().state().await, AuthState::Authenticated);
    assert!(client.session().is_authenticated().await);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_blank_access_token_is_no_token() {
    let transport = FakeTransport::scripted(vec![ok(json!({}))]);
    let client = client(config(), transport.clone());

    for blank in ["", "   "] {
        let error = client
            .auth()
            .begin(AuthHint::Credentials(credentials(blank)))
            .await
            .unwrap_err();
        assert_eq!(error, AuthError::NoToken);
        assert_eq!(client.auth().state().await, AuthState::Failed);
        assert!(!client.session().is_authenticated().await);
    }

    let error = client.send(RequestDescriptor::get("/services/data/")).await.unwrap_err();
    assert!(error.needs_authentication());
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_missing_instance_url_is_derived_from_host() {
    let mut config = config();
    config.host = Some("abc.my.salesforce.com".to_string());
    let client = client(config, FakeTransport::scripted(vec![ok(json!({}))]));

    let mut credentials = credentials("T1");
    credentials.instance_url = None;
    client.auth().begin(AuthHint::Credentials(credentials)).await.unwrap();

    let session = client.session().get().await;
    assert_eq!(session.instance_url.as_deref(), Some("https://abc.my.salesforce.com"));
}

#[test]
fn test_instance_root_shapes() {
    assert_eq!(instance_root("na1.salesforce.com").as_deref(), Some("na1"));
    assert_eq!(instance_root("abc.my.salesforce.com").as_deref(), Some("abc.my"));
    assert_eq!(instance_root("abc.na1.visual.force.com").as_deref(), Some("na1"));
}

#[tokio::test]
async fn test_redirect_without_token_asks_for_authorize_url() {
    let transport = FakeTransport::scripted(vec![ok(json!({}))]);
    let client = client(config(), transport.clone());

    let outcome = client.auth().begin(redirect(None)).await.unwrap();
    let AuthOutcome::Redirect(url) = outcome else {
        panic!("expected a redirect");
    };

    assert_eq!(
        url,
        "https://login.salesforce.com/services/oauth2/authorize?display=touch&response_type=token\
         &client_id=3MVG9test&redirect_uri=http%3A%2F%2Flocalhost%3A8888%2Fcallback"
    );
    assert!(!client.session().is_authenticated().await);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_redirect_callback_fragment_establishes_session() {
    let client = client(config(), FakeTransport::scripted(vec![ok(json!({}))]));
    let callback = "http://localhost:8888/callback#access_token=00D%21T1&refresh_token=R1\
                    &instance_url=https%3A%2F%2Fna1.salesforce.com\
                    &id=https%3A%2F%2Flogin.salesforce.com%2Fid%2F00D%2F005xx&token_type=Bearer";

    let outcome = client.auth().begin(redirect(Some(callback))).await.unwrap();
    assert!(matches!(outcome, AuthOutcome::Authenticated(_)));

    let session = client.session().get().await;
    assert_eq!(session.access_token.as_deref(), Some("00D!T1"));
    assert_eq!(session.refresh_token.as_deref(), Some("R1"));
    assert_eq!(session.instance_url.as_deref(), Some(INSTANCE_URL));
    assert_eq!(session.user_id.as_deref(), Some("005xx"));
}

#[tokio::test]
async fn test_embedded_uses_host_session_id() {
    let mut config = config();
    config.session_id = Some("00Dsession".to_string());
    config.host = Some("na14.salesforce.com".to_string());
    let client = client(config, FakeTransport::scripted(vec![ok(json!({}))]));

    client.auth().begin(AuthHint::Embedded).await.unwrap();

    let session = client.session().get().await;
    assert_eq!(session.access_token.as_deref(), Some("00Dsession"));
    assert_eq!(session.instance_url.as_deref(), Some("https://na14.salesforce.com"));
    assert_eq!(session.refresh_token, None);
}

#[tokio::test]
async fn test_embedded_without_session_id_fails() {
    let client = client(config(), FakeTransport::scripted(vec![ok(json!({}))]));

    let error = client.auth().begin(AuthHint::Embedded).await.unwrap_err();
    assert_eq!(error, AuthError::NoSessionId);
    assert_eq!(client.auth().state().await, AuthState::Failed);
}

#[tokio::test]
async fn test_persisted_session_is_picked_up() {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .put(
            SESSION_STORAGE_KEY,
            &json!({
                "access_token": "T-saved",
                "instance_url": INSTANCE_URL,
                "refresh_token": "R-saved",
                "user_id": "005saved"
            })
            .to_string(),
        )
        .await
        .unwrap();

    let mut config = config();
    config.save_token_locally = true;
    let transport = FakeTransport::scripted(vec![ok(json!({}))]);
    let client = client_with_storage(config, transport.clone(), storage.clone());

    let outcome = client.auth().begin(redirect(None)).await.unwrap();
    assert!(matches!(outcome, AuthOutcome::Authenticated(_)));

    let session = client.session().get().await;
    assert_eq!(session.access_token.as_deref(), Some("T-saved"));
    assert_eq!(session.refresh_token.as_deref(), Some("R-saved"));
    assert_eq!(session.user_id.as_deref(), Some("005saved"));

    client.send(RequestDescriptor::get("/services/data/")).await.unwrap();
    assert_eq!(authorization(&transport.requests()[0]).as_deref(), Some("OAuth T-saved"));
}

#[tokio::test]
async fn test_persisted_session_ignored_when_persistence_off() {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .put(SESSION_STORAGE_KEY, &json!({"access_token": "T-saved"}).to_string())
        .await
        .unwrap();
    let transport = FakeTransport::scripted(vec![ok(json!({}))]);
    let client = client_with_storage(config(), transport, storage.clone());

    let outcome = client.auth().begin(redirect(None)).await.unwrap();
    assert!(matches!(outcome, AuthOutcome::Redirect(_)));

    // Signing in without persistence drops the stale durable copy
    client.auth().begin(AuthHint::Credentials(credentials("T1"))).await.unwrap();
    assert_eq!(storage.get(SESSION_STORAGE_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_completion_hook_reports_success_and_failure() {
    let config = Arc::new(config());
    let transport: Arc<dyn HttpTransport> = FakeTransport::scripted(vec![ok(json!({}))]);
    let store = SessionStore::new(&config.api_version, false);
    let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let flow = AuthFlow::new(config, store, transport).on_complete(move |session| {
        sink.lock()
            .unwrap()
            .push(session.and_then(|s| s.access_token.clone()));
    });

    flow.begin(AuthHint::Credentials(credentials("T1"))).await.unwrap();
    let error = flow.begin(AuthHint::Embedded).await.unwrap_err();

    assert_eq!(error, AuthError::NoSessionId);
    assert_eq!(flow.state().await, AuthState::Failed);
    assert_eq!(*seen.lock().unwrap(), vec![Some("T1".to_string()), None]);
}

#[tokio::test]
async fn test_logout_clears_session_and_storage() {
    let storage = Arc::new(MemoryStorage::new());
    let mut config = config();
    config.save_token_locally = true;
    let transport = FakeTransport::scripted(vec![ok(json!({}))]);
    let client = client_with_storage(config, transport, storage.clone());

    client.auth().begin(AuthHint::Credentials(credentials("T1"))).await.unwrap();
    assert!(storage.get(SESSION_STORAGE_KEY).await.unwrap().is_some());

    client.logout().await.unwrap();

    assert!(!client.session().is_authenticated().await);
    assert_eq!(client.auth().state().await, AuthState::Unauthenticated);
    assert_eq!(storage.get(SESSION_STORAGE_KEY).await.unwrap(), None);
    let error = client.send(RequestDescriptor::get("/services/data/")).await.unwrap_err();
    assert!(error.needs_authentication());
}

#[tokio::test]
async fn test_refresh_replaces_only_token_and_instance() {
    let transport = FakeTransport::new(|request| {
        assert!(is_token_request(request));
        Ok(shinchoku_cli::api::HttpResponse::json(
            200,
            &json!({"access_token": "T2", "instance_url": "https://na2.salesforce.com"}),
        ))
    });
    let client = client(config(), transport.clone());
    client.auth().begin(AuthHint::Credentials(credentials("T1"))).await.unwrap();

    let session = client.auth().refresh().await.unwrap();

    assert_eq!(session.access_token.as_deref(), Some("T2"));
    assert_eq!(session.instance_url.as_deref(), Some("https://na2.salesforce.com"));
    assert_eq!(session.refresh_token.as_deref(), Some("R1"));
    assert_eq!(session.user_id.as_deref(), Some("005D0000001Az1P"));
    assert_eq!(transport.token_requests().len(), 1);
}

#[tokio::test]
async fn test_refresh_without_refresh_token() {
    let transport = FakeTransport::scripted(vec![token_response("T2")]);
    let client = client(config(), transport.clone());
    sign_in(&client, "T1", None).await;

    let error = client.auth().refresh().await.unwrap_err();
    assert_eq!(error, AuthError::NoRefreshToken);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_config_toml_drives_the_client() {
    let config = ClientConfig::from_toml_str(
        r#"
        client_id = "3MVG9toml"
        proxy_url = "https://proxy.example.com/"
        save_token_locally = false
        "#,
    )
    .unwrap();
    let transport = FakeTransport::scripted(vec![ok(json!({}))]);
    let client = client(config, transport.clone());
    sign_in(&client, "T1", None).await;

    client.send(RequestDescriptor::get("/services/data/")).await.unwrap();

    let sent = transport.requests();

    let request = &sent[0];
    assert_eq!(request.url, "https://proxy.example.com/");
    assert_eq!(client.config().client_id, "3MVG9toml");
}

#[tokio::test]
async fn test_credentials_fields_are_kept_unchanged() {
    let client = client(config(), FakeTransport::scripted(vec![ok(json!({}))]));
    let credentials = Credentials {
        access_token: "abc".to_string(),
        instance_url: Some("https://x.example.com".to_string()),
        refresh_token: Some("r1".to_string()),
        user_id: None,
    };

    client.auth().begin(AuthHint::Credentials(credentials)).await.unwrap();

    assert_eq!(client.auth().state().await, AuthState::Authenticated);
    let session = client.session().get().await;
    assert_eq!(session.access_token.as_deref(), Some("abc"));
    assert_eq!(session.instance_url.as_deref(), Some("https://x.example.com"));
    assert_eq!(session.refresh_token.as_deref(), Some("r1"));
}
