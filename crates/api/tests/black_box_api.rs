use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::response::IntoResponse;
use reqwest::StatusCode;
use reqwest::header::{COOKIE, SET_COOKIE, USER_AGENT};
use serde_json::json;

use warden_api::{AccessContext, DenialResponders, RouteTable, SessionState};
use warden_auth::{AccessControlDocument, FileSource, PermissionSource, Role, SessionHasher, UserRecord};
use warden_core::UserId;
use warden_infra::{AppConfig, InMemorySessionStore, InMemoryUserDirectory};

use slow::{DelayedSource, SlowSource};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(ctx: AccessContext) -> Self {
        let sessions = SessionState::new(Arc::new(InMemorySessionStore::default()), "WARDEN_SESSID");
        Self::serve(warden_api::app::build_app(ctx, sessions)).await
    }

    async fn from_config(yaml: &str) -> Self {
        let config = AppConfig::from_yaml_str(yaml).expect("test config must parse");
        let app = warden_api::app::build_app_from_config(&config)
            .await
            .expect("failed to build app from config");
        Self::serve(app).await
    }

    async fn serve(app: Router) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn user(id: i64, name: &str, roles: &[&'static str]) -> UserRecord {
    UserRecord {
        id: UserId::from(id),
        name: name.to_string(),
        password: bcrypt::hash("123", SessionHasher::MIN_COST).unwrap(),
        token: format!("token-{id}"),
        roles: roles.iter().map(|r| Role::new(*r)).collect(),
    }
}

fn routes() -> RouteTable {
    RouteTable::new("")
        .route("home", "/")
        .route("hello", "/hello")
        .route("admin-panel", "/admin-panel")
        .route("whoami", "/whoami")
        .route("login", "/login")
        .route("logout", "/logout")
}

fn context_with_source(document: serde_json::Value, source: Option<Arc<dyn PermissionSource>>) -> AccessContext {
    let source: Arc<dyn PermissionSource> = match source {
        Some(source) => source,
        None => {
            let document: AccessControlDocument = serde_json::from_value(document).unwrap();
            Arc::new(FileSource::new(document))
        }
    };
    let users = InMemoryUserDirectory::new(vec![user(1, "alice", &["user"]), user(2, "root", &["admin", "user"])]);

    AccessContext::new(
        source,
        Arc::new(users),
        Arc::new(routes()),
        SessionHasher::new(SessionHasher::MIN_COST).unwrap(),
    )
}

fn context(document: serde_json::Value) -> AccessContext {
    context_with_source(document, None)
}

fn standard_policy() -> serde_json::Value {
    json!({
        "permissions": ["admin-panel", "hello"],
        "roles": ["admin", "user"],
        "assignments": { "admin": ["admin-panel", "hello"], "user": ["hello"] },
        "filters": { "user_agent": ["*sqlmap*"] }
    })
}

/// Sign in and return the session cookie pair (`NAME=value`).
async fn login(client: &reqwest::Client, srv: &TestServer, name: &str, agent: &str) -> String {
    login_at(client, srv, "/login", name, agent).await
}

async fn login_at(client: &reqwest::Client, srv: &TestServer, path: &str, name: &str, agent: &str) -> String {
    let res = client
        .post(srv.url(path))
        .header(USER_AGENT, agent)
        .json(&json!({ "name": name, "password": "123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let cookie = res
        .headers()
        .get(SET_COOKIE)
        .expect("login must set the session cookie")
        .to_str()
        .unwrap();
    cookie.split(';').next().unwrap().to_string()
}

async fn get(
    client: &reqwest::Client,
    srv: &TestServer,
    path: &str,
    cookie: Option<&str>,
    agent: &str,
) -> reqwest::Response {
    let mut req = client.get(srv.url(path)).header(USER_AGENT, agent);
    if let Some(cookie) = cookie {
        req = req.header(COOKIE, cookie);
    }
    req.send().await.unwrap()
}

#[tokio::test]
async fn health_bypasses_access_control() {
    let srv = TestServer::spawn(context(json!({ "filters": { "ip": ["127.0.0.1"] } }))).await;

    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn blocked_client_ip_is_unauthorized_before_routing() {
    let ctx = context(json!({ "filters": { "ip": ["10.0.0.*"] } })).with_trust_proxy_headers(true);
    let srv = TestServer::spawn(ctx).await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/"))
        .header("x-forwarded-for", "10.0.0.9")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/"))
        .header("x-forwarded-for", "10.0.1.5")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn proxy_headers_are_ignored_unless_trusted() {
    let srv = TestServer::spawn(context(json!({ "filters": { "ip": ["10.0.0.*"] } }))).await;

    let res = reqwest::Client::new()
        .get(srv.url("/"))
        .header("x-forwarded-for", "10.0.0.9")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn blocked_user_agent_is_unauthorized() {
    let srv = TestServer::spawn(context(standard_policy())).await;
    let client = reqwest::Client::new();

    let res = get(&client, &srv, "/", None, "sqlmap/1.7").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn ungated_route_passes_for_anonymous_caller() {
    let srv = TestServer::spawn(context(json!({ "permissions": ["hello"] }))).await;
    let client = reqwest::Client::new();

    let res = get(&client, &srv, "/admin-panel", None, "Mozilla/5.0").await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = get(&client, &srv, "/whoami", None, "Mozilla/5.0").await;
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["authenticated"], false);
}

#[tokio::test]
async fn gated_route_forbids_anonymous_caller() {
    let srv = TestServer::spawn(context(standard_policy())).await;

    let res = get(&reqwest::Client::new(), &srv, "/admin-panel", None, "Mozilla/5.0").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn role_without_assignment_is_forbidden() {
    let srv = TestServer::spawn(context(standard_policy())).await;
    let client = reqwest::Client::new();
    let cookie = login(&client, &srv, "alice", "Mozilla/5.0").await;

    let res = get(&client, &srv, "/hello", Some(&cookie), "Mozilla/5.0").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "hello, alice");

    let res = get(&client, &srv, "/admin-panel", Some(&cookie), "Mozilla/5.0").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn any_assigned_role_allows() {
    let srv = TestServer::spawn(context(standard_policy())).await;
    let client = reqwest::Client::new();
    let cookie = login(&client, &srv, "root", "Mozilla/5.0").await;

    let res = get(&client, &srv, "/admin-panel", Some(&cookie), "Mozilla/5.0").await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = get(&client, &srv, "/whoami", Some(&cookie), "Mozilla/5.0").await;
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["id"], "2");
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "admin"));
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let srv = TestServer::spawn(context(standard_policy())).await;

    let res = reqwest::Client::new()
        .post(srv.url("/login"))
        .json(&json!({ "name": "root", "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().get(SET_COOKIE).is_none());
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn session_from_another_user_agent_is_cleared() {
    let srv = TestServer::spawn(context(standard_policy())).await;
    let client = reqwest::Client::new();
    let cookie = login(&client, &srv, "root", "agent-a").await;

    let res = get(&client, &srv, "/admin-panel", Some(&cookie), "agent-b").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // The mismatch unbinds the session, so the original agent is signed out too.
    let res = get(&client, &srv, "/admin-panel", Some(&cookie), "agent-a").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn logout_signs_the_session_out() {
    let srv = TestServer::spawn(context(standard_policy())).await;
    let client = reqwest::Client::new();
    let cookie = login(&client, &srv, "root", "Mozilla/5.0").await;

    let res = client
        .post(srv.url("/logout"))
        .header(COOKIE, &cookie)
        .header(USER_AGENT, "Mozilla/5.0")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = get(&client, &srv, "/admin-panel", Some(&cookie), "Mozilla/5.0").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn request_in_flight_during_logout_does_not_restore_the_session() {
    let source = Arc::new(DelayedSource::new(standard_policy()));
    let srv = TestServer::spawn(context_with_source(json!({}), Some(source.clone()))).await;
    let client = reqwest::Client::new();
    let cookie = login(&client, &srv, "root", "Mozilla/5.0").await;

    // The next decision stalls after the session has already been loaded.
    source.delay_next(Duration::from_millis(600));
    let in_flight = {
        let (client, url, cookie) = (client.clone(), srv.url("/whoami"), cookie.clone());
        tokio::spawn(async move {
            client
                .get(url)
                .header(COOKIE, cookie)
                .header(USER_AGENT, "Mozilla/5.0")
                .send()
                .await
                .unwrap()
                .status()
        })
    };
    tokio::time::sleep(Duration::from_millis(150)).await;

    let res = client
        .post(srv.url("/logout"))
        .header(COOKIE, &cookie)
        .header(USER_AGENT, "Mozilla/5.0")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(in_flight.await.unwrap(), StatusCode::OK);

    let res = get(&client, &srv, "/admin-panel", Some(&cookie), "Mozilla/5.0").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

fn config_with_base_path(base_path: &str) -> String {
    let password = bcrypt::hash("123", SessionHasher::MIN_COST).unwrap();
    format!(
        r#"
server:
  base_path: "{base_path}"
access_control:
  source: {{ driver: file, location: access_control }}
  users: {{ driver: file, location: users }}
  bcrypt_cost: 4
routes:
  - {{ permission: home, path: "/" }}
  - {{ permission: hello, path: "/hello" }}
  - {{ permission: admin-panel, path: "/admin-panel" }}
  - {{ permission: login, path: "/login" }}
sections:
  access_control:
    permissions: [admin-panel, home]
    assignments:
      admin: [admin-panel, home]
  users:
    - {{ id: 2, name: root, password: "{password}", token: t, roles: [admin] }}
"#
    )
}

#[tokio::test]
async fn configured_base_path_mounts_and_gates_routes_together() {
    let srv = TestServer::from_config(&config_with_base_path("/app")).await;
    let client = reqwest::Client::new();

    let res = get(&client, &srv, "/app/admin-panel", None, "Mozilla/5.0").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = get(&client, &srv, "/app", None, "Mozilla/5.0").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Handlers are not reachable outside the base path.
    let res = get(&client, &srv, "/admin-panel", None, "Mozilla/5.0").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = get(&client, &srv, "/health", None, "Mozilla/5.0").await;
    assert_eq!(res.status(), StatusCode::OK);

    let cookie = login_at(&client, &srv, "/app/login", "root", "Mozilla/5.0").await;
    let res = get(&client, &srv, "/app/admin-panel", Some(&cookie), "Mozilla/5.0").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn config_built_app_without_base_path_serves_at_root() {
    let srv = TestServer::from_config(&config_with_base_path("")).await;

    let res = get(&reqwest::Client::new(), &srv, "/admin-panel", None, "Mozilla/5.0").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn denial_responders_override_default_bodies() {
    let responders = DenialResponders::default()
        .on_forbidden(|| (axum::http::StatusCode::FORBIDDEN, "members only").into_response());
    let srv = TestServer::spawn(context(standard_policy()).with_responders(responders)).await;

    let res = get(&reqwest::Client::new(), &srv, "/admin-panel", None, "Mozilla/5.0").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(res.text().await.unwrap(), "members only");
}

#[tokio::test]
async fn unknown_filter_kind_is_a_server_error() {
    let srv = TestServer::spawn(context(json!({ "filters": { "geo": ["NZ"] } }))).await;

    let res = get(&reqwest::Client::new(), &srv, "/", None, "Mozilla/5.0").await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "configuration_error");
}

#[tokio::test]
async fn slow_source_times_out_with_503() {
    let ctx = context_with_source(json!({}), Some(Arc::new(SlowSource(Duration::from_secs(5)))))
        .with_decision_timeout(Duration::from_millis(50));
    let srv = TestServer::spawn(ctx).await;

    let res = get(&reqwest::Client::new(), &srv, "/", None, "Mozilla/5.0").await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

mod slow {
    use std::sync::Mutex;
    use std::time::Duration;

    use warden_auth::{
        AccessControlDocument, Assignments, FileSource, FilterRules, Permission, PermissionSource, Role,
    };
    use warden_core::AccessResult;

    /// File-backed source whose next filter read can be held back once.
    pub struct DelayedSource {
        inner: FileSource,
        next_delay: Mutex<Option<Duration>>,
    }

    impl DelayedSource {
        pub fn new(document: serde_json::Value) -> Self {
            let document: AccessControlDocument = serde_json::from_value(document).unwrap();
            Self {
                inner: FileSource::new(document),
                next_delay: Mutex::new(None),
            }
        }

        pub fn delay_next(&self, delay: Duration) {
            *self.next_delay.lock().unwrap() = Some(delay);
        }
    }

    #[async_trait::async_trait]
    impl PermissionSource for DelayedSource {
        fn driver(&self) -> &'static str {
            "delayed"
        }

        async fn filters(&self) -> AccessResult<FilterRules> {
            let delay = self.next_delay.lock().unwrap().take();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.inner.filters().await
        }

        async fn permissions(&self) -> AccessResult<Vec<Permission>> {
            self.inner.permissions().await
        }

        async fn assignments(&self) -> AccessResult<Assignments> {
            self.inner.assignments().await
        }

        async fn roles(&self) -> AccessResult<Vec<Role>> {
            self.inner.roles().await
        }
    }

    /// Permission source whose filter read never finishes in time.
    pub struct SlowSource(pub Duration);

    #[async_trait::async_trait]
    impl PermissionSource for SlowSource {
        fn driver(&self) -> &'static str {
            "slow"
        }

        async fn filters(&self) -> AccessResult<FilterRules> {
            tokio::time::sleep(self.0).await;
            Ok(FilterRules::new())
        }

        async fn permissions(&self) -> AccessResult<Vec<Permission>> {
            Ok(Vec::new())
        }

        async fn assignments(&self) -> AccessResult<Assignments> {
            Ok(Assignments::new())
        }

        async fn roles(&self) -> AccessResult<Vec<Role>> {
            Ok(Vec::new())
        }
    }
}
