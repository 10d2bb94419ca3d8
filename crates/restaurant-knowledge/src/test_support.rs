//! In-process stand-ins for the remote services, used by unit tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::contents::{ContentsClient, FileLocation};

/// Token the mock contents API accepts.
pub(crate) const MOCK_TOKEN: &str = "test-token";

/// Serve `router` on an ephemeral local port.
pub(crate) async fn spawn_router(router: Router) -> SocketAddr {
    crate::logging::init_test_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Headers seen on the most recent request.
#[derive(Debug, Clone)]
pub(crate) struct SeenHeaders {
    pub accept: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Default)]
struct MockRepo {
    text: Option<String>,
    sha: Option<String>,
    writes: u64,
    last_put: Option<Value>,
    last_headers: Option<SeenHeaders>,
    forced_status: Option<StatusCode>,
}

type Shared = Arc<Mutex<MockRepo>>;

/// A single-file repository speaking the contents API protocol.
#[derive(Debug, Clone)]
pub(crate) struct MockContentsApi {
    addr: SocketAddr,
    repo: Shared,
}

impl MockContentsApi {
    pub(crate) async fn start() -> Self {
        let repo: Shared = Arc::default();
        let router = Router::new()
            .route(
                "/repos/{owner}/{repo}/contents/{*path}",
                get(read_file).put(write_file),
            )
            .with_state(repo.clone());
        let addr = spawn_router(router).await;
        Self { addr, repo }
    }

    pub(crate) fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub(crate) fn location(&self) -> FileLocation {
        FileLocation::new("owner", "repo", "data/restaurants.json")
    }

    pub(crate) fn client(&self) -> ContentsClient {
        ContentsClient::new(self.base_url(), MOCK_TOKEN, None).unwrap()
    }

    /// Replace the stored file as if someone else had committed it.
    pub(crate) fn seed(&self, text: &str) {
        let mut repo = self.repo.lock().unwrap();
        repo.writes += 1;
        repo.text = Some(text.to_string());
        repo.sha = Some(format!("sha-{}", repo.writes));
    }

    /// Answer every request with `status` from now on.
    pub(crate) fn fail_with(&self, status: StatusCode) {
        self.repo.lock().unwrap().forced_status = Some(status);
    }

    pub(crate) fn text(&self) -> Option<String> {
        self.repo.lock().unwrap().text.clone()
    }

    pub(crate) fn last_put_body(&self) -> Option<Value> {
        self.repo.lock().unwrap().last_put.clone()
    }

    pub(crate) fn last_message(&self) -> Option<String> {
        self.last_put_body()
            .and_then(|body| body["message"].as_str().map(str::to_string))
    }

    pub(crate) fn last_headers(&self) -> Option<SeenHeaders> {
        self.repo.lock().unwrap().last_headers.clone()
    }
}

fn header_text(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Record headers and run the auth/forced-failure checks shared by both verbs.
fn precheck(repo: &mut MockRepo, headers: &HeaderMap) -> Option<Response> {
    repo.last_headers = Some(SeenHeaders {
        accept: header_text(headers, header::ACCEPT),
        user_agent: header_text(headers, header::USER_AGENT),
    });
    let expected = format!("token {MOCK_TOKEN}");
    if header_text(headers, header::AUTHORIZATION).as_deref() != Some(expected.as_str()) {
        return Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Bad credentials" })),
            )
                .into_response(),
        );
    }
    repo.forced_status.map(|status| {
        (status, Json(json!({ "message": "forced failure" }))).into_response()
    })
}

async fn read_file(State(repo): State<Shared>, headers: HeaderMap) -> Response {
    let mut repo = repo.lock().unwrap();
    if let Some(rejection) = precheck(&mut repo, &headers) {
        return rejection;
    }
    match (&repo.text, &repo.sha) {
        (Some(text), Some(sha)) => {
            // The real API wraps base64 at 60 columns.
            let encoded = BASE64.encode(text.as_bytes());
            let wrapped = encoded
                .as_bytes()
                .chunks(60)
                .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                .collect::<Vec<_>>()
                .join("\n");
            Json(json!({ "content": wrapped, "encoding": "base64", "sha": sha })).into_response()
        }
        _ => (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response(),
    }
}

async fn write_file(
    State(repo): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut repo = repo.lock().unwrap();
    if let Some(rejection) = precheck(&mut repo, &headers) {
        return rejection;
    }
    repo.last_put = Some(body.clone());

    let given = body.get("sha").and_then(Value::as_str);
    match (repo.sha.as_deref(), given) {
        (Some(current), Some(given)) if current != given => {
            return (
                StatusCode::CONFLICT,
                Json(json!({ "message": format!("is at {current} but expected {given}") })),
            )
                .into_response();
        }
        (Some(_), None) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "message": "Invalid request.\n\n\"sha\" wasn't supplied." })),
            )
                .into_response();
        }
        (None, Some(_)) => {
            return (StatusCode::CONFLICT, Json(json!({ "message": "file does not exist" })))
                .into_response();
        }
        _ => {}
    }

    let encoded = body["content"].as_str().unwrap_or_default();
    let text = String::from_utf8(BASE64.decode(encoded).unwrap()).unwrap();
    let created = repo.text.is_none();
    repo.writes += 1;
    repo.text = Some(text);
    let sha = format!("sha-{}", repo.writes);
    repo.sha = Some(sha.clone());

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (
        status,
        Json(json!({
            "content": { "path": "data/restaurants.json", "sha": sha },
            "commit": { "message": body["message"] }
        })),
    )
        .into_response()
}
