use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::Path,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use medisync_auth::{
    auth::{Role, SystemClock, TokenCodec},
    cache::MemorySessionCache,
    config::VerifyMode,
    session::{LoginAttempt, SessionManager},
    upstream::{
        BcryptOracle, CredentialOracle, DirectoryError, HttpCredentialOracle,
        HttpIdentityDirectory, IdentityDirectory, NewPatient, OracleError, http_client,
    },
};

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn read_patient(Path(username): Path<String>) -> Result<Json<Value>, StatusCode> {
    match username.as_str() {
        "alice" => Ok(Json(json!({
            "id": "7",
            "username": "alice",
            "passwordHash": "H",
            "email": "alice@example.com"
        }))),
        "broken" => Ok(Json(json!({ "id": "x", "username": "broken", "passwordHash": "H" }))),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn read_doctor(Path(username): Path<String>) -> Json<Value> {
    Json(json!({ "id": 3, "username": username, "passwordHash": "D" }))
}

async fn create_patient(Json(patient): Json<Value>) -> StatusCode {
    if patient["passwordHash"] == "H" {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    }
}

async fn oracle_verify(Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
    if body["password"] == "pw" && body["hash"] == "H" {
        Ok(Json(json!({ "valid": true })))
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

async fn oracle_hash(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "hash": format!("h({})", body["password"].as_str().unwrap_or_default()) }))
}

async fn slow() -> StatusCode {
    tokio::time::sleep(Duration::from_secs(5)).await;
    StatusCode::OK
}

/// Answers every connection with 200 headers and half a JSON body, then hangs.
async fn serve_stalled_body() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\n\
                          Content-Type: application/json\r\n\
                          Content-Length: 200\r\n\r\n\
                          {\"id\": 7,",
                    )
                    .await;
                let _ = socket.flush().await;
                tokio::time::sleep(Duration::from_secs(5)).await;
            });
        }
    });
    format!("http://{addr}")
}

fn directory_stub() -> Router {
    Router::new()
        .route("/read-patient/patients/username/{username}", get(read_patient))
        .route("/read-doctor/doctors/username/{username}", get(read_doctor))
        .route("/create-patient/patients", post(create_patient))
}

fn patient(hash: &str) -> NewPatient {
    NewPatient {
        first_name: "Ana".into(),
        last_name: "Ruiz".into(),
        birth_date: String::new(),
        gender: String::new(),
        address: String::new(),
        phone: String::new(),
        email: "ana@example.com".into(),
        username: "ana".into(),
        password_hash: hash.into(),
    }
}

#[tokio::test]
async fn directory_lookup_by_role() {
    let base = serve(directory_stub()).await;
    let client = http_client(Duration::from_secs(2)).unwrap();
    let directory = HttpIdentityDirectory::new(client, &base, &base).unwrap();

    let alice = directory
        .find_by_username(Role::Patient, "alice")
        .await
        .unwrap();
    assert_eq!(alice.id, 7);
    assert_eq!(alice.password_hash, "H");

    let doctor = directory
        .find_by_username(Role::Doctor, "house")
        .await
        .unwrap();
    assert_eq!(doctor.id, 3);

    assert!(matches!(
        directory.find_by_username(Role::Patient, "nobody").await,
        Err(DirectoryError::NotFound)
    ));
    assert!(matches!(
        directory.find_by_username(Role::Patient, "broken").await,
        Err(DirectoryError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn directory_creates_patients() {
    let base = serve(directory_stub()).await;
    let directory =
        HttpIdentityDirectory::new(http_client(Duration::from_secs(2)).unwrap(), &base, &base)
            .unwrap();

    directory.create_patient(&patient("H")).await.unwrap();
    assert!(matches!(
        directory.create_patient(&patient("other")).await,
        Err(DirectoryError::Rejected(400))
    ));
}

#[tokio::test]
async fn unreachable_directory_is_unavailable() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let directory =
        HttpIdentityDirectory::new(http_client(Duration::from_secs(2)).unwrap(), &base, &base)
            .unwrap();
    assert!(matches!(
        directory.find_by_username(Role::Patient, "alice").await,
        Err(DirectoryError::Unavailable(_))
    ));
}

#[tokio::test]
async fn oracle_verify_and_hash() {
    let base = serve(
        Router::new()
            .route("/verify", post(oracle_verify))
            .route("/hash", post(oracle_hash)),
    )
    .await;
    let oracle =
        HttpCredentialOracle::new(http_client(Duration::from_secs(2)).unwrap(), &base).unwrap();

    assert!(oracle.verify("pw", "H").await.unwrap());
    assert!(!oracle.verify("wrong", "H").await.unwrap());
    assert_eq!(oracle.hash("pw").await.unwrap(), "h(pw)");
}

#[tokio::test]
async fn slow_oracle_times_out() {
    let base = serve(Router::new().route("/verify", post(slow))).await;
    let oracle =
        HttpCredentialOracle::new(http_client(Duration::from_millis(200)).unwrap(), &base)
            .unwrap();

    assert!(matches!(
        oracle.verify("pw", "H").await,
        Err(OracleError::Unavailable(_))
    ));
}

#[tokio::test]
async fn stalled_directory_body_is_unavailable() {
    let base = serve_stalled_body().await;
    let client = http_client(Duration::from_millis(300)).unwrap();
    let directory = HttpIdentityDirectory::new(client, &base, &base).unwrap();

    assert!(matches!(
        directory.find_by_username(Role::Patient, "alice").await,
        Err(DirectoryError::Unavailable(_))
    ));
}

#[tokio::test]
async fn stalled_oracle_body_is_unavailable() {
    let base = serve_stalled_body().await;
    let oracle =
        HttpCredentialOracle::new(http_client(Duration::from_millis(300)).unwrap(), &base)
            .unwrap();

    assert!(matches!(
        oracle.verify("pw", "H").await,
        Err(OracleError::Unavailable(_))
    ));
    assert!(matches!(
        oracle.hash("pw").await,
        Err(OracleError::Unavailable(_))
    ));
}

#[tokio::test]
async fn stalled_directory_is_an_outage_not_a_server_error() {
    let base = serve_stalled_body().await;
    let client = http_client(Duration::from_millis(300)).unwrap();
    let directory = HttpIdentityDirectory::new(client, &base, &base).unwrap();
    let manager = SessionManager::new(
        Arc::new(directory),
        Arc::new(BcryptOracle::new(4)),
        TokenCodec::new(b"test-secret", Arc::new(SystemClock)),
        Arc::new(MemorySessionCache::new()),
        VerifyMode::Signature,
    );

    let err = manager
        .login(&LoginAttempt {
            username: "alice".into(),
            password: "pw".into(),
            is_doctor: false,
        })
        .await
        .unwrap_err();
    assert!(err.is_upstream_outage());
    assert!(!err.is_internal());
}
