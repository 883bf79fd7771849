use axum::{http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use std::net::TcpListener;
use std::path::Path;
use std::process::{Command, Output};

const PC_CSV: &str = "reg_no,details,semester,cat,comments\nB001,Illness,1,2,\n";

async fn create_personal_circumstance(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut record = body;
    record["id"] = json!(1);
    (StatusCode::CREATED, Json(record))
}

fn spawn_service() -> String {
    let app = Router::new().route("/api/personal-circumstances", post(create_personal_circumstance));
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(app.into_make_service());
    tokio::spawn(server);
    format!("http://{}/api", addr)
}

fn uploader(dir: &Path, api_url: &str, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mark_uploader"))
        .args(args)
        .current_dir(dir)
        .env("MARK_API_URL", api_url)
        .env_remove("MARK_API_TOKEN")
        .env_remove("MARK_UPLOADER_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[tokio::test]
async fn test_json_report_is_the_only_stdout() {
    let base = spawn_service();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pcs.csv"), PC_CSV).unwrap();

    let path = dir.path().to_path_buf();
    let output = tokio::task::spawn_blocking(move || {
        uploader(
            &path,
            &base,
            &["upload", "--kind", "personal_circumstances", "--file", "pcs.csv", "--token", "t", "--json"],
        )
    })
    .await
    .unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    assert!(output.status.success(), "{stderr}");
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["kind"], "personal_circumstances");
    assert_eq!(report["created"], 1);
    assert!(stderr.contains("Uploaded 1 personal circumstances successfully"));
}

#[test]
fn test_missing_token_with_json_prints_nothing_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pcs.csv"), PC_CSV).unwrap();

    let output = uploader(
        dir.path(),
        "http://127.0.0.1:9/api",
        &["upload", "--kind", "personal_circumstances", "--file", "pcs.csv", "--json"],
    );

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No API credential"));
}
