//! End-to-end tests for the parlamento-etl binary
//!
//! These validate the CLI surface: selection flags, the run report on
//! stdout, and the exit status contract (non-zero when any partition
//! failed).

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_json(server: &MockServer, url_path: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_command_end_to_end() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/l17/partidos.json",
        json!([{"sigla": "PS", "nome": "Partido Socialista"}]),
    )
    .await;
    mount_json(&server, "/l17/circulos.json", json!([{"cpId": 1, "cpDes": "Lisboa"}])).await;

    let dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("parlamento-etl").unwrap();
    cmd.arg("run")
        .arg("-l")
        .arg("L17")
        .arg("--skip")
        .arg("iniciativas,votacoes,atividades,atividades_votacoes,deputados")
        .arg("--base-url")
        .arg(server.uri())
        .arg("--data-dir")
        .arg(dir.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"records\""))
        .stdout(predicate::str::contains("partidos"));

    assert!(dir.path().join("silver/partidos_l17.parquet").exists());
    assert!(dir.path().join("silver/circulos_l17.parquet").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_partition_sets_exit_status() {
    let server = MockServer::start().await;
    mount_json(&server, "/l17/circulos.json", json!([{"cpId": 1, "cpDes": "Lisboa"}])).await;
    Mock::given(method("GET"))
        .and(path("/l17/partidos.json"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("parlamento-etl").unwrap();
    cmd.arg("run")
        .arg("-l")
        .arg("L17")
        .arg("--skip")
        .arg("iniciativas,votacoes,atividades,atividades_votacoes,deputados")
        .arg("--base-url")
        .arg(server.uri())
        .arg("--data-dir")
        .arg(dir.path());

    // One partition failed: exit code 1, but the healthy partition's
    // artifact is still produced.
    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("skipped"));

    assert!(dir.path().join("silver/circulos_l17.parquet").exists());
}

#[test]
fn test_unknown_legislature_rejected() {
    let dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("parlamento-etl").unwrap();
    cmd.arg("run")
        .arg("-l")
        .arg("L99")
        .arg("--data-dir")
        .arg(dir.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown legislature"))
        .stderr(predicate::str::contains("L17"));
}

#[test]
fn test_unknown_entity_rejected_by_clap() {
    let mut cmd = Command::cargo_bin("parlamento-etl").unwrap();
    cmd.arg("run").arg("--skip").arg("plenarias");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown entity type"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_then_transform_subcommands() {
    let server = MockServer::start().await;
    mount_json(&server, "/l16/partidos.json", json!([{"sigla": "PSD"}])).await;

    let dir = TempDir::new().unwrap();

    let mut fetch = Command::cargo_bin("parlamento-etl").unwrap();
    fetch
        .arg("fetch")
        .arg("-l")
        .arg("L16")
        .arg("--skip")
        .arg("iniciativas,votacoes,atividades,atividades_votacoes,deputados,circulos")
        .arg("--base-url")
        .arg(server.uri())
        .arg("--data-dir")
        .arg(dir.path());
    fetch.assert().success();
    assert!(dir.path().join("bronze/partidos_l16.json").exists());
    assert!(!dir.path().join("silver/partidos_l16.parquet").exists());

    // transform works offline from the raw tier.
    let mut transform = Command::cargo_bin("parlamento-etl").unwrap();
    transform
        .arg("transform")
        .arg("-l")
        .arg("L16")
        .arg("--skip")
        .arg("iniciativas,votacoes,atividades,atividades_votacoes,deputados,circulos")
        .arg("--data-dir")
        .arg(dir.path());
    transform.assert().success();
    assert!(dir.path().join("silver/partidos_l16.parquet").exists());
}
