use std::fs;
use std::path::PathBuf;

use httptest::{matchers::*, responders::*, Expectation, Server};
use serde_json::{json, Value};
use tempfile::TempDir;

use dbrel_core::{run_sync, Config, ReleaseRequest, SyncRequest, UserError};
use dbrel_domain::Manifest;

fn digest() -> String {
    "4e".repeat(32)
}

fn test_config(server: &Server) -> Config {
    let base = server.url_str("/").trim_end_matches('/').to_string();
    Config {
        token: None,
        api_base: base.clone(),
        download_base: base,
        push_attempts: 3,
    }
}

fn redis_release(server: &Server) -> Value {
    let base = server.url_str("/").trim_end_matches('/').to_string();
    json!({
        "tag_name": "redis-8.4.0",
        "published_at": "2026-05-01T08:00:00Z",
        "assets": [
            {
                "name": "redis-8.4.0-linux-x64.tar.gz",
                "browser_download_url": format!("{base}/dl/redis-8.4.0-linux-x64.tar.gz"),
                "size": 2048,
            },
            {
                "name": "checksums.txt",
                "browser_download_url": format!("{base}/dl/checksums.txt"),
                "size": 94,
            }
        ]
    })
}

fn manifest_in(temp: &TempDir) -> PathBuf {
    temp.path().join("releases.json")
}

fn sweep_request(path: PathBuf) -> SyncRequest {
    SyncRequest {
        manifest_path: path,
        repository: Some("acme/db-archives".to_string()),
        release: None,
        dry_run: false,
        push: false,
    }
}

#[test]
fn full_sweep_writes_and_is_idempotent() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/repos/acme/db-archives/releases",
        ))
        .times(2)
        .respond_with(json_encoded(json!([redis_release(&server)]))),
    );
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/acme/db-archives/releases/download/redis-8.4.0/checksums.txt",
        ))
        .respond_with(
            status_code(200).body(format!("{}  redis-8.4.0-linux-x64.tar.gz\n", digest())),
        ),
    );

    let temp = tempfile::tempdir().expect("tempdir");
    let path = manifest_in(&temp);
    let config = test_config(&server);

    let first = run_sync(&config, &sweep_request(path.clone())).expect("first run");
    assert_eq!(first.added, vec!["redis-8.4.0"]);
    assert!(first.wrote);
    assert!(!first.pushed);

    let written = fs::read_to_string(&path).expect("read manifest");
    assert!(written.ends_with('\n'));
    let manifest = Manifest::parse(&written).expect("parse manifest");
    assert!(manifest.last_updated.is_some());
    let entry = &manifest.databases["redis"]["8.4.0"];
    assert_eq!(entry.platforms["linux-x64"].sha256, digest());
    assert_eq!(entry.platforms["linux-x64"].size, 2048);
    // The checksums asset itself never classifies into the platform map.
    assert_eq!(entry.platforms.len(), 1);

    let second = run_sync(&config, &sweep_request(path.clone())).expect("second run");
    assert!(second.added.is_empty());
    assert!(!second.wrote);
    assert_eq!(fs::read_to_string(&path).expect("reread"), written);
}

#[test]
fn dry_run_reports_without_writing() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/repos/acme/db-archives/releases",
        ))
        .respond_with(json_encoded(json!([redis_release(&server)]))),
    );
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/acme/db-archives/releases/download/redis-8.4.0/checksums.txt",
        ))
        .respond_with(
            status_code(200).body(format!("{}  redis-8.4.0-linux-x64.tar.gz\n", digest())),
        ),
    );

    let temp = tempfile::tempdir().expect("tempdir");
    let path = manifest_in(&temp);
    let mut request = sweep_request(path.clone());
    request.dry_run = true;

    let summary = run_sync(&test_config(&server), &request).expect("dry run");
    assert_eq!(summary.added, vec!["redis-8.4.0"]);
    assert!(summary.dry_run);
    assert!(!summary.wrote);
    assert!(!path.exists());
}

#[test]
fn single_release_path_upserts_then_sweeps() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/repos/acme/db-archives/releases/tags/redis-8.4.0",
        ))
        .respond_with(json_encoded(redis_release(&server))),
    );
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/acme/db-archives/releases/download/redis-8.4.0/checksums.txt",
        ))
        .respond_with(
            status_code(200).body(format!("{}  redis-8.4.0-linux-x64.tar.gz\n", digest())),
        ),
    );
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/repos/acme/db-archives/releases",
        ))
        .respond_with(json_encoded(json!([redis_release(&server)]))),
    );

    let temp = tempfile::tempdir().expect("tempdir");
    let path = manifest_in(&temp);
    let mut request = sweep_request(path.clone());
    request.release = Some(ReleaseRequest {
        database: "redis".to_string(),
        version: "8.4.0".to_string(),
        tag: "redis-8.4.0".to_string(),
    });

    let summary = run_sync(&test_config(&server), &request).expect("release run");
    // The sweep sees the tag already filed, so it is counted exactly once.
    assert_eq!(summary.added, vec!["redis-8.4.0"]);
    assert!(summary.wrote);

    let manifest = Manifest::parse(&fs::read_to_string(&path).expect("read")).expect("parse");
    assert!(manifest.databases["redis"].contains_key("8.4.0"));
}

fn tagged_release(server: &Server, tag: &str) -> Value {
    let base = server.url_str("/").trim_end_matches('/').to_string();
    json!({
        "tag_name": tag,
        "published_at": "2026-05-01T08:00:00Z",
        "assets": [
            {
                "name": format!("{tag}-linux-x64.tar.gz"),
                "browser_download_url": format!("{base}/dl/{tag}-linux-x64.tar.gz"),
                "size": 2048,
            }
        ]
    })
}

fn expect_single_release(server: &Server, tag: &str) {
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            format!("/repos/acme/db-archives/releases/tags/{tag}"),
        ))
        .respond_with(json_encoded(tagged_release(server, tag))),
    );
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            format!("/acme/db-archives/releases/download/{tag}/checksums.txt"),
        ))
        .respond_with(status_code(200).body(format!("{}  {tag}-linux-x64.tar.gz\n", digest()))),
    );
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/repos/acme/db-archives/releases",
        ))
        .respond_with(json_encoded(json!([tagged_release(server, tag)]))),
    );
}

#[test]
fn single_release_files_under_the_requested_database() {
    // "foo-2-1.0" splits as foo/2-1.0 under the tag grammar; the request
    // knows better and must win.
    let server = Server::run();
    expect_single_release(&server, "foo-2-1.0");

    let temp = tempfile::tempdir().expect("tempdir");
    let path = manifest_in(&temp);
    let mut request = sweep_request(path.clone());
    request.release = Some(ReleaseRequest {
        database: "foo-2".to_string(),
        version: "1.0".to_string(),
        tag: "foo-2-1.0".to_string(),
    });

    let summary = run_sync(&test_config(&server), &request).expect("release run");
    assert_eq!(summary.added, vec!["foo-2-1.0"]);

    let manifest = Manifest::parse(&fs::read_to_string(&path).expect("read")).expect("parse");
    assert!(
        manifest.databases.contains_key("foo-2"),
        "entry filed under {:?} instead of the requested database",
        manifest.databases.keys().collect::<Vec<_>>()
    );
    assert!(!manifest.databases.contains_key("foo"));
    assert_eq!(
        manifest.databases["foo-2"]["1.0"].release_tag,
        "foo-2-1.0"
    );
}

#[test]
fn single_release_accepts_a_version_the_tag_grammar_cannot_split() {
    // "redis-v8.4" has no hyphen-digit split point, but it composes from
    // the requested pair, which is all this path needs.
    let server = Server::run();
    expect_single_release(&server, "redis-v8.4");

    let temp = tempfile::tempdir().expect("tempdir");
    let path = manifest_in(&temp);
    let mut request = sweep_request(path.clone());
    request.release = Some(ReleaseRequest {
        database: "redis".to_string(),
        version: "v8.4".to_string(),
        tag: "redis-v8.4".to_string(),
    });

    let summary = run_sync(&test_config(&server), &request).expect("release run");
    assert_eq!(summary.added, vec!["redis-v8.4"]);
    assert!(summary.warnings.is_empty(), "{:?}", summary.warnings);

    let manifest = Manifest::parse(&fs::read_to_string(&path).expect("read")).expect("parse");
    assert!(manifest.databases["redis"].contains_key("v8.4"));
}

#[test]
fn unadmittable_requested_release_error_names_the_cause() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/repos/acme/db-archives/releases/tags/redis-8.4.0",
        ))
        .respond_with(json_encoded(tagged_release(&server, "redis-8.4.0"))),
    );
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/acme/db-archives/releases/download/redis-8.4.0/checksums.txt",
        ))
        .respond_with(status_code(404)),
    );

    let temp = tempfile::tempdir().expect("tempdir");
    let mut request = sweep_request(manifest_in(&temp));
    request.release = Some(ReleaseRequest {
        database: "redis".to_string(),
        version: "8.4.0".to_string(),
        tag: "redis-8.4.0".to_string(),
    });

    let err = run_sync(&test_config(&server), &request).expect_err("must not admit");
    assert!(err.downcast_ref::<UserError>().is_some());
    let text = err.to_string();
    assert!(
        text.contains("checksums.txt"),
        "error does not say why: {text}"
    );
}

#[test]
fn mismatched_release_identifiers_are_a_user_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut request = sweep_request(manifest_in(&temp));
    request.release = Some(ReleaseRequest {
        database: "redis".to_string(),
        version: "8.4.0".to_string(),
        tag: "redis-9.9.9".to_string(),
    });

    let config = Config {
        token: None,
        api_base: "http://127.0.0.1:9".to_string(),
        download_base: "http://127.0.0.1:9".to_string(),
        push_attempts: 1,
    };
    let err = run_sync(&config, &request).expect_err("mismatch must fail");
    assert!(err.downcast_ref::<UserError>().is_some());
}

#[test]
fn missing_manifest_without_repo_is_a_user_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut request = sweep_request(manifest_in(&temp));
    request.repository = None;

    let config = Config {
        token: None,
        api_base: "http://127.0.0.1:9".to_string(),
        download_base: "http://127.0.0.1:9".to_string(),
        push_attempts: 1,
    };
    let err = run_sync(&config, &request).expect_err("missing manifest must fail");
    assert!(err.downcast_ref::<UserError>().is_some());
}
