//! End-to-end tests for transform-md.
//!
//! Files are written to temp directories; image downloads hit an axum
//! server bound to 127.0.0.1 inside the test process, so nothing leaves the
//! machine.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Command;
use tokio::net::TcpListener;
use transform_md::{
    transform_dir, transform_file, transform_text, Transform, TransformConfig, TransformSet,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data")
}

fn read(path: impl AsRef<Path>) -> String {
    std::fs::read_to_string(path.as_ref())
        .unwrap_or_else(|e| panic!("read {}: {e}", path.as_ref().display()))
}

/// One canned HTTP response.
struct Route {
    path: &'static str,
    content_type: Option<&'static str>,
    body: &'static [u8],
}

/// Serve `routes` on an ephemeral port until the test's runtime shuts down.
/// Unknown paths get axum's default 404.
async fn serve(routes: Vec<Route>) -> SocketAddr {
    let mut app = Router::new();
    for Route {
        path,
        content_type,
        body,
    } in routes
    {
        app = app.route(
            path,
            get(move || async move {
                match content_type {
                    Some(ct) => ([(header::CONTENT_TYPE, ct)], body).into_response(),
                    None => Response::new(Body::from(body)),
                }
            }),
        );
    }
    serve_router(app).await
}

async fn serve_router(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });
    addr
}

fn with_images() -> TransformConfig {
    with_images_timeout(5)
}

fn with_images_timeout(secs: u64) -> TransformConfig {
    TransformConfig::builder()
        .download_images(true)
        .download_timeout_secs(secs)
        .build()
        .unwrap()
}

// ── Text transform on a realistic export ─────────────────────────────────────

#[test]
fn test_chat_export_fixture() {
    let input = read(data_dir().join("chat_export.md"));
    let expected = read(data_dir().join("chat_export.expected.md"));
    assert_eq!(transform_text(&input, &TransformSet::default()), expected);
}

#[test]
fn test_fixture_output_is_stable() {
    // Running the transform on its own output changes nothing.
    let expected = read(data_dir().join("chat_export.expected.md"));
    assert_eq!(transform_text(&expected, &TransformSet::default()), expected);
}

#[test]
fn test_skip_collapse_keeps_long_blank_runs() {
    let input = read(data_dir().join("chat_export.md"));
    let set = TransformSet::without([Transform::CollapseBlanks]);
    let out = transform_text(&input, &set);
    assert!(out.contains("flow.\n\n\n\nHere it is:"), "got:\n{out}");
    assert!(out.contains("```mermaid\ngraph TD"));
}

// ── File and directory conversion ────────────────────────────────────────────

#[tokio::test]
async fn test_transform_file_to_other_path() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("chat.md");
    let output = dir.path().join("nested/clean.md");
    std::fs::copy(data_dir().join("chat_export.md"), &input).unwrap();

    let report = transform_file(&input, Some(output.as_path()), &TransformConfig::default())
        .await
        .unwrap();

    assert_eq!(report.output, output);
    assert_eq!(read(&output), read(data_dir().join("chat_export.expected.md")));
    assert_eq!(read(&input), read(data_dir().join("chat_export.md")));
    assert!(!dir.path().join("nested/images").exists());
}

#[tokio::test]
async fn test_transform_dir_sorted_md_only() {
    let indir = tempfile::tempdir().unwrap();
    let outdir = tempfile::tempdir().unwrap();
    let outdir = outdir.path().join("out");
    std::fs::write(indir.path().join("b.md"), "Code snippet (sql)\nSELECT 1;\n").unwrap();
    std::fs::write(indir.path().join("a.md"), "x\n\n\n\n\ny\n").unwrap();
    std::fs::write(indir.path().join("skip.txt"), "Code snippet\n").unwrap();

    let report = transform_dir(indir.path(), &outdir, &TransformConfig::default())
        .await
        .unwrap();

    let written: Vec<_> = report.written().cloned().collect();
    assert_eq!(written, vec![outdir.join("a.md"), outdir.join("b.md")]);
    assert_eq!(read(outdir.join("a.md")), "x\n\n\ny\n");
    assert_eq!(read(outdir.join("b.md")), "```sql\nSELECT 1;\n```\n");
    assert!(!outdir.join("skip.txt").exists());
}

// ── Image localisation over HTTP ─────────────────────────────────────────────

#[tokio::test]
async fn test_download_images_rewrites_reachable_reference() {
    let addr = serve(vec![Route {
        path: "/cat.png",
        content_type: Some("image/png"),
        body: b"\x89PNG fake",
    }])
    .await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("chat.md");
    let outdir = dir.path().join("out");
    let output = outdir.join("chat.md");
    std::fs::write(
        &input,
        format!("Look:\n\n![Image of a cat](http://{addr}/cat.png)\n"),
    )
    .unwrap();

    let report = transform_file(&input, Some(output.as_path()), &with_images())
        .await
        .unwrap();

    assert_eq!(read(&output), "Look:\n\n![Image of](images/cat.png)\n");
    assert_eq!(std::fs::read(outdir.join("images/cat.png")).unwrap(), b"\x89PNG fake");
    let stats = report.images.unwrap();
    assert_eq!((stats.found, stats.downloaded, stats.failed), (1, 1, 0));
}

#[tokio::test]
async fn test_download_images_unreachable_left_untouched() {
    let addr = serve(vec![]).await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("chat.md");
    // One 404 from the local server, one refused connection.
    let text = format!(
        "![Image of missing](http://{addr}/missing.png)\n\
         ![Image of nothing](http://127.0.0.1:1/nothing.png)\n"
    );
    std::fs::write(&input, &text).unwrap();

    let report = transform_file(&input, None, &with_images()).await.unwrap();

    assert_eq!(read(&input), text);
    assert!(dir.path().join("images").is_dir());
    assert_eq!(std::fs::read_dir(dir.path().join("images")).unwrap().count(), 0);
    let stats = report.images.unwrap();
    assert_eq!((stats.found, stats.downloaded, stats.failed), (2, 0, 2));
}

#[tokio::test]
async fn test_download_images_content_type_and_duplicates() {
    let addr = serve(vec![
        Route {
            path: "/render/chart",
            content_type: Some("image/jpeg"),
            body: b"jpeg",
        },
        Route {
            path: "/a/chart",
            content_type: None,
            body: b"blob",
        },
    ])
    .await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("chat.md");
    std::fs::write(
        &input,
        format!(
            "![Image of one](http://{addr}/render/chart) and ![Image of two](http://{addr}/a/chart)"
        ),
    )
    .unwrap();

    transform_file(&input, None, &with_images()).await.unwrap();

    assert_eq!(
        read(&input),
        "![Image of](images/chart.jpg) and ![Image of](images/chart-1.img)"
    );
    assert_eq!(std::fs::read(dir.path().join("images/chart-1.img")).unwrap(), b"blob");
}

#[tokio::test]
async fn test_download_images_timeout_left_untouched() {
    // Accepts the request and never answers.
    let stalled = Router::new().route(
        "/slow.png",
        get(|| std::future::pending::<&'static [u8]>()),
    );
    let slow = serve_router(stalled).await;
    let fast = serve(vec![Route {
        path: "/dog.png",
        content_type: Some("image/png"),
        body: b"dog",
    }])
    .await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("chat.md");
    std::fs::write(
        &input,
        format!("![Image of a](http://{slow}/slow.png) ![Image of b](http://{fast}/dog.png)\n"),
    )
    .unwrap();

    let report = transform_file(&input, None, &with_images_timeout(1))
        .await
        .unwrap();

    assert_eq!(
        read(&input),
        format!("![Image of a](http://{slow}/slow.png) ![Image of](images/dog.png)\n")
    );
    assert!(!dir.path().join("images/slow.png").exists());
    let stats = report.images.unwrap();
    assert_eq!((stats.found, stats.downloaded, stats.failed), (2, 1, 1));
}

// ── Command line ─────────────────────────────────────────────────────────────

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_transform-md"))
}

#[test]
fn test_cli_list_transforms() {
    let out = bin().arg("--list-transforms").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("Available transforms:"));
    for id in ["code_snippet", "close_fences", "collapse_blanks"] {
        assert!(stdout.contains(&format!("- {id}: ")), "missing {id}:\n{stdout}");
    }
}

#[test]
fn test_cli_indir_without_outdir_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = bin().arg("--indir").arg(dir.path()).output().unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("--outdir"));
}

#[test]
fn test_cli_single_file_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("chat.md");
    std::fs::write(&input, "Start\n\n```python\nprint(1)\n").unwrap();

    let out = bin().arg(&input).output().unwrap();

    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim(),
        format!("Wrote: {}", input.display())
    );
    assert!(read(&input).trim().ends_with("```"));
}

#[test]
fn test_cli_run_transforms_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("chat.md");
    let output = dir.path().join("out.md");
    std::fs::write(&input, "Code snippet\ngraph TD\n\n\n\n\nend\n").unwrap();

    let status = bin()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--run-transforms")
        .arg("code_snippet")
        .status()
        .unwrap();

    assert!(status.success());
    assert_eq!(read(&output), "```mermaid\ngraph TD\n\n\n\n\nend\n");
}

#[test]
fn test_cli_unknown_transform_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("chat.md");
    std::fs::write(&input, "x\n").unwrap();

    let out = bin()
        .arg(&input)
        .arg("--skip-transforms")
        .arg("collapse_blanks,bogus")
        .output()
        .unwrap();

    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Unknown transform 'bogus'"), "stderr: {stderr}");
    assert_eq!(read(&input), "x\n");
}
