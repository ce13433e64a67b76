//! End-to-end tests for the clean and build phases.
//!
//! Each test lays out a small site in a temp directory, builds it through
//! the task graph and inspects what landed in the destination root.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetflow::build::{AssetKind, BuildContext, BuildReport, BuildStatus, GraphError, TaskGraph};
use assetflow::config::{default_config, AssetflowConfig};
use assetflow::env::Environment;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use walkdir::WalkDir;

// ============================================================================
// Fixtures
// ============================================================================

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn create_site(root: &Path) {
    write(
        root,
        "src/pages/index.html",
        r#"<!DOCTYPE html>
<html>
<head>
  <link rel="stylesheet" href="../../assets/style.min.css">
</head>
<body>
  @@include('../partials/header.html', {"title": "Home"})
  <main>
    <p>Welcome</p>
  </main>
  <script src="../../assets/script.min.js"></script>
</body>
</html>
"#,
    );
    write(root, "src/partials/header.html", "<header><h1>@@title</h1></header>\n");
    write(
        root,
        "src/assets/styles/main.scss",
        "$gap: 24px;\n.card { padding: $gap; border: 1px solid; }\n@media (min-width: 600px) { .card { margin: 32px; } }\n",
    );
    write(
        root,
        "src/assets/scripts/main.js",
        "function hello(name) {\n  return \"hi \" + name;\n}\nhello(\"x\");\n",
    );
    write(
        root,
        "src/assets/images/logo.svg",
        "<?xml version=\"1.0\"?>\n<!-- logo -->\n<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"10\" height=\"10\">\n  <rect width=\"10\" height=\"10\"/>\n</svg>\n",
    );
    write(
        root,
        "src/assets/images/sprite/icon.svg",
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 4 4\"><circle r=\"2\"/></svg>",
    );
    write(root, "src/assets/fonts/site.woff2", "font-bytes");
}

/// Config that needs no external tools.
fn offline_config() -> AssetflowConfig {
    let mut config = default_config();
    config.script.transpile_command.clear();
    config
}

fn graph(root: &Path, env: Environment) -> TaskGraph {
    let ctx = BuildContext::new(offline_config(), root, env).unwrap();
    TaskGraph::new(Arc::new(ctx)).unwrap()
}

async fn clean_build(graph: &TaskGraph) -> BuildReport {
    graph.clean().unwrap();
    graph.build().await
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

/// Relative path and SHA256 of every file under `dir`.
fn hash_tree(dir: &Path) -> Vec<(PathBuf, String)> {
    let mut files: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let digest = Sha256::digest(fs::read(e.path()).unwrap());
            (e.path().strip_prefix(dir).unwrap().to_path_buf(), format!("{:x}", digest))
        })
        .collect();
    files.sort();
    files
}

// ============================================================================
// Production
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_production_build_writes_every_kind() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    create_site(root);

    let report = clean_build(&graph(root, Environment::Production)).await;
    assert!(report.is_success(), "{}", report.summary());
    assert_eq!(report.results.len(), 5);

    let html = read(root, "docs/index.html");
    assert!(html.contains("<h1>Home</h1>"));
    assert!(html.contains(r#"href="assets/style.min.css""#));
    assert!(html.contains(r#"src="assets/script.min.js""#));
    assert!(!html.contains("@@"));
    assert!(!html.contains('\n'));

    let css = read(root, "docs/assets/style.min.css");
    assert!(css.contains("1.5rem"));
    assert!(css.contains("2rem"));
    assert!(css.contains("1px"));
    assert!(!css.contains('\n'));
    assert!(!css.contains("sourceMappingURL"));

    let js = read(root, "docs/assets/script.min.js");
    assert!(js.contains("hello"));
    assert!(!js.contains("sourceMappingURL"));

    let sprite = read(root, "docs/assets/images/sprite.svg");
    assert!(sprite.contains(r#"<symbol id="icon" viewBox="0 0 4 4">"#));

    let logo = read(root, "docs/assets/images/logo.svg");
    assert!(!logo.contains("<!--"));
    assert!(!logo.contains("<?xml"));

    assert_eq!(read(root, "docs/assets/fonts/site.woff2"), "font-bytes");
    assert!(!root.join("docs/assets/images/sprite/icon.svg").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_production_build_is_reproducible() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    create_site(root);
    let graph = graph(root, Environment::Production);

    assert!(clean_build(&graph).await.is_success());
    let first = hash_tree(&root.join("docs"));
    assert!(clean_build(&graph).await.is_success());
    let second = hash_tree(&root.join("docs"));

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

// ============================================================================
// Development
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_development_build_keeps_maps_and_whitespace() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    create_site(root);

    let report = clean_build(&graph(root, Environment::Development)).await;
    assert!(report.is_success(), "{}", report.summary());

    let html = read(root, "docs/index.html");
    assert!(html.contains("<h1>Home</h1>"));
    assert!(html.contains('\n'));
    assert!(html.contains(r#"href="assets/style.min.css""#));

    let css = read(root, "docs/assets/style.min.css");
    assert!(css.contains("padding: 1.5rem"));
    assert!(css.contains("sourceMappingURL=data:application/json"));

    let js = read(root, "docs/assets/script.min.js");
    assert!(js.contains("return \"hi \" + name;"));
    assert!(js.contains("//# sourceMappingURL="));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_compile_error_is_isolated() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    create_site(root);
    write(root, "src/assets/styles/main.scss", ".card { color: $missing; }\n");

    let report = clean_build(&graph(root, Environment::Development)).await;
    assert_eq!(report.failed_count(), 1);
    assert!(report.fatal.is_none());
    assert!(matches!(report.get(AssetKind::Style).unwrap().status, BuildStatus::Failed(_)));
    assert_eq!(report.get(AssetKind::Html).unwrap().status, BuildStatus::Success);
    assert!(root.join("docs/index.html").exists());
    assert!(!root.join("docs/assets/style.min.css").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_include_cycle_stops_the_run() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    create_site(root);
    write(root, "src/pages/loop.html", "@@include('../partials/a.html')\n");
    write(root, "src/partials/a.html", "a @@include('b.html')\n");
    write(root, "src/partials/b.html", "b @@include('a.html')\n");

    let graph = graph(root, Environment::Development);
    let report = clean_build(&graph).await;
    assert!(report.fatal.is_some());

    let err = graph.run().await.unwrap_err();
    assert!(matches!(err, GraphError::Fatal(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_partial_is_not_fatal() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    create_site(root);
    write(root, "src/pages/broken.html", "@@include('../partials/nope.html')\n");

    let report = clean_build(&graph(root, Environment::Development)).await;
    assert!(report.fatal.is_none());
    assert!(matches!(report.get(AssetKind::Html).unwrap().status, BuildStatus::Failed(_)));
    assert!(root.join("docs/assets/style.min.css").exists());
}

// ============================================================================
// Incremental images
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_fresh_images_are_skipped_without_clean() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    create_site(root);
    let graph = graph(root, Environment::Production);

    let first = clean_build(&graph).await;
    assert_eq!(first.get(AssetKind::Image).unwrap().unchanged, 0);

    let second = graph.build().await;
    let images = second.get(AssetKind::Image).unwrap();
    assert_eq!(images.unchanged, 1);
    assert!(!images.outputs.contains(&root.join("docs/assets/images/logo.svg")));
}

#[test]
fn test_destination_inside_sources_is_rejected() {
    let temp = TempDir::new().unwrap();
    let mut config = offline_config();
    config.project.out = PathBuf::from(".");
    assert!(BuildContext::new(config, temp.path(), Environment::Development).is_err());
}
