//! Integration test: app lifecycle against a temporary host tree.
//!
//! Verifies that:
//! 1. Create writes all four files and mounts exactly one block.
//! 2. Protected slugs are refused with no file-system side effects.
//! 3. A missing marker leaves files written and reports the failed registration step.
//! 4. Delete removes files and block; a second delete is a clean no-op.
//! 5. Generated bundles are parsed but never written until mounted or saved.
//! 6. Concurrent creates of one slug mount it once; creates of distinct slugs all mount.

use async_trait::async_trait;
use minihub_core::{
    AppLifecycle, BundleFiles, FileKind, GenerationRequest, HostConfig, HubError, HubResult,
    ModelInfo, Provider, TextGenerator, CONTEXT_FILE_NAME, DEFAULT_MOUNT_MARKER,
};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SERVER_JS: &str = "const express = require('express');\n\
const path = require('path');\n\
const app = express();\n\
\n\
// {{APP_MOUNT_POINT}}\n\
\n\
app.listen(3000);\n";

/// Returns a fixed reply and records the last prompt it was sent.
struct CannedGenerator {
    reply: String,
    last_prompt: Mutex<Option<String>>,
}

impl CannedGenerator {
    fn new(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.into(),
            last_prompt: Mutex::new(None),
        })
    }

    fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, _provider: Provider, _model: Option<&str>, prompt: &str) -> HubResult<String> {
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        Ok(self.reply.clone())
    }

    async fn list_models(&self, _provider: Provider) -> HubResult<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            id: "canned".into(),
            name: "Canned".into(),
        }])
    }
}

/// Generator that always fails, as an unreachable model server would.
struct DownGenerator;

#[async_trait]
impl TextGenerator for DownGenerator {
    async fn generate(&self, _provider: Provider, _model: Option<&str>, _prompt: &str) -> HubResult<String> {
        Err(HubError::UpstreamGeneration("connection refused".into()))
    }

    async fn list_models(&self, _provider: Provider) -> HubResult<Vec<ModelInfo>> {
        Err(HubError::UpstreamGeneration("connection refused".into()))
    }
}

fn sample_files(tag: &str) -> BundleFiles {
    BundleFiles {
        routes: format!("const router = require('express').Router();\nrouter.get('/ping', (req, res) => res.json({{ tag: '{tag}' }}));\nmodule.exports = router;"),
        html: format!("<!doctype html><title>{tag}</title><script src=\"script.js\"></script>"),
        script: format!("console.log('{tag}');"),
        style: "body { margin: 0; }".into(),
    }
}

fn host(root: &Path, entry_point: &str) -> HostConfig {
    std::fs::create_dir_all(root.join("apps")).unwrap();
    std::fs::write(root.join("server.js"), entry_point).unwrap();
    HostConfig::rooted_at(root)
}

fn lifecycle(cfg: &HostConfig, generator: Arc<dyn TextGenerator>) -> AppLifecycle {
    AppLifecycle::from_config_with_generator(cfg, generator)
}

fn block_count(cfg: &HostConfig, slug: &str) -> usize {
    let source = std::fs::read_to_string(cfg.entry_point_path()).unwrap();
    source.matches(&format!("// --- Routes for {slug} ---")).count()
}

#[tokio::test]
async fn create_writes_files_and_mounts_once() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = host(dir.path(), SERVER_JS);
    let hub = lifecycle(&cfg, CannedGenerator::new(""));

    let outcome = hub.create("My Stopwatch", sample_files("sw")).await.unwrap();
    assert_eq!(outcome.slug, "my-stopwatch");
    assert!(outcome.message.contains("/my-stopwatch"));

    let app = cfg.apps_path().join("my-stopwatch");
    for kind in FileKind::ALL {
        assert!(app.join(kind.relative_path()).is_file(), "{kind} should exist");
    }
    assert_eq!(block_count(&cfg, "my-stopwatch"), 1);

    let snapshot = hub.snapshot().await.unwrap();
    let entry = snapshot.by_static_segment("my-stopwatch").expect("mounted");
    assert_eq!(entry.api_prefix.as_deref(), Some("/api/my-stopwatch"));
    assert_eq!(entry.app_dir, "my-stopwatch");

    let read = hub.read("my-stopwatch").await.unwrap();
    assert_eq!(read, sample_files("sw"));
}

#[tokio::test]
async fn second_create_conflicts_without_touching_entry_point() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = host(dir.path(), SERVER_JS);
    let hub = lifecycle(&cfg, CannedGenerator::new(""));

    hub.create("notes", sample_files("first")).await.unwrap();
    let before = std::fs::read_to_string(cfg.entry_point_path()).unwrap();

    let err = hub.create("Notes", sample_files("second")).await.unwrap_err();
    assert!(matches!(err, HubError::AlreadyExists(ref s) if s == "notes"));
    assert_eq!(std::fs::read_to_string(cfg.entry_point_path()).unwrap(), before);
    assert_eq!(hub.read("notes").await.unwrap(), sample_files("first"));
}

#[tokio::test]
async fn protected_slugs_have_no_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = host(dir.path(), SERVER_JS);
    let hub = lifecycle(&cfg, CannedGenerator::new(""));

    // An existing infrastructure app on disk.
    let manager = cfg.apps_path().join("app-manager").join("public");
    std::fs::create_dir_all(&manager).unwrap();
    std::fs::write(manager.join("index.html"), "manager").unwrap();

    let err = hub.create("App Manager", sample_files("x")).await.unwrap_err();
    assert!(matches!(err, HubError::Forbidden(_)));
    let err = hub.delete("app-manager").await.unwrap_err();
    assert!(matches!(err, HubError::Forbidden(_)));
    let err = hub.save("app-manager", &sample_files("x")).await.unwrap_err();
    assert!(matches!(err, HubError::Forbidden(_)));
    let err = hub
        .generate_edit(
            "app-manager",
            GenerationRequest {
                user_request: "make it red",
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::Forbidden(_)));

    assert_eq!(std::fs::read_to_string(manager.join("index.html")).unwrap(), "manager");
    assert_eq!(std::fs::read_to_string(cfg.entry_point_path()).unwrap(), SERVER_JS);
    assert!(hub.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_slug_and_incomplete_files_are_rejected_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = host(dir.path(), SERVER_JS);
    let hub = lifecycle(&cfg, CannedGenerator::new(""));

    let err = hub.create("   ", sample_files("x")).await.unwrap_err();
    assert!(matches!(err, HubError::InvalidInput(_)));

    let mut files = sample_files("x");
    files.style = "  ".into();
    let err = hub.create("half done", files).await.unwrap_err();
    match err {
        HubError::InvalidInput(msg) => assert!(msg.contains("style.css")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!cfg.apps_path().join("half-done").exists());
    assert_eq!(std::fs::read_to_string(cfg.entry_point_path()).unwrap(), SERVER_JS);
}

#[tokio::test]
async fn missing_marker_is_partial_success() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = host(dir.path(), "const app = require('express')();\napp.listen(3000);\n");
    let hub = lifecycle(&cfg, CannedGenerator::new(""));

    let err = hub.create("orphan", sample_files("o")).await.unwrap_err();
    match &err {
        HubError::PartiallyApplied { slug, step, source, .. } => {
            assert_eq!(slug, "orphan");
            assert_eq!(*step, "registration");
            assert!(matches!(**source, HubError::MarkerNotFound { ref marker, .. } if marker == DEFAULT_MOUNT_MARKER));
        }
        other => panic!("unexpected error: {other}"),
    }
    let msg = err.to_string();
    assert!(msg.contains("orphan") && msg.contains("registration"));

    // Files stay; nothing is rolled back.
    assert_eq!(hub.read("orphan").await.unwrap(), sample_files("o"));
    assert!(hub.snapshot().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_then_read_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = host(dir.path(), SERVER_JS);
    let hub = lifecycle(&cfg, CannedGenerator::new(""));

    hub.create("tile game", sample_files("t")).await.unwrap();
    let outcome = hub.delete("tile-game").await.unwrap();
    assert!(outcome.routes_removed);

    assert!(matches!(hub.read("tile-game").await, Err(HubError::NotFound(_))));
    assert_eq!(std::fs::read_to_string(cfg.entry_point_path()).unwrap(), SERVER_JS);

    // Deleting again succeeds and reports the missing routes.
    let again = hub.delete("tile-game").await.unwrap();
    assert!(!again.routes_removed);
    assert!(again.message.contains("no corresponding routes"));
}

#[tokio::test]
async fn delete_leaves_neighbours_mounted() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = host(dir.path(), SERVER_JS);
    let hub = lifecycle(&cfg, CannedGenerator::new(""));

    for name in ["alpha", "beta", "gamma"] {
        hub.create(name, sample_files(name)).await.unwrap();
    }
    hub.delete("beta").await.unwrap();

    let slugs: Vec<String> = hub
        .snapshot()
        .await
        .unwrap()
        .entries
        .into_iter()
        .map(|e| e.slug)
        .collect();
    assert_eq!(slugs, vec!["alpha", "gamma"]);

    let mut listed = hub.list().await.unwrap();
    listed.sort();
    assert_eq!(listed, vec!["alpha", "gamma"]);
}

#[tokio::test]
async fn save_requires_existing_app() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = host(dir.path(), SERVER_JS);
    let hub = lifecycle(&cfg, CannedGenerator::new(""));

    let err = hub.save("ghost", &sample_files("g")).await.unwrap_err();
    assert!(matches!(err, HubError::NotFound(_)));
    assert!(!cfg.apps_path().join("ghost").exists());

    hub.create("ghost", sample_files("g")).await.unwrap();
    let before = std::fs::read_to_string(cfg.entry_point_path()).unwrap();
    hub.save("ghost", &sample_files("boo")).await.unwrap();
    assert_eq!(hub.read("ghost").await.unwrap(), sample_files("boo"));
    assert_eq!(std::fs::read_to_string(cfg.entry_point_path()).unwrap(), before);
}

#[tokio::test]
async fn generate_create_parses_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = host(dir.path(), SERVER_JS);
    let reply = "Sure, here you go.\n\
--- START OF FILE apps/dice/public/style.css ---\n\
body { color: red; }\n\
--- END OF FILE apps/dice/public/style.css ---\n\
--- START OF FILE apps/dice/routes.js ---\n\
module.exports = require('express').Router();\n\
--- END OF FILE apps/dice/routes.js ---\n\
--- START OF FILE apps/dice/public/index.html ---\n\
<h1>Dice</h1>\n\
--- END OF FILE apps/dice/public/index.html ---\n";
    let generator = CannedGenerator::new(reply);
    let hub = lifecycle(&cfg, generator.clone());

    let generated = hub
        .generate_create(
            "Dice",
            GenerationRequest {
                user_request: "roll two dice",
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(generated.slug, "dice");
    assert!(!generated.parsed.is_complete());
    assert_eq!(generated.parsed.missing(), vec![FileKind::Script]);
    assert_eq!(generated.parsed.files().style, "body { color: red; }");

    let prompt = generator.last_prompt().unwrap();
    assert!(prompt.contains("roll two dice"));
    assert!(prompt.contains("apps/dice/routes.js"));

    assert!(!cfg.apps_path().join("dice").exists());
    assert_eq!(std::fs::read_to_string(cfg.entry_point_path()).unwrap(), SERVER_JS);

    // An incomplete bundle cannot be mounted.
    let err = hub
        .mount_generated("Dice", generated.parsed.into_files())
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::InvalidInput(_)));
}

#[tokio::test]
async fn generate_edit_embeds_current_files() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = host(dir.path(), SERVER_JS);
    let generator = CannedGenerator::new(minihub_core::render_bundle("clock", &sample_files("v2")));
    let hub = lifecycle(&cfg, generator.clone());

    hub.create("clock", sample_files("v1")).await.unwrap();
    let preview = hub
        .generate_edit(
            "clock",
            GenerationRequest {
                user_request: "show seconds",
                provider: Provider::Gemini,
                model: Some("gemini-pro"),
            },
        )
        .await
        .unwrap();

    assert!(preview.parsed.is_complete());
    assert_eq!(preview.parsed.files(), &sample_files("v2"));
    let prompt = generator.last_prompt().unwrap();
    assert!(prompt.contains("show seconds"));
    assert!(prompt.contains("console.log('v1');"));

    // Preview only; disk is unchanged until save.
    assert_eq!(hub.read("clock").await.unwrap(), sample_files("v1"));
    hub.save("clock", preview.parsed.files()).await.unwrap();
    assert_eq!(hub.read("clock").await.unwrap(), sample_files("v2"));
}

#[tokio::test]
async fn upstream_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = host(dir.path(), SERVER_JS);
    let hub = lifecycle(&cfg, Arc::new(DownGenerator));

    let err = hub
        .generate_create(
            "weather",
            GenerationRequest {
                user_request: "show the forecast",
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::UpstreamGeneration(_)));
    assert!(!cfg.apps_path().join("weather").exists());
    assert!(matches!(
        hub.list_models(Provider::Local).await,
        Err(HubError::UpstreamGeneration(_))
    ));
}

#[tokio::test]
async fn build_context_writes_document() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = host(dir.path(), SERVER_JS);
    let hub = lifecycle(&cfg, CannedGenerator::new(""));

    hub.create("quiz", sample_files("q")).await.unwrap();
    let outcome = hub.build_context("quiz").await.unwrap();
    assert_eq!(outcome.path, cfg.apps_path().join("quiz").join(CONTEXT_FILE_NAME));
    let written = std::fs::read_to_string(&outcome.path).unwrap();
    assert_eq!(written, outcome.context);
    assert!(written.contains("console.log('q');"));

    assert!(matches!(
        hub.build_context("missing").await,
        Err(HubError::NotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_of_one_slug_mount_once() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = host(dir.path(), SERVER_JS);
    let hub = Arc::new(lifecycle(&cfg, CannedGenerator::new("")));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let hub = hub.clone();
            tokio::spawn(async move { hub.create("Race", sample_files(&format!("r{i}"))).await })
        })
        .collect();

    let mut created = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(outcome) => {
                assert_eq!(outcome.slug, "race");
                created += 1;
            }
            Err(HubError::AlreadyExists(slug)) => assert_eq!(slug, "race"),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(block_count(&cfg, "race"), 1);
    assert_eq!(hub.list().await.unwrap(), vec!["race".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_of_distinct_slugs_all_mount() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = host(dir.path(), SERVER_JS);
    let hub = Arc::new(lifecycle(&cfg, CannedGenerator::new("")));

    let tasks: Vec<_> = (0..12)
        .map(|i| {
            let hub = hub.clone();
            tokio::spawn(async move { hub.create(&format!("game {i}"), sample_files("g")).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let snapshot = hub.snapshot().await.unwrap();
    assert_eq!(snapshot.len(), 12);
    for i in 0..12 {
        let slug = format!("game-{i}");
        assert_eq!(block_count(&cfg, &slug), 1, "{slug} mounted once");
        assert!(snapshot.by_static_segment(&slug).is_some());
    }
    assert!(std::fs::read_to_string(cfg.entry_point_path())
        .unwrap()
        .contains(DEFAULT_MOUNT_MARKER));
}
