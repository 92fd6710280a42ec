//! File store: the four-file bundle of each app under `<apps_root>/<slug>`.
//!
//! Layout: `<slug>/routes.js` plus `<slug>/public/{index.html, script.js, style.css}`.
//! Writes are plain sequential file writes; a failure mid-way can leave a partial bundle.

use crate::bundle::{BundleFiles, FileKind};
use crate::error::{HubError, HubResult};
use crate::registry::ProtectedSet;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const CONTEXT_FILE_NAME: &str = "app-context.txt";

#[derive(Debug, Clone)]
pub struct FileStore {
    apps_root: PathBuf,
}

impl FileStore {
    pub fn new(apps_root: impl Into<PathBuf>) -> Self {
        Self {
            apps_root: apps_root.into(),
        }
    }

    pub fn apps_root(&self) -> &Path {
        &self.apps_root
    }

    pub fn app_path(&self, slug: &str) -> PathBuf {
        self.apps_root.join(slug)
    }

    pub fn public_path(&self, slug: &str) -> PathBuf {
        self.app_path(slug).join("public")
    }

    fn file_path(&self, slug: &str, kind: FileKind) -> PathBuf {
        self.app_path(slug).join(kind.relative_path())
    }

    pub async fn exists(&self, slug: &str) -> bool {
        fs::metadata(self.app_path(slug))
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Create the directory pair and write all four files. Refuses to touch an existing app.
    pub async fn create(&self, slug: &str, files: &BundleFiles) -> HubResult<()> {
        if self.exists(slug).await {
            return Err(HubError::AlreadyExists(slug.to_string()));
        }
        let public = self.public_path(slug);
        fs::create_dir_all(&public)
            .await
            .map_err(|e| HubError::io(&public, e))?;
        self.write_all(slug, files).await?;
        tracing::debug!(target: "minihub::store", slug, "bundle created");
        Ok(())
    }

    pub async fn read(&self, slug: &str) -> HubResult<BundleFiles> {
        if !self.exists(slug).await {
            return Err(HubError::NotFound(slug.to_string()));
        }
        let mut files = BundleFiles::default();
        for kind in FileKind::ALL {
            let path = self.file_path(slug, kind);
            match fs::read_to_string(&path).await {
                Ok(content) => files.set(kind, content),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(HubError::NotFound(format!("{}/{}", slug, kind.relative_path())));
                }
                Err(e) => return Err(HubError::io(&path, e)),
            }
        }
        Ok(files)
    }

    /// Overwrite all four files. No conflict detection against concurrent writers.
    pub async fn update(&self, slug: &str, files: &BundleFiles) -> HubResult<()> {
        let public = self.public_path(slug);
        fs::create_dir_all(&public)
            .await
            .map_err(|e| HubError::io(&public, e))?;
        self.write_all(slug, files).await
    }

    /// Recursive removal of the app root. A missing directory is not an error.
    pub async fn delete(&self, slug: &str) -> HubResult<()> {
        let path = self.app_path(slug);
        match fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HubError::io(&path, e)),
        }
    }

    /// Immediate subdirectories of the apps root, minus protected slugs. Order is unspecified.
    pub async fn list(&self, excluding: &ProtectedSet) -> HubResult<Vec<String>> {
        let mut entries = fs::read_dir(&self.apps_root)
            .await
            .map_err(|e| HubError::io(&self.apps_root, e))?;
        let mut slugs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| HubError::io(&self.apps_root, e))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !excluding.contains(&name) {
                slugs.push(name);
            }
        }
        Ok(slugs)
    }

    /// Write the app-context document next to the bundle and return its path.
    pub async fn write_context(&self, slug: &str, text: &str) -> HubResult<PathBuf> {
        let path = self.app_path(slug).join(CONTEXT_FILE_NAME);
        fs::write(&path, text)
            .await
            .map_err(|e| HubError::io(&path, e))?;
        Ok(path)
    }

    async fn write_all(&self, slug: &str, files: &BundleFiles) -> HubResult<()> {
        for kind in FileKind::ALL {
            let path = self.file_path(slug, kind);
            fs::write(&path, files.get(kind))
                .await
                .map_err(|e| HubError::io(&path, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BundleFiles {
        BundleFiles {
            routes: "const router = require('express').Router();\nmodule.exports = router;".into(),
            html: "<!doctype html><title>t</title>".into(),
            script: "console.log('hi');".into(),
            style: "body { margin: 0; }".into(),
        }
    }

    #[tokio::test]
    async fn create_then_read_returns_same_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.create("poll", &sample()).await.unwrap();
        assert!(store.exists("poll").await);
        assert!(dir.path().join("poll/public/index.html").is_file());
        assert_eq!(store.read("poll").await.unwrap(), sample());
    }

    #[tokio::test]
    async fn create_existing_keeps_original_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.create("poll", &sample()).await.unwrap();

        let mut other = sample();
        other.script = "overwritten".into();
        let err = store.create("poll", &other).await.unwrap_err();
        assert!(matches!(err, HubError::AlreadyExists(ref s) if s == "poll"));
        assert_eq!(store.read("poll").await.unwrap(), sample());
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_read_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.create("flip", &sample()).await.unwrap();
        store.delete("flip").await.unwrap();
        store.delete("flip").await.unwrap();
        assert!(matches!(store.read("flip").await, Err(HubError::NotFound(_))));
    }

    #[tokio::test]
    async fn read_with_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.create("sr", &sample()).await.unwrap();
        std::fs::remove_file(dir.path().join("sr/public/style.css")).unwrap();
        let err = store.read("sr").await.unwrap_err();
        assert!(matches!(err, HubError::NotFound(ref s) if s.contains("style.css")));
    }

    #[tokio::test]
    async fn list_skips_files_and_protected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.create("stopwatch", &sample()).await.unwrap();
        store.create("app-manager", &sample()).await.unwrap();
        std::fs::write(dir.path().join("README.md"), "not an app").unwrap();

        let protected = ProtectedSet::new(["app-manager"]);
        let mut slugs = store.list(&protected).await.unwrap();
        slugs.sort();
        assert_eq!(slugs, vec!["stopwatch".to_string()]);
    }

    #[tokio::test]
    async fn update_overwrites_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.create("gm", &sample()).await.unwrap();
        let next = BundleFiles {
            routes: "r2".into(),
            html: "h2".into(),
            script: "s2".into(),
            style: "c2".into(),
        };
        store.update("gm", &next).await.unwrap();
        assert_eq!(store.read("gm").await.unwrap(), next);
    }
}
