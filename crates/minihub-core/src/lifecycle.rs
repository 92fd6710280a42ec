//! App lifecycle: create, read, save, delete and the AI-assisted create/edit flows.
//!
//! Composes the file store, the source patcher and the generation client. Each operation
//! re-reads disk state; check-then-act sequences for one slug are serialized through a
//! per-slug lock, and entry-point rewrites through the patcher's own lock.

use crate::ai_parser;
use crate::bundle::{AppBundle, BundleFiles, FileKind, ParsedBundle};
use crate::config::HostConfig;
use crate::error::{HubError, HubResult};
use crate::file_store::FileStore;
use crate::generation::{GenerationClient, ModelInfo, Provider, TextGenerator};
use crate::prompts;
use crate::registry::{MountSnapshot, ProtectedSet};
use crate::slug;
use crate::source_patcher::{SourcePatcher, UnmountOutcome};
use dashmap::DashMap;
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct CreateOutcome {
    pub slug: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub slug: String,
    /// False when the entry point had no block for the slug.
    pub routes_removed: bool,
    pub message: String,
}

/// Generated files awaiting review; nothing has been written yet.
#[derive(Debug, Clone)]
pub struct GeneratedBundle {
    pub slug: String,
    pub parsed: ParsedBundle,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextOutcome {
    pub slug: String,
    pub path: PathBuf,
    pub context: String,
}

/// Request for a generated app or edit.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest<'a> {
    pub user_request: &'a str,
    pub provider: Provider,
    pub model: Option<&'a str>,
}

pub struct AppLifecycle {
    store: FileStore,
    patcher: SourcePatcher,
    protected: ProtectedSet,
    generator: Arc<dyn TextGenerator>,
    slug_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AppLifecycle {
    pub fn new(
        store: FileStore,
        patcher: SourcePatcher,
        protected: ProtectedSet,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            store,
            patcher,
            protected,
            generator,
            slug_locks: DashMap::new(),
        }
    }

    /// Wire everything from host config with the HTTP generation client.
    pub fn from_config(config: &HostConfig) -> HubResult<Self> {
        let generator = Arc::new(GenerationClient::new(config.generation.clone())?);
        Ok(Self::from_config_with_generator(config, generator))
    }

    pub fn from_config_with_generator(config: &HostConfig, generator: Arc<dyn TextGenerator>) -> Self {
        Self::new(
            FileStore::new(config.apps_path()),
            SourcePatcher::new(config.entry_point_path(), config.mount_marker.clone()),
            ProtectedSet::new(config.protected_apps.iter().cloned()),
            generator,
        )
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn patcher(&self) -> &SourcePatcher {
        &self.patcher
    }

    pub fn protected(&self) -> &ProtectedSet {
        &self.protected
    }

    /// Run `op` holding the slug's lock. The map entry is dropped afterwards unless another
    /// caller still holds or awaits it.
    async fn with_slug_lock<T>(&self, slug: &str, op: impl Future<Output = T>) -> T {
        let lock = self
            .slug_locks
            .entry(slug.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let out = {
            let _guard = lock.lock().await;
            op.await
        };
        drop(lock);
        self.slug_locks.remove_if(slug, |_, l| Arc::strong_count(l) == 1);
        out
    }

    #[cfg(test)]
    fn slug_lock_count(&self) -> usize {
        self.slug_locks.len()
    }

    /// Slug taken from a URL or request body: must already be normalized and not protected.
    fn check_mutable(&self, slug: &str) -> HubResult<()> {
        if !slug::is_valid(slug) {
            return Err(HubError::InvalidInput(format!("'{slug}' is not a valid app slug.")));
        }
        if self.protected.contains(slug) {
            return Err(HubError::Forbidden(slug.to_string()));
        }
        Ok(())
    }

    fn bundle_from_name(&self, name: &str, files: BundleFiles) -> HubResult<AppBundle> {
        let bundle = AppBundle::from_name(name, files)?;
        if self.protected.contains(&bundle.slug) {
            return Err(HubError::Forbidden(bundle.slug));
        }
        Ok(bundle)
    }

    /// Write a new app and mount it. Requires all four files.
    pub async fn create(&self, name: &str, files: BundleFiles) -> HubResult<CreateOutcome> {
        let AppBundle { slug, files, .. } = self.bundle_from_name(name, files)?;
        require_complete(&slug, &files)?;

        self.with_slug_lock(&slug, async {
            self.store.create(&slug, &files).await?;
            if let Err(e) = self.patcher.mount(&slug).await {
                error!(target: "minihub::lifecycle", slug = %slug, error = %e, "files written but mount failed");
                return Err(HubError::PartiallyApplied {
                    slug: slug.clone(),
                    completed: "files written",
                    step: "registration",
                    source: Box::new(e),
                });
            }
            Ok(())
        })
        .await?;

        info!(target: "minihub::lifecycle", slug = %slug, "app created");
        Ok(CreateOutcome {
            message: format!("App '{slug}' created successfully! Visit your new app at /{slug}"),
            slug,
        })
    }

    /// Create from reviewed generated files (same rules as [`create`](Self::create)).
    pub async fn mount_generated(&self, name: &str, files: BundleFiles) -> HubResult<CreateOutcome> {
        self.create(name, files).await
    }

    pub async fn read(&self, slug: &str) -> HubResult<BundleFiles> {
        self.check_mutable(slug)?;
        self.store.read(slug).await
    }

    /// Overwrite all four files of an existing app. Route prefixes are unchanged, so no patching.
    pub async fn save(&self, slug: &str, files: &BundleFiles) -> HubResult<String> {
        self.check_mutable(slug)?;
        require_complete(slug, files)?;

        self.with_slug_lock(slug, async {
            if !self.store.exists(slug).await {
                return Err(HubError::NotFound(slug.to_string()));
            }
            self.store.update(slug, files).await
        })
        .await?;
        info!(target: "minihub::lifecycle", slug, "app saved");
        Ok(format!(
            "App '{slug}' updated successfully. Restart the backend runtime if routes.js changed."
        ))
    }

    /// Remove the app directory, then its mount block. A missing block is reported, not an error.
    pub async fn delete(&self, slug: &str) -> HubResult<DeleteOutcome> {
        self.check_mutable(slug)?;

        let outcome = self
            .with_slug_lock(slug, async {
                self.store.delete(slug).await?;
                self.patcher.unmount(slug).await.map_err(|e| {
                    error!(target: "minihub::lifecycle", slug, error = %e, "directory removed but unmount failed");
                    HubError::PartiallyApplied {
                        slug: slug.to_string(),
                        completed: "app directory deleted",
                        step: "route removal",
                        source: Box::new(e),
                    }
                })
            })
            .await?;

        let (routes_removed, message) = match outcome {
            UnmountOutcome::Removed => (
                true,
                format!("App '{slug}' and its routes have been deleted."),
            ),
            UnmountOutcome::NotFound => {
                warn!(target: "minihub::lifecycle", slug, "deleted app had no mount block");
                (
                    false,
                    format!("App '{slug}' directory deleted, but no corresponding routes were found in the entry point."),
                )
            }
        };
        info!(target: "minihub::lifecycle", slug, routes_removed, "app deleted");
        Ok(DeleteOutcome {
            slug: slug.to_string(),
            routes_removed,
            message,
        })
    }

    /// Manageable apps (protected ones excluded). Order unspecified.
    pub async fn list(&self) -> HubResult<Vec<String>> {
        self.store.list(&self.protected).await
    }

    /// Ask the generator for a new app and parse the reply. Nothing is written.
    pub async fn generate_create(&self, name: &str, req: GenerationRequest<'_>) -> HubResult<GeneratedBundle> {
        let slug = self.bundle_from_name(name, BundleFiles::default())?.slug;
        if req.user_request.trim().is_empty() {
            return Err(HubError::InvalidInput(format!("App '{slug}': a description of the app is required.")));
        }
        let prompt = prompts::app_create_prompt(name.trim(), &slug, req.user_request);
        let raw = self.generator.generate(req.provider, req.model, &prompt).await?;
        let parsed = ai_parser::parse(&raw);
        log_parse(&slug, &parsed);
        Ok(GeneratedBundle { slug, parsed })
    }

    /// Ask the generator to modify an existing app. The result is a preview; commit it with [`save`](Self::save).
    pub async fn generate_edit(&self, slug: &str, req: GenerationRequest<'_>) -> HubResult<GeneratedBundle> {
        self.check_mutable(slug)?;
        if req.user_request.trim().is_empty() {
            return Err(HubError::InvalidInput(format!("App '{slug}': a change request is required.")));
        }
        let current = self.store.read(slug).await?;
        let prompt = prompts::app_edit_prompt(slug, req.user_request, &current);
        let raw = self.generator.generate(req.provider, req.model, &prompt).await?;
        let parsed = ai_parser::parse(&raw);
        log_parse(slug, &parsed);
        Ok(GeneratedBundle {
            slug: slug.to_string(),
            parsed,
        })
    }

    /// Render the app's files as one context document and store it next to the bundle.
    pub async fn build_context(&self, slug: &str) -> HubResult<ContextOutcome> {
        self.check_mutable(slug)?;
        let files = self.store.read(slug).await?;
        let context = prompts::app_context_document(slug, &files);
        let path = self.store.write_context(slug, &context).await?;
        Ok(ContextOutcome {
            slug: slug.to_string(),
            path,
            context,
        })
    }

    pub async fn list_models(&self, provider: Provider) -> HubResult<Vec<ModelInfo>> {
        self.generator.list_models(provider).await
    }

    /// Current mount registry as read from the entry point.
    pub async fn snapshot(&self) -> HubResult<MountSnapshot> {
        self.patcher.snapshot().await
    }
}

fn require_complete(slug: &str, files: &BundleFiles) -> HubResult<()> {
    let missing = files.missing();
    if missing.is_empty() {
        return Ok(());
    }
    let names: Vec<&str> = missing.iter().map(|k| k.file_name()).collect();
    Err(HubError::InvalidInput(format!(
        "App '{slug}' is missing required files: {}",
        names.join(", ")
    )))
}

fn log_parse(slug: &str, parsed: &ParsedBundle) {
    let missing: Vec<FileKind> = parsed.missing();
    if missing.is_empty() {
        info!(target: "minihub::lifecycle", slug, "generated bundle complete");
    } else {
        warn!(target: "minihub::lifecycle", slug, ?missing, "generated bundle incomplete");
    }
}
