//! minihub-core: app bundles, the entry-point mount registry, generated-bundle parsing and
//! the lifecycle operations behind the app builder, manager and studio.
//!
//! The set of mounted apps lives in the host entry-point source itself: mounting inserts a
//! tagged block before a sentinel comment, unmounting removes it, and the registry is a scan
//! of that text.

mod ai_parser;
mod bundle;
mod config;
mod error;
mod file_store;
mod generation;
mod lifecycle;
mod registry;
mod source_patcher;
pub mod prompts;
pub mod slug;

pub use ai_parser::{parse as parse_generated_bundle, render as render_bundle};
pub use bundle::{AppBundle, BundleFiles, FileKind, ParsedBundle};
pub use config::{GenerationConfig, HostConfig, DEFAULT_MOUNT_MARKER};
pub use error::{HubError, HubResult};
pub use file_store::{FileStore, CONTEXT_FILE_NAME};
pub use generation::{GenerationClient, ModelInfo, Provider, TextGenerator};
pub use lifecycle::{
    AppLifecycle, ContextOutcome, CreateOutcome, DeleteOutcome, GeneratedBundle, GenerationRequest,
};
pub use registry::{is_mounted, scan as scan_mounts, MountEntry, MountSnapshot, ProtectedSet};
pub use source_patcher::{render_block, SourcePatcher, UnmountOutcome};
