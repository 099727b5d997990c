//! # Itemforge
//!
//! Profile-driven import and validation of LLM-generated game item definitions.
//!
//! ## Architecture Overview
//!
//! An external generator process writes one JSON array of item objects per batch.
//! Itemforge turns that file into persisted, type-tagged records without any
//! compile-time knowledge of the item's field set:
//!
//! - **Schema**: [`FieldSchema`] and [`Profile`] describe an item type at runtime
//! - **Tokenizer**: depth and quote aware splitting of arrays and flat objects
//! - **Records**: [`DynamicRecord`] holds raw values with explicit coercion
//! - **Validation**: per-field, cross-field and identity checks against a profile
//! - **Import**: the batch pipeline that isolates per-item failures
//! - **Generator**: the subprocess boundary to the external generator
//!
//! All shared state lives in an explicitly constructed [`PipelineContext`].

pub mod context;
pub mod generator;
pub mod import;
pub mod record;
pub mod schema;
pub mod settings;
pub mod tokenizer;
pub mod validation;

pub use context::*;
pub use generator::*;
pub use import::*;
pub use record::*;
pub use schema::*;
pub use settings::*;
pub use tokenizer::*;
pub use validation::*;

use std::path::PathBuf;

/// Core error type for the item pipeline.
#[derive(thiserror::Error, Debug)]
pub enum ForgeError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// An input file does not exist
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// No profile with the requested id is known
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// A profile breaks one of its structural invariants
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// A record lacks a required identity field
    #[error("Missing identity field: {0}")]
    MissingIdentity(String),

    /// A stored value could not be coerced to the requested type
    #[error("Coercion error: {0}")]
    Coerce(#[from] CoerceError),

    /// Output could not be written to the asset store
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The external generator process failed
    #[error("Generator failed: {0}")]
    GeneratorFailed(String),

    /// The operation was cancelled by the user
    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type used throughout the Itemforge codebase.
pub type ForgeResult<T> = Result<T, ForgeError>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Pipeline configuration constants.
pub mod config {
    /// Default directory holding one JSON file per profile
    pub const DEFAULT_PROFILES_DIR: &str = "profiles";

    /// Default root directory for imported item assets
    pub const DEFAULT_OUTPUT_ROOT: &str = "generated_items";

    /// File extension used for persisted assets and profiles
    pub const ASSET_EXTENSION: &str = "json";

    /// Default generator executable name
    pub const DEFAULT_GENERATOR_PATH: &str = "item-generator";

    /// Default LLM model requested from the generator
    pub const DEFAULT_MODEL: &str = "default";

    /// Default number of items requested per generation batch
    pub const DEFAULT_ITEM_COUNT: u32 = 10;

    /// Default configuration file looked up by the CLI
    pub const DEFAULT_SETTINGS_FILE: &str = "itemforge.json";
}
