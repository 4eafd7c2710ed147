//! # objcli
//!
//! **Declarative action/object command lines.** Describe the nouns your tool
//! manages (objects), the verbs it applies to them (actions) and the fields
//! each verb exposes; objcli builds the command tree, works out what an
//! invocation targets and stores what the user typed as keyed records.
//!
//! ## Features
//!
//! - **Action × object commands** - `create repo --title ...` from one declaration
//! - **Context resolution** - `(action, object?, list?)` identified from the selected command
//! - **List flags** - `create repos web,api:API` expands into one record per entry
//! - **Layered values** - object-action, action and application flags, explicit values first
//! - **Late binding** - hooks can extend the model once the context is known
//! - **Pluggable engine** - clap in production, a scripted engine for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use objcli::{ClapEngine, Field, Opts, Registry};
//!
//! let mut registry = Registry::new(ClapEngine::new("forge", "Manage repositories"));
//! registry.new_action("create", "Create things", "Create {object}", false)?;
//!
//! let mut repo = registry.new_object("repo", "a repository")?;
//! repo.add_key(Field::string("name", "Repository name"))?
//!     .add_field(Field::string("title", "Title"))?
//!     .define_actions(&["create"])?
//!     .on_actions(&[])?
//!     .add_arg("name", Opts::new())?
//!     .add_flag("title", Opts::new())?;
//!
//! let argv: Vec<String> = ["create", "repo", "web", "--title", "Website"]
//!     .iter()
//!     .map(|s| s.to_string())
//!     .collect();
//! let outcome = registry.parse(&argv)?;
//! assert_eq!(outcome.context.object(), Some("repo"));
//! assert_eq!(
//!     registry.get_string_value("repo", "web", "title")?,
//!     Some("Website".to_string())
//! );
//! # Ok::<(), objcli::CliError>(())
//! ```
//!
//! ## Model Files
//!
//! The `objcli` binary loads a TOML model (see [`config`]) and prints the
//! parsed context and records as JSON:
//!
//! ```bash
//! objcli --model repos.toml create repos web,api:API
//! ```

// ============================================================================
// Core Modules
// ============================================================================

/// Error types for declaration, value and engine failures.
pub mod error;

/// Clause options (required, default, env var, short name, hidden).
pub mod options;

/// Command-line engine abstraction.
///
/// - [`ClapEngine`](engine::ClapEngine) - clap builder backend
/// - [`MockEngine`](engine::MockEngine) - scripted backend for tests
pub mod engine;

/// Actions, objects, fields, parameters and lists.
pub mod model;

/// Context identification from the selected command chain.
pub mod context;

/// Parsed values: [`RecordStore`](values::RecordStore) and value layers.
pub mod values;

/// The [`Registry`](registry::Registry): declarations, parsing and lookups.
pub mod registry;

/// TOML model files.
pub mod config;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use config::ModelConfig;
pub use context::{Context, ContextState};
pub use engine::{ClapEngine, CliEngine, MockEngine};
pub use error::{CliError, ConfigError, EngineErrorKind, ValueError};
pub use model::{Field, Record, ValueType};
pub use options::Opts;
pub use registry::{ParseOutcome, Registry};
pub use values::{AttrValue, Layer, ParamValue, RecordStore};
