//! edgeplan core: types, geometry, configuration and run artifacts shared
//! by the planner, the analyzer and the CLI.
//!
//! # Components
//!
//! - **`types`** - Node, service and location types
//! - **`geo`** - Distance metrics and S2 cell tokens
//! - **`config`** - `edgeplan.toml` plus the node and service input files
//! - **`artifact`** - Tree artifact and fallback file formats
//! - **`error`** - Input and artifact errors

pub mod artifact;
pub mod config;
pub mod error;
pub mod geo;
pub mod types;

pub use artifact::{CanonicalChain, FallbackRecord};
pub use config::{PlannerConfig, ServiceSpec};
pub use error::{ArtifactError, ArtifactResult, ConfigError, ConfigResult};
pub use types::*;
