//! unqud is a grid-accelerated incremental clustering engine for
//! weighted 2D point features. It reduces dense point datasets to a
//! display-ready set of cluster markers while keeping each marker
//! within roughly one grid cell of the points it stands for.
//!
//! Feed features one at a time into a [`ClusterAssembler`], run the
//! two-pass fix-up once ingestion is complete, then read the final
//! clusters. Features should be presented in a fixed order (sorted by
//! value) for bit-reproducible output across runs.

// Module declarations
pub mod error;
pub mod types;
pub mod config;
pub mod cluster;

// Re-exports
pub use error::{Error, Result};
pub use types::{Extent, Feature, Point};
pub use cluster::{Cluster, ClusterAssembler, FeatureDivergence, GridIndex};

// Re-export the config from config module
pub use config::UnqudConfig;
