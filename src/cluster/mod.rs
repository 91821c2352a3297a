// cluster/mod.rs
pub mod aggregate;
pub mod assembler;
pub mod grid;

// Re-export the main types to maintain a flat public API
pub use self::aggregate::Cluster;
pub use self::assembler::{ClusterAssembler, FeatureDivergence};
pub use self::grid::GridIndex;
