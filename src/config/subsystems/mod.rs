pub mod cluster;

pub use cluster::ClusterConfig;
