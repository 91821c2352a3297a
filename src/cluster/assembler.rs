// src/cluster/assembler.rs
use log::{debug, log_enabled, Level};

use crate::cluster::aggregate::Cluster;
use crate::cluster::grid::GridIndex;
use crate::config::subsystems::cluster::ClusterConfig;
use crate::error::{Error, Result};
use crate::types::{Extent, Feature, Point};

/// Assembles the clustering. Features need to be sorted by value for
/// clusters to be repeatable across the same set of features: the
/// centroid is a running weighted mean, so merge order affects
/// floating-point rounding.
///
/// Calling contract: feed every feature through [`add_feature`], then
/// call [`fix_clusters`] once, then read [`clusters`]. There is no way
/// back from the fixed-up state and no concurrent use; one logical
/// writer owns the assembler for its whole lifetime.
///
/// [`add_feature`]: ClusterAssembler::add_feature
/// [`fix_clusters`]: ClusterAssembler::fix_clusters
/// [`clusters`]: ClusterAssembler::clusters
#[derive(Debug)]
pub struct ClusterAssembler {
    map_units_per_pixel: f64,
    cluster_distance_in_pixels: f64,
    grid: GridIndex,
    clusters: Vec<Cluster>,
    num_features: u64,
}

/// One divergent member found by [`ClusterAssembler::examine_cluster`]:
/// a feature that is no longer closest to the cluster holding it.
/// Distances are in pixel units.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDivergence {
    pub feature_index: usize,
    pub pixel_distance: f64,
    pub closer_cluster: Option<usize>,
    pub closer_pixel_distance: Option<f64>,
}

impl ClusterAssembler {
    /// Builds an assembler over `extent` with a grid cell width of
    /// `map_units_per_pixel * cluster_distance_in_pixels`.
    pub fn new(
        map_units_per_pixel: f64,
        cluster_distance_in_pixels: f64,
        extent: Extent,
    ) -> Result<Self> {
        if map_units_per_pixel <= 0.0 {
            return Err(Error::config(format!(
                "map_units_per_pixel must be positive, got {}",
                map_units_per_pixel
            )));
        }
        if cluster_distance_in_pixels <= 0.0 {
            return Err(Error::config(format!(
                "cluster_distance_in_pixels must be positive, got {}",
                cluster_distance_in_pixels
            )));
        }
        let cell_size = map_units_per_pixel * cluster_distance_in_pixels;
        Ok(ClusterAssembler {
            map_units_per_pixel,
            cluster_distance_in_pixels,
            grid: GridIndex::new(extent, cell_size),
            clusters: Vec::new(),
            num_features: 0,
        })
    }

    pub fn from_config(config: &ClusterConfig) -> Result<Self> {
        Self::new(
            config.map_units_per_pixel,
            config.cluster_distance_in_pixels,
            config.extent()?,
        )
    }

    /// All clusters created so far, in creation order. Clusters are
    /// never deleted, even when a fix-up pass drains one to zero
    /// weight.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Number of features ingested so far.
    pub fn number_of_features(&self) -> u64 {
        self.num_features
    }

    pub fn cell_size(&self) -> f64 {
        self.grid.cell_size()
    }

    pub fn cluster_distance_in_pixels(&self) -> f64 {
        self.cluster_distance_in_pixels
    }

    /// Ingests one feature: merge into the closest cluster within one
    /// cell width, or start a new singleton cluster. Non-positive
    /// weights are rejected before any centroid math runs.
    pub fn add_feature(&mut self, feature: Feature) -> Result<()> {
        if feature.value <= 0.0 {
            return Err(Error::InvalidWeight(feature.value));
        }
        self.num_features += 1;
        match self.grid.closest(&feature.point, &self.clusters) {
            Some(index) => self.add_feature_to_cluster(feature, index)?,
            None => self.create_cluster(feature),
        }

        if log_enabled!(Level::Debug) && self.num_features % 100 == 0 {
            debug!("Added {} cluster features", self.num_features);
        }
        Ok(())
    }

    /// Gets the closest cluster within the cell distance of a point.
    pub fn closest_cluster(&self, point: &Point) -> Option<&Cluster> {
        self.grid
            .closest(point, &self.clusters)
            .map(|index| &self.clusters[index])
    }

    /// Runs the stabilization logic exactly twice. Two fixed passes
    /// resolve most, not necessarily all, misassignments; no further
    /// iteration happens regardless of whether a pass moved anything.
    pub fn fix_clusters(&mut self) -> Result<()> {
        for index in 0..self.clusters.len() {
            self.fix_cluster(index)?;
        }
        for index in 0..self.clusters.len() {
            self.fix_cluster(index)?;
        }
        Ok(())
    }

    /// Rebuilds the grid from scratch, registering every cluster under
    /// its 3x3 neighborhood.
    pub fn rebuild_grid(&mut self) {
        self.grid.clear();
        for (index, cluster) in self.clusters.iter().enumerate() {
            self.grid.insert_neighborhood(index, cluster.point());
        }
    }

    /// Examines a cluster and reports every member feature that is no
    /// longer closest to it, with distances converted to pixels for
    /// observability. Alters no cluster or grid state.
    pub fn examine_cluster(&self, index: usize) -> Vec<FeatureDivergence> {
        let cluster = &self.clusters[index];
        let mut divergences = Vec::new();
        for (feature_index, feature) in cluster.features().iter().enumerate() {
            let closest = self.grid.closest(&feature.point, &self.clusters);
            if closest == Some(index) {
                continue;
            }
            let pixel_distance =
                cluster.point().distance(&feature.point) / self.map_units_per_pixel;
            let closer_pixel_distance = closest.map(|other| {
                self.clusters[other].point().distance(&feature.point) / self.map_units_per_pixel
            });
            debug!(
                "cluster {}: member {} is not closest (distance {:.1} px, closer: {:?})",
                index, feature_index, pixel_distance, closest
            );
            divergences.push(FeatureDivergence {
                feature_index,
                pixel_distance,
                closer_cluster: closest,
                closer_pixel_distance,
            });
        }
        divergences
    }

    // Merge path: the centroid is about to move, so the cluster leaves
    // the grid at its pre-merge position and comes back under the
    // single cell containing the new one.
    fn add_feature_to_cluster(&mut self, feature: Feature, index: usize) -> Result<()> {
        let old_point = *self.clusters[index].point();
        self.grid.remove(index, &old_point);
        self.clusters[index].add_feature(feature)?;
        let new_point = *self.clusters[index].point();
        self.grid.insert(index, &new_point);
        Ok(())
    }

    fn create_cluster(&mut self, feature: Feature) {
        let cluster = Cluster::new(feature);
        let index = self.clusters.len();
        self.grid.insert(index, cluster.point());
        self.clusters.push(cluster);
    }

    // One stabilization step over one cluster: walk members in reverse
    // insertion order and hand each one to its current closest cluster
    // when that differs from the holder. The drained holder is
    // re-registered under its 3x3 neighborhood; no prior grid removal
    // happens here, matching the original engine.
    fn fix_cluster(&mut self, index: usize) -> Result<()> {
        for k in (0..self.clusters[index].features().len()).rev() {
            let feature = self.clusters[index].features()[k];

            let closest = self.grid.closest(&feature.point, &self.clusters);
            let Some(target) = closest else {
                continue;
            };
            if target == index {
                continue;
            }

            let pt_count = feature.value;
            let feature = self.clusters[index].detach_feature(k);
            if self.clusters[index].value() > 0.0 {
                let point = *self.clusters[index].point();
                self.grid.insert_neighborhood(index, &point);
            }
            self.clusters[target].add_point_cluster(feature, pt_count)?;
        }
        Ok(())
    }
}
