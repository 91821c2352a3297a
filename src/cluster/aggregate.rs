// src/cluster/aggregate.rs
use serde::Serialize;

use crate::error::{Error, Result};
use crate::types::{Feature, Point};

/// A cluster aggregate: a running weighted centroid plus the ordered
/// list of member features and their total weight.
///
/// The centroid is maintained incrementally rather than recomputed
/// from scratch, so the order in which features are merged affects
/// floating-point rounding (not the true mathematical result).
/// Callers wanting bit-reproducible output across runs must present
/// features in a fixed order, e.g. sorted by value.
#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    value: f64,
    point: Point,
    features: Vec<Feature>,
}

impl Cluster {
    /// A cluster is created with at least one feature.
    pub fn new(feature: Feature) -> Self {
        Cluster {
            value: feature.value,
            point: feature.point,
            features: vec![feature],
        }
    }

    /// Centroid in map units.
    pub fn point(&self) -> &Point {
        &self.point
    }

    /// Total weight of all member features.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Member features in insertion order. The order matters: the
    /// fix-up pass walks it in reverse.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Merges a feature using its own weight: the running weighted
    /// mean `c' = p*(w/(W+w)) + c*(W/(W+w))`.
    pub fn add_feature(&mut self, feature: Feature) -> Result<()> {
        self.add_point_cluster(feature, feature.value)
    }

    /// Merges a feature carrying an explicitly supplied weight rather
    /// than its own. Used when the fix-up pass transfers a feature
    /// between clusters with its original weight.
    pub fn add_point_cluster(&mut self, feature: Feature, value: f64) -> Result<()> {
        if value <= 0.0 {
            return Err(Error::InvalidWeight(value));
        }
        let count = self.value;
        let p = feature.point;
        self.features.push(feature);

        let ptc = value / (count + value);
        let ctc = count / (count + value);
        self.point.x = p.x * ptc + self.point.x * ctc;
        self.point.y = p.y * ptc + self.point.y * ctc;
        self.value += value;
        Ok(())
    }

    /// Removes the member at `index` and undoes its contribution to
    /// the centroid by inverse weighted subtraction: with old total
    /// `count` and member weight `pt_count`,
    /// `c' = c*(count/new_count) - p*(pt_count/new_count)` where
    /// `new_count = count - pt_count`. If the cluster is drained to
    /// zero (or below, under rounding), the centroid resets to the
    /// origin; the cluster record itself is never deleted.
    pub fn detach_feature(&mut self, index: usize) -> Feature {
        let feature = self.features.remove(index);
        let pt_count = feature.value;
        let count = self.value;
        let new_count = count - pt_count;
        self.value = new_count;
        if new_count > 0.0 {
            let ptc = pt_count / new_count;
            let ctc = count / new_count;
            self.point.x = self.point.x * ctc - feature.point.x * ptc;
            self.point.y = self.point.y * ctc - feature.point.y * ptc;
        } else {
            self.point.x = 0.0;
            self.point.y = 0.0;
        }
        feature
    }
}
