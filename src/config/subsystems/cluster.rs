// src/config/subsystems/cluster.rs

use serde::{Serialize, Deserialize};
use crate::error::{Error, Result};
use crate::config::FromIni;
use crate::types::Extent;

/// Grid and distance parameters for the cluster assembler. The cell
/// width of the spatial grid is `map_units_per_pixel *
/// cluster_distance_in_pixels`; the four bounds are the real-world
/// extent every ingested feature is expected to fall within.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub map_units_per_pixel: f64,
    pub cluster_distance_in_pixels: f64,
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            map_units_per_pixel: 1.0,
            cluster_distance_in_pixels: 10.0,
            xmin: 0.0,
            ymin: 0.0,
            xmax: 100.0,
            ymax: 100.0,
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.map_units_per_pixel <= 0.0 {
            return Err(Error::config(format!(
                "map_units_per_pixel must be positive, got {}",
                self.map_units_per_pixel
            )));
        }
        if self.cluster_distance_in_pixels <= 0.0 {
            return Err(Error::config(format!(
                "cluster_distance_in_pixels must be positive, got {}",
                self.cluster_distance_in_pixels
            )));
        }
        self.extent()?;
        Ok(())
    }

    pub fn extent(&self) -> Result<Extent> {
        Extent::new(self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

impl FromIni for ClusterConfig {
    fn from_ini_section(&mut self, _section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        let parse = |value: &str| -> Result<f64> {
            value.trim_matches('"').parse::<f64>().map_err(|e| {
                Error::config(format!("Invalid numeric value '{}': {}", value, e))
            })
        };
        match key {
            "map_units_per_pixel" => Some(parse(value).map(|v| self.map_units_per_pixel = v)),
            "cluster_distance_in_pixels" => {
                Some(parse(value).map(|v| self.cluster_distance_in_pixels = v))
            },
            "xmin" => Some(parse(value).map(|v| self.xmin = v)),
            "ymin" => Some(parse(value).map(|v| self.ymin = v)),
            "xmax" => Some(parse(value).map(|v| self.xmax = v)),
            "ymax" => Some(parse(value).map(|v| self.ymax = v)),
            _ => None,
        }
    }
}
