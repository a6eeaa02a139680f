//! Reference height under the vehicle.
//!
//! The blade's working depth is measured from the mean elevation of a
//! rectangle that travels and turns with the vehicle. The mean stands in for a
//! best-fit ground plane.

use crate::agent::rotate;
use crate::terrain::TerrainField;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Footprint {
    /// Extent along the heading, centred on the vehicle.
    pub length: usize,
    /// Lateral extent, centred on the vehicle.
    pub width: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FootprintSample {
    pub avg_height: f32,
    pub samples: usize,
}

impl Footprint {
    pub fn new(length: usize, width: usize) -> Self {
        Self { length, width }
    }

    /// Mean height over the rotated rectangle at `position`, heading `theta`.
    /// Samples falling off the grid read the nearest edge cell.
    pub fn sample(&self, field: &TerrainField, position: [f64; 2], theta: f64) -> FootprintSample {
        let half_len = (self.length / 2) as i64;
        let half_width = (self.width / 2) as i64;
        let mut sum = 0.0f64;
        let mut samples = 0usize;
        for forward in -half_len..(self.length as i64 - half_len) {
            for lateral in -half_width..(self.width as i64 - half_width) {
                let offset = rotate([lateral as f64, forward as f64], theta);
                sum += field.sample(position[0] + offset[0], position[1] + offset[1]) as f64;
                samples += 1;
            }
        }
        let avg_height = if samples == 0 {
            field.sample(position[0], position[1])
        } else {
            (sum / samples as f64) as f32
        };
        FootprintSample {
            avg_height,
            samples,
        }
    }
}
