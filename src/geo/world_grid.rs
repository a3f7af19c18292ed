//! Fixed world-grid sharding for tile output directories.
//!
//! Tiles are binned into the 36x18 sinusoidal grid used by the upstream
//! imagery products, so that a day's output for one region lands in one
//! directory. Cells are 10 degrees of longitude wide at the equator and are
//! addressed `h00`..`h35` west to east and `v00`..`v17` north to south.

use std::fmt;

/// Authalic sphere radius of the sinusoidal projection, in meters.
const SPHERE_RADIUS_M: f64 = 6_371_007.181;

const GRID_COLS: u32 = 36;
const GRID_ROWS: u32 = 18;

/// One cell of the world sharding grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub h: u32,
    pub v: u32,
}

impl GridCell {
    /// Cell containing a geographic point, from its latitude and longitude in
    /// degrees. Points outside the projection's valid area clamp to the edge
    /// cells.
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        // Forward sinusoidal projection
        let x = SPHERE_RADIUS_M * lon.to_radians() * lat.to_radians().cos();
        let y = SPHERE_RADIUS_M * lat.to_radians();

        let earth_width = 2.0 * std::f64::consts::PI * SPHERE_RADIUS_M;
        let cell_width = earth_width / GRID_COLS as f64;

        let h = ((earth_width / 2.0 + x) / cell_width).floor();
        let v = ((earth_width / 4.0 - y) / cell_width).floor();

        Self {
            h: (h.max(0.0) as u32).min(GRID_COLS - 1),
            v: (v.max(0.0) as u32).min(GRID_ROWS - 1),
        }
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{:02}v{:02}", self.h, self.v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_cell() {
        // (0, 0) sits just east of the antimeridian column boundary and just
        // south of the equator row boundary
        assert_eq!(GridCell::from_lat_lon(0.0, 0.0), GridCell { h: 18, v: 9 });
    }

    #[test]
    fn test_display_zero_pads() {
        assert_eq!(GridCell { h: 8, v: 5 }.to_string(), "h08v05");
        assert_eq!(GridCell { h: 35, v: 17 }.to_string(), "h35v17");
    }

    #[test]
    fn test_northern_hemisphere_has_lower_v() {
        let north = GridCell::from_lat_lon(45.0, 0.0);
        let south = GridCell::from_lat_lon(-45.0, 0.0);
        assert!(north.v < south.v);
    }

    #[test]
    fn test_poles_clamp_to_grid() {
        let np = GridCell::from_lat_lon(90.0, 0.0);
        let sp = GridCell::from_lat_lon(-90.0, 0.0);
        assert!(np.v <= GRID_ROWS - 1);
        assert_eq!(sp.v, GRID_ROWS - 1);
    }

    #[test]
    fn test_longitude_shrinks_toward_poles() {
        // At 60N the cosine factor halves x, pulling cells toward the center
        let equator = GridCell::from_lat_lon(0.0, 120.0);
        let high = GridCell::from_lat_lon(60.0, 120.0);
        assert!(high.h < equator.h);
        assert_eq!(equator.h, 30);
    }
}
