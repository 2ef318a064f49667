//! Heuristic elevation model for coordinates without tile coverage.
//!
//! The catalog is intentionally coarse: a handful of named regions with
//! either surveyed anchor points (blended by inverse-distance
//! weighting) or a closed-form surface, and sea level everywhere else.
//! It exists so terrain-clearance checks always get a finite answer
//! when no tile file covers a position, not to compete with real data.

use geo::geometry::Coord;
use log::trace;

/// Geographic bounding box in degrees, edges inclusive.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl Bounds {
    fn contains(&self, coord: Coord<f64>) -> bool {
        coord.y >= self.min_lat
            && coord.y <= self.max_lat
            && coord.x >= self.min_lon
            && coord.x <= self.max_lon
    }
}

/// A surveyed reference point inside a region.
struct Anchor {
    lat: f64,
    lon: f64,
    /// Elevation in meters.
    elevation: f64,
}

enum Surface {
    /// Inverse-distance-weighted blend of surveyed points.
    Anchors(&'static [Anchor]),
    /// Closed-form elevation as a function of (lat, lon).
    Analytic(fn(f64, f64) -> f64),
}

struct Region {
    name: &'static str,
    bounds: Bounds,
    surface: Surface,
}

// Ramps from ~350 m near the 96th meridian up to ~1500 m at the foot of
// the Rockies.
fn great_plains(_lat: f64, lon: f64) -> f64 {
    350.0 + (-96.0 - lon) * 145.0
}

/// First match wins, so more specific regions come before larger ones.
static REGIONS: &[Region] = &[
    Region {
        name: "Sierra Nevada",
        bounds: Bounds {
            min_lat: 35.5,
            max_lat: 40.0,
            min_lon: -120.5,
            max_lon: -117.5,
        },
        surface: Surface::Anchors(&[
            Anchor { lat: 36.578, lon: -118.292, elevation: 4421.0 }, // Mt Whitney
            Anchor { lat: 37.746, lon: -119.533, elevation: 2695.0 }, // Half Dome
            Anchor { lat: 38.898, lon: -120.000, elevation: 2280.0 }, // Tahoe rim
            Anchor { lat: 35.7, lon: -118.5, elevation: 1100.0 },     // Kern plateau edge
        ]),
    },
    Region {
        name: "Cascade Range",
        bounds: Bounds {
            min_lat: 43.5,
            max_lat: 49.0,
            min_lon: -122.5,
            max_lon: -120.0,
        },
        surface: Surface::Anchors(&[
            Anchor { lat: 46.852, lon: -121.760, elevation: 4392.0 }, // Mt Rainier
            Anchor { lat: 45.374, lon: -121.696, elevation: 3429.0 }, // Mt Hood
            Anchor { lat: 48.777, lon: -121.813, elevation: 3286.0 }, // Mt Baker
            Anchor { lat: 47.0, lon: -120.6, elevation: 500.0 },      // Kittitas valley
        ]),
    },
    Region {
        name: "Rocky Mountains",
        bounds: Bounds {
            min_lat: 35.0,
            max_lat: 49.0,
            min_lon: -111.0,
            max_lon: -104.5,
        },
        surface: Surface::Anchors(&[
            Anchor { lat: 39.118, lon: -106.445, elevation: 4401.0 }, // Mt Elbert
            Anchor { lat: 38.841, lon: -105.044, elevation: 4302.0 }, // Pikes Peak
            Anchor { lat: 44.6, lon: -110.5, elevation: 2400.0 },     // Yellowstone plateau
            Anchor { lat: 40.0, lon: -105.3, elevation: 1800.0 },     // Front Range foothills
        ]),
    },
    Region {
        name: "Appalachians",
        bounds: Bounds {
            min_lat: 34.0,
            max_lat: 45.0,
            min_lon: -84.5,
            max_lon: -70.0,
        },
        surface: Surface::Anchors(&[
            Anchor { lat: 35.765, lon: -82.265, elevation: 2037.0 }, // Mt Mitchell
            Anchor { lat: 44.270, lon: -71.303, elevation: 1917.0 }, // Mt Washington
            Anchor { lat: 35.563, lon: -83.499, elevation: 2025.0 }, // Clingmans Dome
            Anchor { lat: 40.0, lon: -77.5, elevation: 400.0 },      // ridge-and-valley floor
        ]),
    },
    Region {
        name: "Great Plains",
        bounds: Bounds {
            min_lat: 33.0,
            max_lat: 49.0,
            min_lon: -104.0,
            max_lon: -96.0,
        },
        surface: Surface::Analytic(great_plains),
    },
    Region {
        name: "Alps",
        bounds: Bounds {
            min_lat: 44.0,
            max_lat: 48.0,
            min_lon: 5.0,
            max_lon: 16.0,
        },
        surface: Surface::Anchors(&[
            Anchor { lat: 45.833, lon: 6.865, elevation: 4808.0 },  // Mont Blanc
            Anchor { lat: 45.976, lon: 7.658, elevation: 4478.0 },  // Matterhorn
            Anchor { lat: 47.074, lon: 12.694, elevation: 3798.0 }, // Grossglockner
            Anchor { lat: 46.5, lon: 13.8, elevation: 800.0 },      // Carinthian valleys
        ]),
    },
    Region {
        name: "Himalaya",
        bounds: Bounds {
            min_lat: 26.0,
            max_lat: 37.0,
            min_lon: 73.0,
            max_lon: 95.0,
        },
        surface: Surface::Anchors(&[
            Anchor { lat: 27.988, lon: 86.925, elevation: 8849.0 }, // Everest
            Anchor { lat: 35.881, lon: 76.513, elevation: 8611.0 }, // K2
            Anchor { lat: 28.596, lon: 83.820, elevation: 8091.0 }, // Annapurna
            Anchor { lat: 27.717, lon: 85.324, elevation: 1400.0 }, // Kathmandu valley
            Anchor { lat: 29.650, lon: 91.117, elevation: 3656.0 }, // Lhasa
        ]),
    },
    Region {
        name: "Andes",
        bounds: Bounds {
            min_lat: -50.0,
            max_lat: 5.0,
            min_lon: -79.0,
            max_lon: -64.0,
        },
        surface: Surface::Anchors(&[
            Anchor { lat: -32.653, lon: -70.011, elevation: 6961.0 }, // Aconcagua
            Anchor { lat: -1.469, lon: -78.817, elevation: 6263.0 },  // Chimborazo
            Anchor { lat: -16.5, lon: -68.15, elevation: 3640.0 },    // La Paz
            Anchor { lat: -45.0, lon: -72.5, elevation: 1500.0 },     // Patagonian Andes
        ]),
    },
    // Above the tile dataset's 60° latitude limit, so the model is the
    // only source of terrain here.
    Region {
        name: "Alaska Range",
        bounds: Bounds {
            min_lat: 61.0,
            max_lat: 64.5,
            min_lon: -153.5,
            max_lon: -147.0,
        },
        surface: Surface::Anchors(&[
            Anchor { lat: 63.069, lon: -151.007, elevation: 6190.0 }, // Denali
            Anchor { lat: 62.961, lon: -151.400, elevation: 5304.0 }, // Mt Foraker
            Anchor { lat: 62.320, lon: -150.100, elevation: 107.0 },  // Talkeetna
        ]),
    },
    Region {
        name: "Scandes",
        bounds: Bounds {
            min_lat: 59.0,
            max_lat: 70.0,
            min_lon: 5.0,
            max_lon: 20.0,
        },
        surface: Surface::Anchors(&[
            Anchor { lat: 61.636, lon: 8.313, elevation: 2469.0 },  // Galdhopiggen
            Anchor { lat: 67.900, lon: 18.530, elevation: 2097.0 }, // Kebnekaise
            Anchor { lat: 63.430, lon: 10.400, elevation: 50.0 },   // Trondheim fjord
        ]),
    },
];

/// Named water bodies large enough to matter for ditching decisions.
static WATER_BODIES: &[(&str, Bounds)] = &[
    ("Lake Superior", Bounds { min_lat: 46.4, max_lat: 48.9, min_lon: -92.1, max_lon: -84.4 }),
    ("Lake Michigan", Bounds { min_lat: 41.6, max_lat: 46.0, min_lon: -87.9, max_lon: -85.0 }),
    ("Lake Huron", Bounds { min_lat: 43.0, max_lat: 46.3, min_lon: -84.9, max_lon: -79.7 }),
    ("Lake Erie", Bounds { min_lat: 41.4, max_lat: 42.9, min_lon: -83.5, max_lon: -78.9 }),
    ("Lake Ontario", Bounds { min_lat: 43.2, max_lat: 44.2, min_lon: -79.8, max_lon: -76.1 }),
    ("Great Salt Lake", Bounds { min_lat: 40.7, max_lat: 41.7, min_lon: -113.1, max_lon: -112.0 }),
    ("Caspian Sea", Bounds { min_lat: 36.5, max_lat: 47.1, min_lon: 46.5, max_lon: 54.8 }),
    ("Gulf of Mexico", Bounds { min_lat: 18.5, max_lat: 29.5, min_lon: -97.5, max_lon: -82.0 }),
];

/// Longitude bands that are overwhelmingly open ocean. A low estimate
/// inside one of these is classified as water. Low-lying coastal land
/// and islands in these bands will misclassify; the heuristic is
/// deliberately approximate.
static MARITIME_LON_BANDS: &[(f64, f64)] = &[
    (-180.0, -132.0), // central/eastern Pacific
    (-38.0, -20.0),   // mid-Atlantic
    (168.0, 180.0),   // western Pacific
];

/// Estimates below this count as water inside maritime bands.
const WATER_ELEVATION_THRESHOLD_M: f64 = 5.0;

/// Keeps anchor weights finite when a query lands on an anchor;
/// roughly a 100 m radius in squared degrees.
const MIN_DIST_SQ: f64 = 1e-6;

/// Inverse-distance-squared blend of a region's anchors.
fn idw(anchors: &[Anchor], coord: Coord<f64>) -> f64 {
    let mut weighted = 0.0;
    let mut total = 0.0;
    for anchor in anchors {
        let d2 = ((coord.y - anchor.lat).powi(2) + (coord.x - anchor.lon).powi(2))
            .max(MIN_DIST_SQ);
        let w = 1.0 / d2;
        weighted += w * anchor.elevation;
        total += w;
    }
    if total > 0.0 {
        weighted / total
    } else {
        0.0
    }
}

/// Terminal elevation fallback over a static region catalog.
///
/// Pure and lock-free; safe to call from any thread.
pub struct RegionModel {
    regions: &'static [Region],
    water: &'static [(&'static str, Bounds)],
}

impl Default for RegionModel {
    fn default() -> Self {
        Self {
            regions: REGIONS,
            water: WATER_BODIES,
        }
    }
}

impl RegionModel {
    /// Heuristic elevation in meters. Always finite; sea level when no
    /// region matches.
    pub fn estimate(&self, coord: Coord<f64>) -> f64 {
        for region in self.regions {
            if region.bounds.contains(coord) {
                let meters = match region.surface {
                    Surface::Anchors(anchors) => idw(anchors, coord),
                    Surface::Analytic(surface) => surface(coord.y, coord.x),
                };
                trace!("fallback region {} -> {meters:.0} m", region.name);
                return meters;
            }
        }
        0.0
    }

    /// True if `coord` is over a known water body, or estimates near
    /// sea level inside a maritime longitude band.
    pub fn is_water_body(&self, coord: Coord<f64>) -> bool {
        if let Some((name, _)) = self.water.iter().find(|(_, b)| b.contains(coord)) {
            trace!("{coord:?} is within {name}");
            return true;
        }
        let maritime = MARITIME_LON_BANDS
            .iter()
            .any(|(west, east)| coord.x >= *west && coord.x < *east);
        maritime && self.estimate(coord) < WATER_ELEVATION_THRESHOLD_M
    }
}

#[cfg(test)]
mod tests {
    use super::{Coord, RegionModel};

    #[test]
    fn test_estimate_is_always_finite() {
        let model = RegionModel::default();
        for lat10 in (-900..=900).step_by(55) {
            for lon10 in (-1800..1800).step_by(75) {
                let coord = Coord {
                    x: f64::from(lon10) / 10.0,
                    y: f64::from(lat10) / 10.0,
                };
                let meters = model.estimate(coord);
                assert!(meters.is_finite(), "non-finite estimate at {coord:?}");
            }
        }
    }

    #[test]
    fn test_mountain_regions_estimate_high() {
        let model = RegionModel::default();
        // Near Mt Whitney.
        assert!(model.estimate(Coord { x: -118.3, y: 36.6 }) > 3000.0);
        // Near Everest.
        assert!(model.estimate(Coord { x: 86.9, y: 28.0 }) > 5000.0);
        // Denali sits above the tile dataset's latitude limit.
        assert!(model.estimate(Coord { x: -151.0, y: 63.1 }) > 4000.0);
    }

    #[test]
    fn test_anchor_exact_hit_returns_anchor_elevation() {
        let model = RegionModel::default();
        let meters = model.estimate(Coord { x: -118.292, y: 36.578 });
        // Distance floor keeps this from blowing up and the nearest
        // anchor dominates.
        assert!((meters - 4421.0).abs() < 10.0);
    }

    #[test]
    fn test_plains_ramp_west() {
        let model = RegionModel::default();
        let east = model.estimate(Coord { x: -96.5, y: 40.0 });
        let west = model.estimate(Coord { x: -103.5, y: 40.0 });
        assert!(west > east);
        assert!(east > 300.0 && west < 1600.0);
    }

    #[test]
    fn test_unlisted_coordinates_are_sea_level() {
        let model = RegionModel::default();
        assert_eq!(model.estimate(Coord { x: -150.0, y: 10.0 }), 0.0);
        assert_eq!(model.estimate(Coord { x: 2.0, y: -35.0 }), 0.0);
    }

    #[test]
    fn test_water_bodies() {
        let model = RegionModel::default();
        // Middle of Lake Superior.
        assert!(model.is_water_body(Coord { x: -87.5, y: 47.7 }));
        // Mid-Pacific with a sea-level estimate.
        assert!(model.is_water_body(Coord { x: -150.0, y: 10.0 }));
        // Kansas: dry land outside every maritime band.
        assert!(!model.is_water_body(Coord { x: -98.0, y: 38.5 }));
        // High terrain inside a maritime band is not water.
        assert!(!model.is_water_body(Coord { x: -151.0, y: 63.1 }));
    }
}
