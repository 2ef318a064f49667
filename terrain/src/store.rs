//! Elevation query façade.
//!
//! Combines the bounded tile cache, bilinear tile sampling, and the
//! regional fallback model behind an API that always answers. The
//! consuming safety checks (terrain clearance, minimum safe altitude,
//! ditching) treat these results as authoritative, so no query here
//! ever returns an error: bad input and missing data degrade to
//! documented defaults instead.

use crate::{
    cache::{CacheStats, TileCache, DEFAULT_MAX_TILES},
    fallback::RegionModel,
    math::{linspace, normalize_lon, FEET_PER_METER, METERS_PER_DEGREE, METERS_PER_NM},
    TerrainError,
};
use geo::geometry::Coord;
use log::trace;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    mem::size_of,
    path::PathBuf,
    sync::{Mutex, MutexGuard, PoisonError},
};

/// Tile coverage is limited to this latitude band; at or beyond it the
/// regional model answers directly, without touching the cache.
const TILE_COVERAGE_LAT: f64 = 60.0;

/// Query results clamp to this elevation band, feet.
const MIN_ELEVATION_FT: f64 = -1_500.0;
const MAX_ELEVATION_FT: f64 = 30_000.0;

/// Memoization keys per degree, i.e. 1/120° cells.
const MEMO_KEYS_PER_DEGREE: f64 = 120.0;

/// Cardinal sampling offset for slope estimation, degrees.
const SLOPE_OFFSET_DEG: f64 = 0.001;

/// Slopes steeper than this are flagged.
const STEEP_SLOPE_DEG: f64 = 15.0;

/// Construction parameters, shaped for embedding in a host
/// application's config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory containing `.hgt` tiles. `None` runs fallback-only.
    pub tile_dir: Option<PathBuf>,

    /// Bound on resident tiles.
    pub max_tiles: usize,

    /// Bound on memoized point lookups. 0 disables memoization.
    pub memo_capacity: usize,

    /// Side length of the sampling grid used by
    /// [`ElevationStore::terrain_stats`].
    pub stats_grid: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            tile_dir: None,
            max_tiles: DEFAULT_MAX_TILES,
            memo_capacity: 4096,
            stats_grid: 5,
        }
    }
}

#[derive(Debug, Default)]
pub struct ElevationStoreBuilder {
    config: StoreConfig,
}

impl ElevationStoreBuilder {
    pub fn tile_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.tile_dir = Some(dir.into());
        self
    }

    pub fn max_tiles(mut self, max_tiles: usize) -> Self {
        self.config.max_tiles = max_tiles;
        self
    }

    pub fn memo_capacity(mut self, capacity: usize) -> Self {
        self.config.memo_capacity = capacity;
        self
    }

    pub fn stats_grid(mut self, side: usize) -> Self {
        self.config.stats_grid = side;
        self
    }

    pub fn build(self) -> Result<ElevationStore, TerrainError> {
        ElevationStore::from_config(self.config)
    }
}

/// Min/max/mean elevation over an area, feet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TerrainStats {
    pub min_ft: f64,
    pub max_ft: f64,
    pub avg_ft: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlopeInfo {
    pub angle_deg: f64,
    pub is_steep: bool,
}

/// Quantized point-lookup memoization, in front of the tile cache.
///
/// Same locking discipline as the tile cache, independently.
struct MemoCache {
    map: HashMap<(i32, i32), f64>,
    /// Recency order, least recently used first.
    order: Vec<(i32, i32)>,
    capacity: usize,
}

impl MemoCache {
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: Vec::new(),
            capacity,
        }
    }

    fn key(coord: Coord<f64>) -> (i32, i32) {
        (
            (coord.y * MEMO_KEYS_PER_DEGREE).round() as i32,
            (coord.x * MEMO_KEYS_PER_DEGREE).round() as i32,
        )
    }

    fn get(&mut self, key: (i32, i32)) -> Option<f64> {
        let feet = *self.map.get(&key)?;
        if let Some(pos) = self.order.iter().position(|k| *k == key) {
            self.order.remove(pos);
            self.order.push(key);
        }
        Some(feet)
    }

    fn insert(&mut self, key: (i32, i32), feet: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.map.insert(key, feet).is_some() {
            return;
        }
        while self.map.len() > self.capacity {
            let oldest = self.order.remove(0);
            self.map.remove(&oldest);
        }
        self.order.push(key);
    }

    fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }

    fn mem_size(&self) -> usize {
        self.map.len() * (size_of::<(i32, i32)>() + size_of::<f64>())
    }
}

/// The terrain elevation store.
///
/// One instance owns all cache and configuration state; construct it
/// once and share it (`&` or `Arc`) with every consumer. Queries may
/// arrive concurrently from any thread.
pub struct ElevationStore {
    tiles: TileCache,
    fallback: RegionModel,
    memo: Mutex<MemoCache>,
    stats_grid: usize,
}

impl ElevationStore {
    pub fn builder() -> ElevationStoreBuilder {
        ElevationStoreBuilder::default()
    }

    /// Builds a store from config. The only fallible step is tile
    /// directory validation.
    pub fn from_config(config: StoreConfig) -> Result<Self, TerrainError> {
        let StoreConfig {
            tile_dir,
            max_tiles,
            memo_capacity,
            stats_grid,
        } = config;
        Ok(Self {
            tiles: TileCache::new(tile_dir, max_tiles)?,
            fallback: RegionModel::default(),
            memo: Mutex::new(MemoCache::new(memo_capacity)),
            stats_grid: stats_grid.max(1),
        })
    }

    /// Terrain elevation in feet MSL.
    ///
    /// Invalid coordinates answer 0.0; positions without tile coverage
    /// answer from the regional model. Results are clamped to
    /// [-1500, 30000] ft.
    pub fn elevation_at(&self, lat: f64, lon: f64) -> f64 {
        if !coordinate_valid(lat, lon) {
            trace!("invalid coordinate ({lat}, {lon}), answering 0.0");
            return 0.0;
        }
        let coord = Coord {
            x: normalize_lon(lon),
            y: lat,
        };

        let key = MemoCache::key(coord);
        if let Some(feet) = self.memo_lock().get(key) {
            return feet;
        }

        let feet = self.elevation_ft(coord);
        self.memo_lock().insert(key, feet);
        feet
    }

    /// Elevations in feet at `samples + 1` evenly spaced positions from
    /// `start` to `end`. Linear lat/lon interpolation; fine for the
    /// short segments flight planning asks about.
    pub fn elevation_profile(&self, start: Coord<f64>, end: Coord<f64>, samples: usize) -> Vec<f64> {
        linspace(start.y, end.y, samples)
            .zip(linspace(start.x, end.x, samples))
            .map(|(lat, lon)| self.elevation_at(lat, lon))
            .collect()
    }

    /// Min/max/mean elevation over a sampling grid covering
    /// `radius_nm` nautical miles around `center`.
    pub fn terrain_stats(&self, center: Coord<f64>, radius_nm: f64) -> TerrainStats {
        let radius_m = radius_nm.abs() * METERS_PER_NM;
        let dlat = radius_m / METERS_PER_DEGREE;
        let dlon = dlat / center.y.to_radians().cos().abs().max(0.01);

        let steps = self.stats_grid - 1;
        let mut min_ft = f64::INFINITY;
        let mut max_ft = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0usize;
        for lat in linspace(center.y - dlat, center.y + dlat, steps) {
            for lon in linspace(center.x - dlon, center.x + dlon, steps) {
                let feet = self.elevation_at(lat, lon);
                min_ft = min_ft.min(feet);
                max_ft = max_ft.max(feet);
                sum += feet;
                count += 1;
            }
        }
        TerrainStats {
            min_ft,
            max_ft,
            avg_ft: sum / count as f64,
        }
    }

    /// Max-gradient slope from four cardinal samples around the point.
    pub fn slope_angle(&self, lat: f64, lon: f64) -> SlopeInfo {
        if !coordinate_valid(lat, lon) {
            return SlopeInfo {
                angle_deg: 0.0,
                is_steep: false,
            };
        }
        // The sampling offset is finer than a 1/120° memo cell, so
        // these reads bypass memoization; going through it would
        // collapse all four samples into one cell.
        let sample = |lat: f64, lon: f64| {
            self.elevation_ft(Coord {
                x: normalize_lon(lon),
                y: lat,
            })
        };
        let samples = [
            sample((lat + SLOPE_OFFSET_DEG).min(90.0), lon),
            sample((lat - SLOPE_OFFSET_DEG).max(-90.0), lon),
            sample(lat, lon + SLOPE_OFFSET_DEG),
            sample(lat, lon - SLOPE_OFFSET_DEG),
        ];
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for feet in samples {
            lo = lo.min(feet);
            hi = hi.max(feet);
        }

        let rise_m = (hi - lo) / FEET_PER_METER;
        let run_m = 2.0 * SLOPE_OFFSET_DEG * METERS_PER_DEGREE;
        let angle_deg = rise_m.atan2(run_m).to_degrees();
        SlopeInfo {
            angle_deg,
            is_steep: angle_deg > STEEP_SLOPE_DEG,
        }
    }

    /// Terrain elevation plus the requested clearance, feet.
    pub fn minimum_safe_altitude(&self, lat: f64, lon: f64, clearance_ft: f64) -> f64 {
        self.elevation_at(lat, lon) + clearance_ft
    }

    /// True over known water bodies or low maritime terrain. Heuristic;
    /// see [`RegionModel::is_water_body`].
    pub fn is_water_body(&self, lat: f64, lon: f64) -> bool {
        if !coordinate_valid(lat, lon) {
            return false;
        }
        self.fallback.is_water_body(Coord {
            x: normalize_lon(lon),
            y: lat,
        })
    }

    /// Drops all resident tiles and memoized points.
    pub fn clear_cache(&self) {
        self.tiles.clear();
        self.memo_lock().clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.tiles.stats()
    }

    pub fn reset_cache_stats(&self) {
        self.tiles.reset_stats();
    }

    /// Bytes held by resident tiles and memoized points.
    pub fn cache_memory_estimate(&self) -> usize {
        self.tiles.memory_estimate() + self.memo_lock().mem_size()
    }

    fn elevation_ft(&self, coord: Coord<f64>) -> f64 {
        let meters = self.elevation_m(coord);
        (meters * FEET_PER_METER).clamp(MIN_ELEVATION_FT, MAX_ELEVATION_FT)
    }

    fn elevation_m(&self, coord: Coord<f64>) -> f64 {
        if coord.y >= TILE_COVERAGE_LAT || coord.y < -TILE_COVERAGE_LAT {
            return self.fallback.estimate(coord);
        }
        let sw_corner = Coord {
            x: coord.x.floor() as i32,
            y: coord.y.floor() as i32,
        };
        match self
            .tiles
            .get_or_load(sw_corner)
            .and_then(|tile| tile.bilinear(coord))
        {
            Some(meters) => meters,
            None => self.fallback.estimate(coord),
        }
    }

    fn memo_lock(&self) -> MutexGuard<'_, MemoCache> {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn coordinate_valid(lat: f64, lon: f64) -> bool {
    lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

#[cfg(test)]
mod tests {
    use super::{Coord, ElevationStore};
    use approx::assert_relative_eq;

    fn fallback_only() -> ElevationStore {
        ElevationStore::builder().build().unwrap()
    }

    #[test]
    fn test_invalid_coordinates_answer_zero() {
        let store = fallback_only();
        assert_eq!(store.elevation_at(91.0, 0.0), 0.0);
        assert_eq!(store.elevation_at(-91.0, 0.0), 0.0);
        assert_eq!(store.elevation_at(0.0, 181.0), 0.0);
        assert_eq!(store.elevation_at(f64::NAN, 0.0), 0.0);
        assert_eq!(store.elevation_at(0.0, f64::INFINITY), 0.0);
        assert!(!store.is_water_body(f64::NAN, 0.0));
    }

    #[test]
    fn test_fallback_always_answers() {
        let store = fallback_only();
        for lat in [-89.9, -60.0, -12.3, 0.0, 36.6, 60.0, 89.9] {
            for lon in [-180.0, -118.3, 0.0, 86.9, 179.9] {
                let feet = store.elevation_at(lat, lon);
                assert!(feet.is_finite());
                assert!((-1_500.0..=30_000.0).contains(&feet));
            }
        }
    }

    #[test]
    fn test_memo_short_circuits_repeat_queries() {
        let store = fallback_only();
        store.elevation_at(10.0, -150.0);
        let misses = store.cache_stats().misses;
        // Identical and near-identical queries land in the same 1/120°
        // cell and never reach the tile cache again.
        store.elevation_at(10.0, -150.0);
        store.elevation_at(10.0001, -150.0001);
        assert_eq!(store.cache_stats().misses, misses);
    }

    #[test]
    fn test_antimeridian_wrap_shares_a_cell() {
        let store = fallback_only();
        // 180 normalizes onto -180; the second query is a memo hit.
        assert_relative_eq!(
            store.elevation_at(0.0, 180.0),
            store.elevation_at(0.0, -180.0)
        );
        let misses = store.cache_stats().misses;
        store.elevation_at(0.0, 180.0);
        assert_eq!(store.cache_stats().misses, misses);
    }

    #[test]
    fn test_msa_is_composition() {
        let store = fallback_only();
        let terrain = store.elevation_at(36.6, -118.3);
        assert_relative_eq!(
            store.minimum_safe_altitude(36.6, -118.3, 1000.0),
            terrain + 1000.0
        );
    }

    #[test]
    fn test_flat_terrain_is_not_steep() {
        let store = fallback_only();
        let slope = store.slope_angle(10.0, -150.0);
        assert_relative_eq!(slope.angle_deg, 0.0);
        assert!(!slope.is_steep);
    }

    #[test]
    fn test_fallback_terrain_has_gradient() {
        let store = fallback_only();
        // The IDW surface falls off with distance from Mt Whitney, so
        // cardinal samples a short way from the peak differ.
        let slope = store.slope_angle(36.59, -118.292);
        assert!(slope.angle_deg > 0.0);
    }

    #[test]
    fn test_water_delegates_to_region_model() {
        let store = fallback_only();
        assert!(store.is_water_body(47.7, -87.5));
        assert!(!store.is_water_body(38.5, -98.0));
    }

    #[test]
    fn test_stats_over_uniform_fallback() {
        let store = fallback_only();
        let stats = store.terrain_stats(Coord { x: -150.0, y: 10.0 }, 5.0);
        assert_relative_eq!(stats.min_ft, 0.0);
        assert_relative_eq!(stats.max_ft, 0.0);
        assert_relative_eq!(stats.avg_ft, 0.0);
    }

    #[test]
    fn test_store_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ElevationStore>();
    }
}
