//! Bounded store of resident SRTM tiles.

use crate::TerrainError;
use geo::geometry::Coord;
use log::debug;
use srtm::Tile;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Instant,
};

/// Default bound on resident tiles (~80 MiB of 1-arcsecond data).
pub const DEFAULT_MAX_TILES: usize = 16;

/// Monotonic hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

struct Resident {
    tile: Arc<Tile>,
    last_touch: Instant,
}

struct Inner {
    tiles: HashMap<Coord<i32>, Resident>,
    /// Recency order, least recently used first. Every resident key
    /// appears exactly once.
    order: Vec<Coord<i32>>,
    stats: CacheStats,
}

impl Inner {
    fn touch(&mut self, key: Coord<i32>) {
        if let Some(pos) = self.order.iter().position(|k| *k == key) {
            self.order.remove(pos);
            self.order.push(key);
        }
    }

    fn evict_lru(&mut self) -> Option<Coord<i32>> {
        if self.order.is_empty() {
            return None;
        }
        let oldest = self.order.remove(0);
        if let Some(evicted) = self.tiles.remove(&oldest) {
            debug!(
                "evicting {oldest:?} after {:?} idle",
                evicted.last_touch.elapsed()
            );
        }
        Some(oldest)
    }
}

/// On-demand tile store with strict least-recently-used eviction.
///
/// All map and recency mutations happen behind one mutex; disk reads
/// for misses happen while it is held. Load failures of any kind answer
/// `None` without inserting anything, leaving the retry decision to the
/// caller.
pub struct TileCache {
    /// Directory containing `.hgt` tile files, if one is configured.
    tile_dir: Option<PathBuf>,

    /// Bound on resident tiles.
    max_tiles: usize,

    inner: Mutex<Inner>,
}

impl TileCache {
    /// Creates a cache over `tile_dir`, or a permanently empty cache
    /// when no directory is configured.
    ///
    /// Fails only if a configured directory cannot be read at all;
    /// individually missing tile files are expected and handled per
    /// lookup.
    pub fn new(tile_dir: Option<PathBuf>, max_tiles: usize) -> Result<Self, TerrainError> {
        if let Some(dir) = &tile_dir {
            std::fs::read_dir(dir).map_err(|_| TerrainError::Path(dir.clone()))?;
        }
        Ok(Self {
            tile_dir,
            max_tiles: max_tiles.max(1),
            inner: Mutex::new(Inner {
                tiles: HashMap::new(),
                order: Vec::new(),
                stats: CacheStats::default(),
            }),
        })
    }

    /// Returns the tile whose southwest corner is `sw_corner`, loading
    /// it from disk on a miss and evicting the least recently used
    /// resident if the cache is full.
    pub fn get_or_load(&self, sw_corner: Coord<i32>) -> Option<Arc<Tile>> {
        let mut inner = self.lock();

        if let Some(resident) = inner.tiles.get_mut(&sw_corner) {
            resident.last_touch = Instant::now();
            let tile = Arc::clone(&resident.tile);
            inner.touch(sw_corner);
            inner.stats.hits += 1;
            return Some(tile);
        }

        inner.stats.misses += 1;

        let dir = self.tile_dir.as_deref()?;
        let tile = match load_tile(dir, sw_corner) {
            Ok(tile) => Arc::new(tile),
            Err(e) => {
                debug!("no usable tile for {sw_corner:?}: {e}");
                return None;
            }
        };

        while inner.tiles.len() >= self.max_tiles {
            if inner.evict_lru().is_none() {
                break;
            }
        }

        inner.tiles.insert(
            sw_corner,
            Resident {
                tile: Arc::clone(&tile),
                last_touch: Instant::now(),
            },
        );
        inner.order.push(sw_corner);
        Some(tile)
    }

    /// Drops all resident tiles. Counters are left alone; see
    /// [`TileCache::reset_stats`].
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.tiles.clear();
        inner.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    pub fn reset_stats(&self) {
        self.lock().stats = CacheStats::default();
    }

    pub fn resident_count(&self) -> usize {
        self.lock().tiles.len()
    }

    /// Bytes held by resident sample grids.
    pub fn memory_estimate(&self) -> usize {
        self.lock().tiles.values().map(|r| r.tile.mem_size()).sum()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicked holder leaves the map structurally intact; the
        // query path must keep answering regardless.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load_tile(dir: &Path, sw_corner: Coord<i32>) -> Result<Tile, TerrainError> {
    let file_name = srtm::file_name(sw_corner);
    let tile_path: PathBuf = [dir, Path::new(&file_name)].iter().collect();
    debug!("loading {tile_path:?}");
    Ok(Tile::load(tile_path)?)
}
