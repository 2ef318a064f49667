mod cache;
mod error;
mod fallback;
mod math;
mod store;

pub use crate::{
    cache::{CacheStats, TileCache, DEFAULT_MAX_TILES},
    error::TerrainError,
    fallback::RegionModel,
    store::{ElevationStore, ElevationStoreBuilder, SlopeInfo, StoreConfig, TerrainStats},
};
