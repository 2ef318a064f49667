//! SRTM elevation (`.hgt`) file format.
//!
//! A tile file is raw binary with no header: big-endian signed 16-bit
//! elevation samples in meters, row-major starting at the tile's
//! northwest corner, covering the 1°×1° cell whose southwest corner
//! names the file. Both the 3-arcsecond (1201×1201) and 1-arcsecond
//! (3601×3601) layouts are supported, detected from the byte length.
//!
//! # References
//!
//! 1. [HGT file layout](http://fileformats.archiveteam.org/index.php?title=HGT)
//! 1. [SRTM Collection User Guide](https://lpdaac.usgs.gov/documents/179/SRTM_User_Guide_V3.pdf)

mod error;
mod sample;

pub use crate::error::SrtmError;
use byteorder::{BigEndian as BE, ReadBytesExt, WriteBytesExt};
use geo::geometry::Coord;
use std::{fs, mem::size_of, path::Path};

/// Base floating point type used for all coordinates and calculations.
pub type C = f64;

/// Sentinel marking a grid post with no measured elevation.
pub const VOID: i16 = -32768;

/// Grid side length of a 1-arcsecond (SRTM1) tile.
pub const SRTM1_DIM: usize = 3601;

/// Grid side length of a 3-arcsecond (SRTM3) tile.
pub const SRTM3_DIM: usize = 1201;

/// A decoded elevation tile.
///
/// A `Tile` always owns a complete grid; there is no partially loaded
/// state. Callers that fail to produce one hold nothing instead.
pub struct Tile {
    /// Southwest corner of the tile in whole degrees.
    sw_corner: Coord<i32>,

    /// Samples per tile side.
    dimension: usize,

    /// Elevation samples in meters, row-major from the NW corner.
    samples: Box<[i16]>,
}

impl Tile {
    /// Reads and decodes the tile file at `path`.
    ///
    /// The tile's corner comes from the file name, its resolution from
    /// the byte length.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SrtmError> {
        let sw_corner = parse_sw_corner(&path)?;
        let bytes = fs::read(&path)?;
        Self::from_bytes(sw_corner, &bytes)
    }

    /// Decodes a tile from raw `.hgt` bytes.
    pub fn from_bytes(sw_corner: Coord<i32>, bytes: &[u8]) -> Result<Self, SrtmError> {
        let dimension =
            dimension_for_len(bytes.len()).ok_or(SrtmError::HgtLen(bytes.len() as u64))?;

        let mut rdr = bytes;
        let mut samples = Vec::with_capacity(dimension * dimension);
        for _ in 0..dimension * dimension {
            samples.push(rdr.read_i16::<BE>()?);
        }

        Ok(Self {
            sw_corner,
            dimension,
            samples: samples.into_boxed_slice(),
        })
    }

    /// Constructs a tile from an already decoded grid.
    ///
    /// `samples` must be a square grid with side [`SRTM1_DIM`] or
    /// [`SRTM3_DIM`].
    pub fn from_samples(sw_corner: Coord<i32>, samples: Vec<i16>) -> Result<Self, SrtmError> {
        let byte_len = samples.len() * size_of::<i16>();
        let dimension =
            dimension_for_len(byte_len).ok_or(SrtmError::HgtLen(byte_len as u64))?;
        Ok(Self {
            sw_corner,
            dimension,
            samples: samples.into_boxed_slice(),
        })
    }

    /// Encodes this tile back into `.hgt` bytes. Exact inverse of
    /// [`Tile::from_bytes`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.samples.len() * size_of::<i16>());
        for sample in self.samples.iter() {
            bytes.write_i16::<BE>(*sample).unwrap();
        }
        bytes
    }

    /// Southwest corner in whole degrees.
    pub fn sw_corner(&self) -> Coord<i32> {
        self.sw_corner
    }

    /// Samples per tile side.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Arcseconds per sample.
    pub fn resolution(&self) -> u8 {
        (3600 / (self.dimension - 1)) as u8
    }

    /// Returns the number of samples in this tile.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Resident bytes held by this tile's sample grid.
    pub fn mem_size(&self) -> usize {
        self.samples.len() * size_of::<i16>()
    }

    /// Raw sample at a grid post. Row 0 is the tile's north edge.
    pub fn get(&self, row: usize, col: usize) -> Option<i16> {
        if row < self.dimension && col < self.dimension {
            Some(self.samples[row * self.dimension + col])
        } else {
            None
        }
    }

    /// Bilinear elevation in meters at a fractional grid position.
    ///
    /// Both fractions are clamped to `[0, N-1]`, so querying exactly on
    /// the north or east edge reads the edge posts rather than indexing
    /// out of the grid. Void posts contribute 0 m to the blend.
    pub fn sample(&self, frac_row: C, frac_col: C) -> C {
        sample::bilinear(&self.samples, self.dimension, frac_row, frac_col)
    }

    /// True if `coord` falls inside this tile's degree cell, edges
    /// included.
    pub fn contains(&self, coord: Coord<C>) -> bool {
        let sw_x = C::from(self.sw_corner.x);
        let sw_y = C::from(self.sw_corner.y);
        (sw_x..=sw_x + 1.0).contains(&coord.x) && (sw_y..=sw_y + 1.0).contains(&coord.y)
    }

    /// Bilinear elevation in meters at a geographic coordinate, or
    /// `None` if the coordinate lies outside this tile.
    pub fn bilinear(&self, coord: Coord<C>) -> Option<C> {
        if !self.contains(coord) {
            return None;
        }
        let intervals = (self.dimension - 1) as C;
        let frac_row = (C::from(self.sw_corner.y + 1) - coord.y) * intervals;
        let frac_col = (coord.x - C::from(self.sw_corner.x)) * intervals;
        Some(self.sample(frac_row, frac_col))
    }
}

/// Returns the canonical file name for a tile's southwest corner,
/// e.g. `N34W118.hgt`. Exact inverse of [`parse_file_name`].
pub fn file_name(Coord { x, y }: Coord<i32>) -> String {
    let (n_s, lat) = {
        let lat = y.abs();
        let n_s = if y.is_negative() { 'S' } else { 'N' };
        (n_s, lat)
    };
    let (e_w, lon) = {
        let lon = x.abs();
        let e_w = if x.is_negative() { 'W' } else { 'E' };
        (e_w, lon)
    };
    format!("{n_s}{lat:02}{e_w}{lon:03}.hgt")
}

/// Parses a tile's southwest corner from its file name. The `.hgt`
/// extension is optional and letters may be either case. Returns `None`
/// for anything malformed.
pub fn parse_file_name(name: &str) -> Option<Coord<i32>> {
    let stem = name.strip_suffix(".hgt").unwrap_or(name);
    if stem.len() != 7 || !stem.is_ascii() {
        return None;
    }
    let lat_sign = match &stem[0..1] {
        "N" | "n" => 1,
        "S" | "s" => -1,
        _ => return None,
    };
    let lon_sign = match &stem[3..4] {
        "E" | "e" => 1,
        "W" | "w" => -1,
        _ => return None,
    };
    if !stem[1..3].bytes().all(|b| b.is_ascii_digit())
        || !stem[4..7].bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let lat: i32 = stem[1..3].parse().ok()?;
    let lon: i32 = stem[4..7].parse().ok()?;
    Some(Coord {
        x: lon_sign * lon,
        y: lat_sign * lat,
    })
}

fn parse_sw_corner<P: AsRef<Path>>(path: P) -> Result<Coord<i32>, SrtmError> {
    path.as_ref()
        .file_name()
        .and_then(std::ffi::OsStr::to_str)
        .and_then(parse_file_name)
        .ok_or_else(|| SrtmError::HgtName(path.as_ref().to_owned()))
}

fn dimension_for_len(len: usize) -> Option<usize> {
    const SRTM1_LEN: usize = SRTM1_DIM * SRTM1_DIM * size_of::<i16>();
    const SRTM3_LEN: usize = SRTM3_DIM * SRTM3_DIM * size_of::<i16>();
    match len {
        SRTM1_LEN => Some(SRTM1_DIM),
        SRTM3_LEN => Some(SRTM3_DIM),
        _ => None,
    }
}

#[cfg(test)]
mod codec {
    use super::{file_name, parse_file_name, Coord, SrtmError, Tile, SRTM3_DIM};

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(Coord { x: -118, y: 34 }), "N34W118.hgt");
        assert_eq!(file_name(Coord { x: 0, y: 0 }), "N00E000.hgt");
        assert_eq!(file_name(Coord { x: -1, y: -1 }), "S01W001.hgt");
        assert_eq!(file_name(Coord { x: 138, y: -35 }), "S35E138.hgt");
    }

    #[test]
    fn test_parse_file_name() {
        assert_eq!(
            parse_file_name("N44W072.hgt"),
            Some(Coord { x: -72, y: 44 })
        );
        assert_eq!(parse_file_name("s01e000"), Some(Coord { x: 0, y: -1 }));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for name in [
            "",
            "hgt",
            "N44.hgt",
            "X44W072.hgt",
            "N44X072.hgt",
            "N4W0722.hgt",
            "NxxW072.hgt",
            "N44Wxxx.hgt",
            "N+4W072.hgt",
            "N44W072.tif",
            "N44W0720.hgt",
        ] {
            assert_eq!(parse_file_name(name), None, "accepted {name:?}");
        }
    }

    #[test]
    fn test_name_round_trip() {
        for lat in (-60..60).step_by(7) {
            for lon in (-180..180).step_by(13) {
                let sw_corner = Coord { x: lon, y: lat };
                assert_eq!(parse_file_name(&file_name(sw_corner)), Some(sw_corner));
            }
        }
    }

    #[test]
    fn test_from_bytes_rejects_bad_len() {
        let sw_corner = Coord { x: -123, y: 37 };
        for len in [0, 2, SRTM3_DIM * SRTM3_DIM, SRTM3_DIM * SRTM3_DIM * 2 - 2] {
            match Tile::from_bytes(sw_corner, &vec![0u8; len]) {
                Err(SrtmError::HgtLen(l)) => assert_eq!(l, len as u64),
                other => panic!("expected HgtLen for {len}, got {:?}", other.map(|_| ())),
            }
        }
    }

    #[test]
    fn test_decode_is_big_endian() {
        let mut bytes = vec![0u8; SRTM3_DIM * SRTM3_DIM * 2];
        // First sample (NW corner) = 0x0102, second = -2.
        bytes[0] = 0x01;
        bytes[1] = 0x02;
        bytes[2] = 0xff;
        bytes[3] = 0xfe;
        let tile = Tile::from_bytes(Coord { x: -123, y: 37 }, &bytes).unwrap();
        assert_eq!(tile.get(0, 0), Some(0x0102));
        assert_eq!(tile.get(0, 1), Some(-2));
        assert_eq!(tile.dimension(), SRTM3_DIM);
        assert_eq!(tile.resolution(), 3);
    }

    #[test]
    fn test_byte_round_trip() {
        let samples: Vec<i16> = (0..SRTM3_DIM * SRTM3_DIM)
            .map(|i| (i % 9000) as i16 - 500)
            .collect();
        let tile = Tile::from_samples(Coord { x: 6, y: 45 }, samples.clone()).unwrap();
        let reparsed = Tile::from_bytes(tile.sw_corner(), &tile.to_bytes()).unwrap();
        for (i, expected) in samples.iter().enumerate() {
            assert_eq!(
                reparsed.get(i / SRTM3_DIM, i % SRTM3_DIM),
                Some(*expected)
            );
        }
    }
}
