//! Elevation sources.
//!
//! The analyzer asks for the elevation of each graph node exactly once per
//! pass through [`ElevationSource`]. Values must be true meters: any
//! vertical exaggeration applied by a terrain renderer has to be divided
//! out first, which [`Exaggerated`] does for a wrapped source.

use std::collections::HashMap;
use std::f64::consts::FRAC_PI_4;

use geo::Coord;
use image::RgbImage;

use crate::key::NodeKey;

/// Synchronous, side-effect-free elevation lookup in meters.
pub trait ElevationSource {
    /// Elevation at `coord` (longitude, latitude) in meters.
    fn elevation(&self, coord: Coord<f64>) -> f64;
}

impl<F> ElevationSource for F
where
    F: Fn(Coord<f64>) -> f64,
{
    fn elevation(&self, coord: Coord<f64>) -> f64 {
        self(coord)
    }
}

/// Divides a renderer's exaggerated elevation back into meters.
#[derive(Debug, Clone)]
pub struct Exaggerated<S> {
    inner: S,
    exaggeration: f64,
}

impl<S> Exaggerated<S> {
    /// Wrap `inner`, whose values are multiplied by `exaggeration`.
    ///
    /// A zero, negative or non-finite exaggeration means "not exaggerated"
    /// and is treated as `1.0`.
    #[must_use]
    pub fn new(inner: S, exaggeration: f64) -> Self {
        let exaggeration = if exaggeration.is_finite() && exaggeration > 0.0 {
            exaggeration
        } else {
            1.0
        };
        Self {
            inner,
            exaggeration,
        }
    }

    /// The effective exaggeration divisor.
    #[must_use]
    pub const fn exaggeration(&self) -> f64 {
        self.exaggeration
    }
}

impl<S: ElevationSource> ElevationSource for Exaggerated<S> {
    fn elevation(&self, coord: Coord<f64>) -> f64 {
        self.inner.elevation(coord) / self.exaggeration
    }
}

/// Elevations known at exact coordinates, e.g. the third component of
/// 3D input positions.
///
/// Coordinates without a sample resolve to `fallback`.
#[derive(Debug, Clone, Default)]
pub struct SampledElevation {
    samples: HashMap<NodeKey, f64>,
    fallback: f64,
}

impl SampledElevation {
    /// Create an empty table that answers `fallback` everywhere.
    #[must_use]
    pub fn new(fallback: f64) -> Self {
        Self {
            samples: HashMap::new(),
            fallback,
        }
    }

    /// Record the elevation at `coord`. Later samples at the same exact
    /// coordinate replace earlier ones. Non-finite coordinates or
    /// elevations are ignored.
    pub fn insert(&mut self, coord: Coord<f64>, elevation: f64) {
        if !elevation.is_finite() {
            return;
        }
        if let Some(key) = NodeKey::new(coord) {
            self.samples.insert(key, elevation);
        }
    }

    /// Number of distinct sampled coordinates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if nothing has been sampled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl FromIterator<(Coord<f64>, f64)> for SampledElevation {
    fn from_iter<T: IntoIterator<Item = (Coord<f64>, f64)>>(iter: T) -> Self {
        let mut table = Self::default();
        for (coord, elevation) in iter {
            table.insert(coord, elevation);
        }
        table
    }
}

impl ElevationSource for SampledElevation {
    fn elevation(&self, coord: Coord<f64>) -> f64 {
        NodeKey::new(coord)
            .and_then(|key| self.samples.get(&key).copied())
            .unwrap_or(self.fallback)
    }
}

/// How elevation is packed into the RGB channels of a terrain tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerrainEncoding {
    /// Mapbox Terrain-RGB: `-10000 + (R * 65536 + G * 256 + B) * 0.1`.
    #[default]
    Mapbox,
    /// Terrarium: `R * 256 + G + B / 256 - 32768`.
    Terrarium,
}

impl TerrainEncoding {
    /// Decode one pixel into meters.
    #[must_use]
    pub fn decode(self, [r, g, b]: [u8; 3]) -> f64 {
        let (r, g, b) = (f64::from(r), f64::from(g), f64::from(b));
        match self {
            Self::Mapbox => r.mul_add(65536.0, g.mul_add(256.0, b)).mul_add(0.1, -10000.0),
            Self::Terrarium => r.mul_add(256.0, g) + b / 256.0 - 32768.0,
        }
    }
}

/// How raster rows map to latitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RasterProjection {
    /// Rows are evenly spaced in Web Mercator y, as in slippy-map tiles.
    #[default]
    WebMercator,
    /// Rows are evenly spaced in latitude.
    Equirectangular,
}

impl RasterProjection {
    fn project_lat(self, lat: f64) -> f64 {
        match self {
            Self::WebMercator => (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln(),
            Self::Equirectangular => lat,
        }
    }
}

/// Geographic extent of a raster, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    /// Western edge longitude.
    pub west: f64,
    /// Southern edge latitude.
    pub south: f64,
    /// Eastern edge longitude.
    pub east: f64,
    /// Northern edge latitude.
    pub north: f64,
}

impl GeoBounds {
    fn validate(self) -> Result<Self, TerrainError> {
        let finite = [self.west, self.south, self.east, self.north]
            .iter()
            .all(|v| v.is_finite());
        let in_range = self.south > -85.06 && self.north < 85.06;
        if finite && in_range && self.west < self.east && self.south < self.north {
            Ok(self)
        } else {
            Err(TerrainError::InvalidBounds(self))
        }
    }
}

/// Errors from building a [`TerrainRaster`].
#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    /// The raster bytes could not be decoded.
    #[error("failed to decode terrain raster: {0}")]
    Decode(#[from] image::ImageError),

    /// The raster has no pixels.
    #[error("terrain raster is empty")]
    Empty,

    /// Bounds are not finite, inverted, or outside the Mercator range.
    #[error("invalid terrain bounds: {0:?}")]
    InvalidBounds(GeoBounds),
}

/// A decoded, georeferenced elevation grid sampled with bilinear
/// interpolation. Coordinates outside the bounds clamp to the edge.
#[derive(Debug, Clone)]
pub struct TerrainRaster {
    width: u32,
    height: u32,
    heights: Vec<f64>,
    bounds: GeoBounds,
    projection: RasterProjection,
}

impl TerrainRaster {
    /// Decode an encoded tile (PNG or WebP) covering `bounds`.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::Decode`] if the bytes are not an image,
    /// [`TerrainError::Empty`] for a zero-sized image, and
    /// [`TerrainError::InvalidBounds`] for unusable bounds.
    pub fn from_encoded(
        bytes: &[u8],
        bounds: GeoBounds,
        encoding: TerrainEncoding,
        projection: RasterProjection,
    ) -> Result<Self, TerrainError> {
        let image = image::load_from_memory(bytes)?.to_rgb8();
        Self::from_rgb(&image, bounds, encoding, projection)
    }

    /// Build from an already decoded RGB image.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::Empty`] for a zero-sized image and
    /// [`TerrainError::InvalidBounds`] for unusable bounds.
    pub fn from_rgb(
        image: &RgbImage,
        bounds: GeoBounds,
        encoding: TerrainEncoding,
        projection: RasterProjection,
    ) -> Result<Self, TerrainError> {
        let bounds = bounds.validate()?;
        if image.width() == 0 || image.height() == 0 {
            return Err(TerrainError::Empty);
        }
        let heights = image.pixels().map(|p| encoding.decode(p.0)).collect();
        Ok(Self {
            width: image.width(),
            height: image.height(),
            heights,
            bounds,
            projection,
        })
    }

    /// Raster width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Raster height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    fn at(&self, col: usize, row: usize) -> f64 {
        let width = self.width as usize;
        self.heights.get(row * width + col).copied().unwrap_or(0.0)
    }

    /// Fractional pixel position of a coordinate, measured from pixel
    /// centers and clamped to the raster.
    fn pixel_position(&self, coord: Coord<f64>) -> (f64, f64) {
        let b = self.bounds;
        let p = self.projection;
        let fx = (coord.x - b.west) / (b.east - b.west);
        let top = p.project_lat(b.north);
        let fy = (top - p.project_lat(coord.y)) / (top - p.project_lat(b.south));
        let x = fx.mul_add(f64::from(self.width), -0.5);
        let y = fy.mul_add(f64::from(self.height), -0.5);
        (
            x.clamp(0.0, f64::from(self.width - 1)),
            y.clamp(0.0, f64::from(self.height - 1)),
        )
    }
}

impl ElevationSource for TerrainRaster {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::many_single_char_names
    )]
    fn elevation(&self, coord: Coord<f64>) -> f64 {
        let (x, y) = self.pixel_position(coord);
        if x.is_nan() || y.is_nan() {
            return self.at(0, 0);
        }
        let col = x.floor() as usize;
        let row = y.floor() as usize;
        let col1 = (col + 1).min(self.width as usize - 1);
        let row1 = (row + 1).min(self.height as usize - 1);
        let tx = x - x.floor();
        let ty = y - y.floor();

        let top = (self.at(col1, row) - self.at(col, row)).mul_add(tx, self.at(col, row));
        let bottom = (self.at(col1, row1) - self.at(col, row1)).mul_add(tx, self.at(col, row1));
        (bottom - top).mul_add(ty, top)
    }
}
