use serde::{Deserialize, Serialize};

/// Geographic coordinate in degrees.
///
/// Longitude goes first, both in the constructor and in the serialized `[lng, lat]` form, the
/// same way map styles write their `center` values.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    lng: f64,
    lat: f64,
}

impl LngLat {
    /// Creates a new coordinate.
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Longitude in degrees.
    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Returns true if both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lng.is_finite() && self.lat.is_finite()
    }
}

impl From<[f64; 2]> for LngLat {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(value: LngLat) -> Self {
        [value.lng, value.lat]
    }
}

/// Creates a new [`LngLat`] from longitude and latitude values (in degrees).
///
/// ```
/// use mapsync_types::lnglat;
///
/// let point = lnglat!(-111.65, 40.581);
/// assert_eq!(point.lat(), 40.581);
/// ```
#[macro_export]
macro_rules! lnglat {
    ($lng:expr, $lat:expr) => {
        $crate::LngLat::new($lng, $lat)
    };
}
