use crate::errors::{KrigingError, Result};
use linfa::Float;
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView1};
use okriging_raster::GreatCircle;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A named measurement at a given location
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct StationPoint<F: Float> {
    /// station name
    pub name: String,
    /// latitude in decimal degrees
    pub lat: F,
    /// longitude in decimal degrees
    pub lon: F,
    /// measured value (daily precipitation sum in mm)
    pub value: F,
}

impl<F: Float> StationPoint<F> {
    /// Constructor
    pub fn new(name: impl Into<String>, lat: F, lon: F, value: F) -> Self {
        StationPoint {
            name: name.into(),
            lat,
            lon,
            value,
        }
    }
}

/// The validated, read-only station set kriging works on.
///
/// Coordinates are stored as a (n, 2) matrix of `[lat, lon]` rows and measurements
/// as a n-vector, in input order.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct StationSet<F: Float> {
    names: Vec<String>,
    coords: Array2<F>,
    values: Array1<F>,
}

impl<F: Float> StationSet<F> {
    /// Build the station set, checking that every coordinate and value is finite and
    /// that at least two distinct sites are given
    pub fn new(points: &[StationPoint<F>], metric: &GreatCircle<F>) -> Result<Self> {
        if let Some(p) = points
            .iter()
            .find(|p| !(p.lat.is_finite() && p.lon.is_finite() && p.value.is_finite()))
        {
            return Err(KrigingError::DataError(format!(
                "station {} has non finite data (lat={}, lon={}, value={})",
                p.name, p.lat, p.lon, p.value
            )));
        }
        let distinct = points
            .iter()
            .skip(1)
            .any(|p| !metric.same_site(points[0].lat, points[0].lon, p.lat, p.lon));
        if !distinct {
            return Err(KrigingError::DataError(format!(
                "at least 2 distinct stations are required, got {} station(s) on a single site",
                points.len()
            )));
        }

        let coords = Array2::from_shape_fn((points.len(), 2), |(i, j)| {
            if j == 0 {
                points[i].lat
            } else {
                points[i].lon
            }
        });
        Ok(StationSet {
            names: points.iter().map(|p| p.name.clone()).collect(),
            coords,
            values: points.iter().map(|p| p.value).collect(),
        })
    }

    /// Number of stations
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false as a valid set holds at least two stations
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Station names
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// (n, 2) matrix of `[lat, lon]`
    pub fn coords(&self) -> &Array2<F> {
        &self.coords
    }

    /// Measured values
    pub fn values(&self) -> &Array1<F> {
        &self.values
    }

    /// `[lat, lon]` of the i-th station
    pub fn location(&self, i: usize) -> ArrayView1<F> {
        self.coords.row(i)
    }

    /// Iterate over `(name, lat, lon, value)`
    pub fn iter(&self) -> impl Iterator<Item = (&str, F, F, F)> + '_ {
        self.names
            .iter()
            .zip(self.coords.rows())
            .zip(self.values.iter())
            .map(|((name, c), v)| (name.as_str(), c[0], c[1], *v))
    }

    /// Log the station table, at info level when verbose
    pub fn log_table(&self, verbose: bool) {
        let level = if verbose {
            log::Level::Info
        } else {
            log::Level::Debug
        };
        if !log::log_enabled!(level) {
            return;
        }
        log::log!(level, "{:>4} {:<32} {:>9} {:>9} {:>9}", "#", "station", "lat", "lon", "value");
        for (i, (name, lat, lon, value)) in self.iter().enumerate() {
            log::log!(level, "{i:>4} {name:<32} {lat:>9.4} {lon:>9.4} {value:>9.3}");
        }
    }
}

/// Log a short description of the station set
pub(crate) fn describe<F: Float>(stations: &StationSet<F>) {
    info!("{} stations", stations.len());
    debug!(
        "Station values in [{}, {}]",
        stations.values().fold(F::infinity(), |a, b| a.min(*b)),
        stations.values().fold(F::neg_infinity(), |a, b| a.max(*b))
    );
}
