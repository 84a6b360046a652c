/*!
This library provides the geographic side of precipitation kriging: the great-circle
distance between two points given in decimal degrees and the regular latitude/longitude
raster the interpolated values are written to.

A raster is defined by its bounds and a number of rows, the number of columns is derived
from the aspect ratio of the bounds so that cells are roughly square in degrees.

Example:
```
use okriging_raster::{GreatCircle, GridParams, Raster};
use linfa::ParamGuard;

let spec = GridParams::new(47., 55., 5., 16.).rows(9).check().expect("valid grid");
assert_eq!(spec.cols(), 13);

let metric = GreatCircle::default();
let mut raster = Raster::new(&spec).expect("raster allocated");
// a station located in Berlin is copied into its nearest cell
let cell = raster.snap_station("Berlin", 52.52, 13.40, 1.2, &metric).unwrap();
assert!(cell.is_some());
```
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod errors;
mod geodesy;
mod grid;
mod raster;

pub use errors::*;
pub use geodesy::*;
pub use grid::*;
pub use raster::*;
