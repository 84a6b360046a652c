/*!
Ordinary kriging of daily precipitation sums measured at weather stations onto a
regular latitude/longitude raster.

This crate gathers the workspace crates:

* [okriging_raster] for great-circle distances, grid specification and rasters,
* [okriging_kriging] for the kriging pipeline itself,

and adds the [io] module reading `;`-separated station files and writing the
interpolated raster as CSV files.

Example:
```no_run
use okriging::io::{export_raster, load_stations};
use okriging::kriging::OrdinaryKriging;
use okriging::raster::GridParams;
use linfa::ParamGuard;

let stations = load_stations("./input/stations.csv")?;
let grid = GridParams::new(47., 55., 5., 16.).rows(200).check()?;
let output = OrdinaryKriging::<f64>::params()
    .weights_correction(true)
    .check()?
    .interpolate(&stations, &grid)?;
export_raster(&output.raster, "./output", true)?;
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod errors;
pub mod io;

pub use errors::*;

/// Great-circle distance, grid specification and rasters
pub mod raster {
    pub use okriging_raster::*;
}

/// Ordinary kriging pipeline
pub mod kriging {
    pub use okriging_kriging::*;
}
