use linfa::ParamGuard;
use okriging_kriging::{OrdinaryKriging, StationPoint};
use okriging_raster::GridParams;

fn main() {
    let _ = env_logger::Builder::from_env(env_logger::Env::new().filter_or("OKRIGING_LOG", "info"))
        .try_init();

    // daily precipitation sums (mm) of a few german stations
    let stations = vec![
        StationPoint::new("Hamburg", 53.63, 9.99, 4.2),
        StationPoint::new("Bremen", 53.05, 8.80, 5.1),
        StationPoint::new("Hannover", 52.46, 9.68, 3.0),
        StationPoint::new("Berlin", 52.47, 13.40, 0.4),
        StationPoint::new("Leipzig", 51.32, 12.42, 1.1),
        StationPoint::new("Dresden", 51.13, 13.75, 0.9),
        StationPoint::new("Essen", 51.40, 6.97, 7.8),
        StationPoint::new("Koeln", 50.86, 7.16, 8.4),
        StationPoint::new("Frankfurt", 50.03, 8.52, 6.3),
        StationPoint::new("Erfurt", 50.98, 10.96, 2.2),
        StationPoint::new("Nuernberg", 49.50, 11.05, 1.7),
        StationPoint::new("Stuttgart", 48.69, 9.22, 5.5),
        StationPoint::new("Muenchen", 48.16, 11.54, 3.6),
        StationPoint::new("Freiburg", 48.02, 7.83, 9.1),
        StationPoint::new("Rostock", 54.18, 12.08, 2.4),
    ];

    let kriging = OrdinaryKriging::params()
        .weights_correction(true)
        .check()
        .expect("valid parameters")
        .fit(&stations)
        .expect("kriging model");
    let model = kriging.model();
    println!(
        "nugget={:.3} sill={} range={:.1} km",
        model.nugget, model.sill, model.range
    );

    let grid = GridParams::new(47., 55., 5., 16.)
        .rows(40)
        .check()
        .expect("valid grid");
    let output = kriging.interpolate(&grid).expect("interpolation");
    if let Some(summary) = output.summary {
        println!(
            "{} cells in [{:.2}, {:.2}] mm, mean {:.2} mm, {} unresolved",
            summary.resolved, summary.min, summary.max, summary.mean, summary.unresolved
        );
    }
}
