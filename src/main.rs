use clap::Parser;
use linfa::ParamGuard;
use okriging::io::{export_raster, load_stations};
use okriging::kriging::{
    OrdinaryKriging, DEFAULT_DISTANCE_INTERVAL, DEFAULT_MAX_DISTANCE, DEFAULT_REGRESSION_ORDER,
};
use okriging::raster::{GridParams, DEFAULT_ROWS, MID_LATITUDE_EARTH_RADIUS};

/// Ordinary kriging of daily precipitation sums onto a latitude/longitude raster
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Station file: a header line then `name;lat;lon;value` lines
    #[arg(short, long, default_value = "./input/tagessummen_452.csv")]
    input: String,
    /// Directory receiving the raster values, latitudes and longitudes
    #[arg(long, default_value = "./output/")]
    output_dir: String,
    /// Correct negative kriging weights
    #[arg(short, long)]
    correct_weights: bool,
    /// Log matrix previews and health checks
    #[arg(short = 'o', long)]
    verbose: bool,
    #[arg(long, default_value_t = 47.)]
    min_lat: f64,
    #[arg(long, default_value_t = 55.)]
    max_lat: f64,
    #[arg(long, default_value_t = 5.)]
    min_lon: f64,
    #[arg(long, default_value_t = 16.)]
    max_lon: f64,
    /// Number of raster rows, columns follow from the bounds aspect ratio
    #[arg(long, default_value_t = DEFAULT_ROWS)]
    rows: usize,
    /// Width (km) of the variogram distance classes
    #[arg(long, default_value_t = DEFAULT_DISTANCE_INTERVAL)]
    interval: f64,
    /// Largest distance (km) taken into account by the variogram
    #[arg(long, default_value_t = DEFAULT_MAX_DISTANCE)]
    max_distance: f64,
    /// Order of the polynomial regression estimating the nugget
    #[arg(long, default_value_t = DEFAULT_REGRESSION_ORDER)]
    order: usize,
    /// Earth radius (km) used by the great-circle distance
    #[arg(long, default_value_t = MID_LATITUDE_EARTH_RADIUS)]
    earth_radius: f64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env = env_logger::Env::new()
        .filter_or("OKRIGING_LOG", if args.verbose { "debug" } else { "info" });
    env_logger::Builder::from_env(env)
        .target(env_logger::Target::Stdout)
        .try_init()
        .ok();

    let stations = load_stations(&args.input)?;
    let grid = GridParams::new(args.min_lat, args.max_lat, args.min_lon, args.max_lon)
        .rows(args.rows)
        .check()?;
    let params = OrdinaryKriging::params()
        .distance_interval(args.interval)
        .max_distance(args.max_distance)
        .regression_order(args.order)
        .earth_radius(args.earth_radius)
        .weights_correction(args.correct_weights)
        .verbose(args.verbose)
        .check()?;

    let output = params.interpolate(&stations, &grid)?;
    let model = &output.model;
    println!(
        "Variogram model: nugget={:.4} sill={} range={:.1} km (rmse={:.4}, R2={:.4})",
        model.nugget,
        model.sill,
        model.range,
        model.rmse,
        model.regression.r2()
    );
    println!("Regression coefficients: {}", model.regression.coefficients());
    if let Some(summary) = &output.summary {
        println!(
            "Raster values in [{:.3}, {:.3}], mean {:.3}, {} unresolved cells",
            summary.min, summary.max, summary.mean, summary.unresolved
        );
    }

    let files = export_raster(&output.raster, &args.output_dir, args.correct_weights)?;
    println!("Raster written to {}", files.values.display());
    Ok(())
}
