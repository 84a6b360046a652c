//! Station file reader and raster CSV writer.
//!
//! Station files start with a header line followed by one `name;lat;lon;value` line per
//! station, numbers may use a decimal comma (`51,12`). Rasters are exported as three
//! `;`-separated files holding one raster row per line: values, latitudes and longitudes.
use crate::errors::{OkrigingError, Result};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use log::{debug, info};
use okriging_kriging::StationPoint;
use okriging_raster::Raster;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Values file name when kriging weights are used as is
pub const RASTER_FILE: &str = "interpolRaster.csv";
/// Values file name when negative kriging weights are corrected
pub const CORRECTED_RASTER_FILE: &str = "interpolRaster_c.csv";
/// Cell latitudes file name
pub const LAT_FILE: &str = "lat.csv";
/// Cell longitudes file name
pub const LON_FILE: &str = "lon.csv";

const DELIMITER: u8 = b';';

/// Parse a number written with either a decimal point or a decimal comma
fn parse_decimal(field: &str, what: &str, line: usize) -> Result<f64> {
    field
        .replacen(',', ".", 1)
        .parse::<f64>()
        .map_err(|_| OkrigingError::ParseError {
            line,
            message: format!("invalid {what} '{field}'"),
        })
}

fn parse_station(record: &StringRecord, line: usize) -> Result<StationPoint<f64>> {
    if record.len() < 4 {
        return Err(OkrigingError::ParseError {
            line,
            message: format!(
                "expected 'name;lat;lon;value', got '{}'",
                record.iter().collect::<Vec<_>>().join(";")
            ),
        });
    }
    let name = &record[0];
    if name.is_empty() {
        return Err(OkrigingError::ParseError {
            line,
            message: "empty station name".to_string(),
        });
    }
    let lat = parse_decimal(&record[1], "latitude", line)?;
    let lon = parse_decimal(&record[2], "longitude", line)?;
    let value = parse_decimal(&record[3], "value", line)?;
    Ok(StationPoint::new(name, lat, lon, value))
}

/// Read stations from a reader, the first line being a header
pub fn read_stations<R: Read>(reader: R) -> Result<Vec<StationPoint<f64>>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(DELIMITER)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);
    debug!("Station file header: {:?}", reader.headers()?);

    let mut stations = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map_or(0, |pos| pos.line() as usize);
        stations.push(parse_station(&record, line)?);
    }
    Ok(stations)
}

/// Read stations from a file
pub fn load_stations<P: AsRef<Path>>(path: P) -> Result<Vec<StationPoint<f64>>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let stations = read_stations(file)?;
    info!("{} stations read from {}", stations.len(), path.display());
    Ok(stations)
}

fn write_rows<W: Write>(
    out: W,
    raster: &Raster<f64>,
    cell: impl Fn(usize, usize) -> String,
) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .delimiter(DELIMITER)
        .from_writer(out);
    let (rows, cols) = raster.shape();
    for i in 0..rows {
        writer.write_record((0..cols).map(|j| cell(i, j)))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write raster values (3 decimals, -1 for cells without value), latitudes and
/// longitudes (4 decimals) to the given writers
pub fn write_raster<V: Write, A: Write, O: Write>(
    raster: &Raster<f64>,
    values: &mut V,
    lats: &mut A,
    lons: &mut O,
) -> Result<()> {
    let cells = raster.cells();
    write_rows(values, raster, |i, j| {
        format!("{:.3}", cells[[i, j]].value_or_sentinel())
    })?;
    write_rows(lats, raster, |i, j| format!("{:.4}", cells[[i, j]].lat))?;
    write_rows(lons, raster, |i, j| format!("{:.4}", cells[[i, j]].lon))?;
    Ok(())
}

/// Files written by [`export_raster`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedFiles {
    /// values file
    pub values: PathBuf,
    /// latitudes file
    pub lats: PathBuf,
    /// longitudes file
    pub lons: PathBuf,
}

/// Export the raster into `dir`, created if missing. The values file name depends on
/// whether the weights correction was enabled.
pub fn export_raster<P: AsRef<Path>>(
    raster: &Raster<f64>,
    dir: P,
    corrected: bool,
) -> Result<ExportedFiles> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let files = ExportedFiles {
        values: dir.join(if corrected {
            CORRECTED_RASTER_FILE
        } else {
            RASTER_FILE
        }),
        lats: dir.join(LAT_FILE),
        lons: dir.join(LON_FILE),
    };
    let mut values = BufWriter::new(File::create(&files.values)?);
    let mut lats = BufWriter::new(File::create(&files.lats)?);
    let mut lons = BufWriter::new(File::create(&files.lons)?);
    write_raster(raster, &mut values, &mut lats, &mut lons)?;
    info!("Raster written to {}", dir.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use linfa::ParamGuard;
    use okriging_raster::{GreatCircle, GridParams};
    use std::io::Cursor;

    const STATIONS: &str = "Stationsname;Breite;Laenge;Tagessumme
Aachen;50,7827;6,0941;2,3

Berlin-Tempelhof;52,4675;13,4021;0,4
Zugspitze;47.4210;10.9848;12.0;
";

    #[test]
    fn test_read_stations() {
        let stations = read_stations(Cursor::new(STATIONS)).unwrap();
        assert_eq!(stations.len(), 3);
        assert_eq!(stations[0], StationPoint::new("Aachen", 50.7827, 6.0941, 2.3));
        assert_eq!(stations[1].name, "Berlin-Tempelhof");
        assert_abs_diff_eq!(stations[1].value, 0.4);
        assert_abs_diff_eq!(stations[2].lat, 47.421);
        assert_abs_diff_eq!(stations[2].value, 12.);
    }

    #[test]
    fn test_quoted_and_padded_fields() {
        let content = "name;lat;lon;value\n\"Frankfurt; Main\"; 50,0259 ;8,5213; 0,75\n   \n";
        let stations = read_stations(Cursor::new(content)).unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].name, "Frankfurt; Main");
        assert_abs_diff_eq!(stations[0].lat, 50.0259);
        assert_abs_diff_eq!(stations[0].lon, 8.5213);
        assert_abs_diff_eq!(stations[0].value, 0.75);
    }

    #[test]
    fn test_header_only() {
        let stations = read_stations(Cursor::new("name;lat;lon;value\n")).unwrap();
        assert!(stations.is_empty());
    }

    #[test]
    fn test_malformed_lines() {
        let missing = "name;lat;lon;value\nA;50,1;8,2;1\nB;50,3;8,4\n";
        match read_stations(Cursor::new(missing)) {
            Err(OkrigingError::ParseError { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected a parse error, got {other:?}"),
        }

        let bad_number = "name;lat;lon;value\nA;50,1;8,2;1\nB;50,1;abc;1\n";
        match read_stations(Cursor::new(bad_number)) {
            Err(OkrigingError::ParseError { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.contains("longitude"));
            }
            other => panic!("expected a parse error, got {other:?}"),
        }

        let no_name = "name;lat;lon;value\n ;50,1;8,2;1\n";
        assert!(matches!(
            read_stations(Cursor::new(no_name)),
            Err(OkrigingError::ParseError { line: 2, .. })
        ));
    }

    #[test]
    fn test_write_raster() {
        let spec = GridParams::new(50., 51., 8., 9.).rows(2).check().unwrap();
        let mut raster = Raster::new(&spec).unwrap();
        raster
            .snap_station("A", 51., 8., 3.25, &GreatCircle::default())
            .unwrap();
        raster.set_interpolated(0, 1, 1.0 / 3.0).unwrap();
        raster.set_unresolved(1, 0).unwrap();

        let (mut values, mut lats, mut lons) = (Vec::new(), Vec::new(), Vec::new());
        write_raster(&raster, &mut values, &mut lats, &mut lons).unwrap();

        assert_eq!(
            String::from_utf8(values).unwrap(),
            "3.250;0.333\n-1.000;-1.000\n"
        );
        assert_eq!(
            String::from_utf8(lats).unwrap(),
            "51.0000;51.0000\n50.0000;50.0000\n"
        );
        assert_eq!(
            String::from_utf8(lons).unwrap(),
            "8.0000;9.0000\n8.0000;9.0000\n"
        );
    }

    #[test]
    fn test_export_file_names() {
        let spec = GridParams::new(50., 51., 8., 9.).rows(2).check().unwrap();
        let raster = Raster::new(&spec).unwrap();
        let dir = std::env::temp_dir().join(format!("okriging-export-{}", std::process::id()));

        let files = export_raster(&raster, &dir, true).unwrap();
        assert_eq!(files.values, dir.join(CORRECTED_RASTER_FILE));
        assert!(files.values.exists() && files.lats.exists() && files.lons.exists());
        let files = export_raster(&raster, &dir, false).unwrap();
        assert_eq!(files.values, dir.join(RASTER_FILE));
        let content = fs::read_to_string(&files.values).unwrap();
        assert_eq!(content.lines().count(), 2);

        fs::remove_dir_all(&dir).unwrap();
    }
}
