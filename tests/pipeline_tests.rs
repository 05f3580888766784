// tests/pipeline_tests.rs
//
// End-to-end runs on a synthetic 4x4 grid:
//
// ```text
// x: 100 .. 104, y: 10 .. 6, 1 unit pixels
//
//   A A B B
//   A A B B
//   A A . .
//   A A . .
// ```
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use gdal::raster::Buffer;
use gdal::{Dataset, DriverManager, Metadata};
use lst_calc::batch::{load_batch, process_batch};
use lst_calc::error::LstError;
use lst_calc::io::reader::{read_band, resolve_band};
use lst_calc::pipeline::{run, Request, Variant, VegetationParams};
use lst_calc::processing::{ParallelProcessor, NODATA};
use tempfile::TempDir;

const GEO_TRANSFORM: [f64; 6] = [100.0, 1.0, 0.0, 10.0, 0.0, -1.0];
const SIZE: usize = 4;

const BOUNDARY: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    { "type": "Feature", "properties": { "NAME": "A" },
      "geometry": { "type": "Polygon", "coordinates": [[[100, 6], [102, 6], [102, 10], [100, 10], [100, 6]]] } },
    { "type": "Feature", "properties": { "NAME": "B" },
      "geometry": { "type": "Polygon", "coordinates": [[[102, 8], [104, 8], [104, 10], [102, 10], [102, 8]]] } }
  ]
}"#;

const OFF_GRID_BOUNDARY: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    { "type": "Feature", "properties": { "NAME": "far" },
      "geometry": { "type": "Polygon", "coordinates": [[[500, 50], [510, 50], [510, 60], [500, 60], [500, 50]]] } }
  ]
}"#;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Write a float GeoTIFF with one band per entry of `bands`.
fn write_scene(path: &Path, bands: &[(&str, Vec<f32>)]) {
    write_scene_at(path, &GEO_TRANSFORM, bands);
}

fn write_scene_at(path: &Path, geo_transform: &[f64; 6], bands: &[(&str, Vec<f32>)]) {
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut dataset = driver
        .create_with_band_type::<f32, _>(path, SIZE, SIZE, bands.len())
        .unwrap();
    dataset.set_geo_transform(geo_transform).unwrap();

    for (i, (description, values)) in bands.iter().enumerate() {
        let mut band = dataset.rasterband(i + 1).unwrap();
        if !description.is_empty() {
            band.set_description(description).unwrap();
        }
        let mut buffer = Buffer::new((SIZE, SIZE), values.clone());
        band.write((0, 0), (SIZE, SIZE), &mut buffer).unwrap();
    }
    dataset.flush_cache().unwrap();
}

fn lst_scene(dir: &Path, name: &str, lst: Vec<f32>) {
    write_scene(
        &dir.join(name),
        &[
            ("", lst),
            ("", vec![490.0; SIZE * SIZE]),
            ("", vec![495.0; SIZE * SIZE]),
        ],
    );
}

struct Fixture {
    _dir: TempDir,
    lst: PathBuf,
    ndvi: PathBuf,
    boundary: PathBuf,
    output: PathBuf,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let lst = dir.path().join("mod11a2");
    let ndvi = dir.path().join("mod13a2");
    let output = dir.path().join("out");
    fs::create_dir_all(&lst).unwrap();
    fs::create_dir_all(&ndvi).unwrap();

    lst_scene(&lst, "MOD11A2.A2025153.tif", vec![15000.0; SIZE * SIZE]);
    let mut with_fill = vec![15500.0; SIZE * SIZE];
    with_fill[0] = 0.0;
    lst_scene(&lst, "MOD11A2.A2025161.tif", with_fill);
    // Outside the June window
    lst_scene(&lst, "MOD11A2.A2025185.tif", vec![20000.0; SIZE * SIZE]);

    // NDVI 0.00, 0.05, ... 0.75 in row-major order
    let ndvi_values = (0..SIZE * SIZE).map(|i| i as f32 * 500.0).collect();
    write_scene(&ndvi.join("MOD13A2.A2025161.tif"), &[("", ndvi_values)]);

    let boundary = dir.path().join("districts.geojson");
    fs::write(&boundary, BOUNDARY).unwrap();

    Fixture {
        _dir: dir,
        lst,
        ndvi,
        boundary,
        output,
    }
}

fn june_request(fixture: &Fixture, variant: Variant) -> Request {
    Request::new(
        &fixture.lst,
        &fixture.boundary,
        date(2025, 6, 1),
        date(2025, 6, 30),
        variant,
        &fixture.output,
    )
}

fn mean(report_value: Option<f64>) -> f64 {
    report_value.expect("feature has a mean")
}

#[test]
fn test_narrowband_request_end_to_end() {
    let fixture = fixture();
    let processor = ParallelProcessor::new(Some(2));
    let report = run(&processor, &june_request(&fixture, Variant::Narrowband)).unwrap();

    assert_eq!(report.scenes, 2);
    assert_eq!(report.bands, vec!["LST_C", "Emis_31", "Emis_32", "BBE"]);
    assert_eq!(report.ndvi_range, None);

    // Feature A: one pixel only has the first scene (fill in the second)
    let a = &report.stats[0];
    assert_eq!(a.pixel_count, 8);
    assert!((mean(a.means[0]) - 31.225).abs() < 1e-3, "LST A = {:?}", a.means[0]);
    assert!((mean(a.means[1]) - 0.98).abs() < 1e-5);
    assert!((mean(a.means[2]) - 0.99).abs() < 1e-5);
    assert!((mean(a.means[3]) - 0.95348).abs() < 1e-5);

    let b = &report.stats[1];
    assert_eq!(b.pixel_count, 4);
    assert!((mean(b.means[0]) - 31.85).abs() < 1e-3, "LST B = {:?}", b.means[0]);

    // Exports share the description
    assert_eq!(
        report.csv_path,
        fixture.output.join("EarthEngineExports").join("LST_Emis_BBE.csv")
    );
    assert!(report.raster_path.ends_with("LST_Emis_BBE.tif"));
    assert!(report.overlay_path.exists());
    assert!(report.overlay_path.with_extension("pgw").exists());
    assert!(report.legend_path.exists());
}

#[test]
fn test_narrowband_csv_layout() {
    let fixture = fixture();
    let processor = ParallelProcessor::new(Some(2));
    let report = run(&processor, &june_request(&fixture, Variant::Narrowband)).unwrap();

    let mut reader = csv::Reader::from_path(&report.csv_path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(
        headers,
        vec!["system:index", "NAME", "LST_C", "Emis_31", "Emis_32", "BBE", ".geo"]
    );

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "00000000000000000000");
    assert_eq!(&rows[0][1], "A");
    assert_eq!(&rows[1][0], "00000000000000000001");
    assert_eq!(&rows[1][1], "B");

    let lst_a: f64 = rows[0][2].parse().unwrap();
    assert!((lst_a - 31.225).abs() < 1e-3);

    let geometry: serde_json::Value = serde_json::from_str(&rows[0][6]).unwrap();
    assert_eq!(geometry["type"], "Polygon");
}

#[test]
fn test_narrowband_raster_is_masked() {
    let fixture = fixture();
    let processor = ParallelProcessor::new(Some(2));
    let report = run(&processor, &june_request(&fixture, Variant::Narrowband)).unwrap();

    let dataset = Dataset::open(&report.raster_path).unwrap();
    assert_eq!(dataset.raster_count() as usize, 4);
    assert_eq!(dataset.rasterband(4).unwrap().description().unwrap(), "BBE");

    let lst = read_band(&report.raster_path, 1).unwrap();
    assert!((lst.data()[0] - 26.85).abs() < 1e-3);
    assert!((lst.data()[1] - 31.85).abs() < 1e-3);
    // Row 2, column 2 is outside both features
    assert_eq!(lst.data()[2 * SIZE + 2], NODATA);
}

#[test]
fn test_fixed_point_raster() {
    let fixture = fixture();
    let processor = ParallelProcessor::new(Some(2));
    let mut request = june_request(&fixture, Variant::Narrowband);
    request.write.fixed_point = true;
    request.description = "lst_int16".to_string();
    let report = run(&processor, &request).unwrap();

    let dataset = Dataset::open(&report.raster_path).unwrap();
    let band = dataset.rasterband(1).unwrap();
    assert_eq!(band.no_data_value(), Some(i16::MIN as f64));

    assert_eq!(band.description().unwrap(), "LST_C");
    assert_eq!(band.metadata_item("SCALE", ""), Some("0.01".to_string()));

    let raw = band.read_as::<i16>((0, 0), (SIZE, SIZE), (SIZE, SIZE), None).unwrap();
    assert_eq!(raw.data()[0], 2685);
    assert_eq!(raw.data()[2 * SIZE + 2], i16::MIN);

    // Products stay addressable by name in int16 output
    assert_eq!(resolve_band(&dataset, &report.raster_path, "LST_C", 4).unwrap(), 1);
    assert_eq!(resolve_band(&dataset, &report.raster_path, "BBE", 1).unwrap(), 4);
}

#[test]
fn test_vegetation_fraction_request() {
    let fixture = fixture();
    let processor = ParallelProcessor::new(Some(2));
    let params = VegetationParams::new(&fixture.ndvi);
    let report = run(
        &processor,
        &june_request(&fixture, Variant::VegetationFraction(params)),
    )
    .unwrap();

    assert_eq!(report.bands, vec!["LST_C", "NDVI", "FVC", "BBE_FVC"]);
    assert!(report.csv_path.ends_with("LST_FVC_BBE.csv"));

    // Covered NDVI: 0.00 .. 0.45 (rows 0-3, cols 0-1 and rows 0-1, cols 2-3)
    // plus 0.60, 0.65
    let (low, high) = report.ndvi_range.unwrap();
    assert!((low - 0.0275).abs() < 1e-4, "low = {low}");
    assert!((high - 0.6225).abs() < 1e-4, "high = {high}");

    for row in &report.stats {
        let fvc = mean(row.means[2]);
        let bbe = mean(row.means[3]);
        assert!((0.0..=1.0).contains(&fvc));
        assert!((0.972 - 1e-6..=0.986 + 1e-6).contains(&bbe), "BBE_FVC = {bbe}");
    }
}

#[test]
fn test_ndvi_on_another_grid_is_rejected() {
    let fixture = fixture();
    let shifted = fixture.ndvi.with_file_name("mod13a2_shifted");
    fs::create_dir_all(&shifted).unwrap();
    // Same 4x4 size, origin moved 50 pixels east
    let geo_transform = [150.0, 1.0, 0.0, 10.0, 0.0, -1.0];
    write_scene_at(
        &shifted.join("MOD13A2.A2025161.tif"),
        &geo_transform,
        &[("", vec![5000.0; SIZE * SIZE])],
    );

    let processor = ParallelProcessor::new(Some(2));
    let params = VegetationParams::new(&shifted);
    let result = run(
        &processor,
        &june_request(&fixture, Variant::VegetationFraction(params)),
    );
    assert!(matches!(result, Err(LstError::GridMismatch { .. })));
}

#[test]
fn test_window_without_scenes() {
    let fixture = fixture();
    let processor = ParallelProcessor::new(Some(1));
    let mut request = june_request(&fixture, Variant::Narrowband);
    request.start = date(2024, 6, 1);
    request.end = date(2024, 6, 30);

    assert!(matches!(
        run(&processor, &request),
        Err(LstError::EmptyCollection { .. })
    ));
}

#[test]
fn test_reversed_window_is_rejected() {
    let fixture = fixture();
    let processor = ParallelProcessor::new(Some(1));
    let mut request = june_request(&fixture, Variant::Narrowband);
    request.end = request.start;

    assert!(matches!(run(&processor, &request), Err(LstError::Config(_))));
}

#[test]
fn test_boundary_outside_grid() {
    let fixture = fixture();
    let far = fixture.output.with_file_name("far.geojson");
    fs::write(&far, OFF_GRID_BOUNDARY).unwrap();

    let processor = ParallelProcessor::new(Some(1));
    let mut request = june_request(&fixture, Variant::Narrowband);
    request.boundary = far;

    assert!(matches!(
        run(&processor, &request),
        Err(LstError::EmptyRegion(_))
    ));
}

#[test]
fn test_band_lookup_by_description() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("MOD11A2.A2025153.tif");
    write_scene(
        &path,
        &[
            ("Emis_31", vec![490.0; SIZE * SIZE]),
            ("LST_Day_1km", vec![15000.0; SIZE * SIZE]),
        ],
    );

    let dataset = Dataset::open(&path).unwrap();
    assert_eq!(resolve_band(&dataset, &path, "LST_Day_1km", 1).unwrap(), 2);
    // Unknown name uses the fallback index
    assert_eq!(resolve_band(&dataset, &path, "Emis_32", 1).unwrap(), 1);
    assert!(matches!(
        resolve_band(&dataset, &path, "Emis_32", 3),
        Err(LstError::MissingBand { .. })
    ));
}

#[test]
fn test_batch_runs_every_job() {
    let fixture = fixture();
    let config = fixture.output.with_file_name("batch.json");
    let batch = serde_json::json!({
        "global": { "output_dir": fixture.output, "folder": "exports" },
        "jobs": [
            {
                "type": "lst",
                "collection": fixture.lst,
                "boundary": fixture.boundary,
                "start": "2025-06-01",
                "end": "2025-06-30"
            },
            {
                "type": "fvc",
                "collection": fixture.lst,
                "boundary": fixture.boundary,
                "start": "2025-06-01",
                "end": "2025-06-30",
                "description": "june_fvc",
                "vegetation": { "ndvi_collection": fixture.ndvi }
            }
        ]
    });
    fs::write(&config, serde_json::to_string_pretty(&batch).unwrap()).unwrap();

    let loaded = load_batch(&config).unwrap();
    assert_eq!(loaded.jobs.len(), 2);
    assert_eq!(loaded.global.compress, "DEFLATE");

    let processor = ParallelProcessor::new(Some(2));
    let reports = process_batch(&config, &processor).unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(
        reports[0].csv_path,
        fixture.output.join("exports").join("LST_Emis_BBE.csv")
    );
    assert_eq!(
        reports[1].csv_path,
        fixture.output.join("exports").join("june_fvc.csv")
    );
}

#[test]
fn test_batch_rejects_fvc_job_without_ndvi() {
    let fixture = fixture();
    let config = fixture.output.with_file_name("bad_batch.json");
    let batch = serde_json::json!({
        "jobs": [{
            "type": "fvc",
            "collection": fixture.lst,
            "boundary": fixture.boundary,
            "start": "2025-06-01",
            "end": "2025-06-30"
        }]
    });
    fs::write(&config, batch.to_string()).unwrap();

    let processor = ParallelProcessor::new(Some(1));
    assert!(matches!(
        process_batch(&config, &processor),
        Err(LstError::Config(_))
    ));
}
