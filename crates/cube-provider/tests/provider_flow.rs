//! Provider lifecycle and handle-release behavior over a simulated
//! source archive.

use chrono::{Duration, TimeZone, Utc};
use cube_common::{BoundingBox, Calendar, CubeConfig, DataType, GridSpec, Raster, VariableDescriptor};
use cube_provider::index::TimeAxisRule;
use cube_provider::provider::{CubeSourceProvider, SourceProvider, SourceSpec};
use cube_provider::{FilenameFilter, ProviderError, ResamplePolicy, TimeCoding};
use cube_source::{EventLog, MemoryFile, MemoryStore, TimeAxis};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const UNITS: &str = "hours since 2001-01-01 00:00:00";

fn config() -> CubeConfig {
    CubeConfig {
        grid_width: 2,
        grid_height: 2,
        bbox: BoundingBox::new(0.0, 0.0, 2.0, 2.0),
        start_time: Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2002, 1, 1, 0, 0, 0).unwrap(),
    }
}

fn spec() -> SourceSpec {
    SourceSpec {
        name: "test".to_string(),
        dir: PathBuf::from("/src"),
        filter: FilenameFilter::Any,
        time: TimeCoding {
            variable: "time".to_string(),
            units: Some(UNITS.to_string()),
            calendar: Calendar::Gregorian,
            rule: TimeAxisRule::InstantPlusInterval {
                interval: Duration::hours(6),
            },
        },
        variables: vec![VariableDescriptor::new(
            "v", "v", DataType::Float32, -9999.0, "1",
        )],
        native_grid: GridSpec::new(2, 2, BoundingBox::new(0.0, 0.0, 2.0, 2.0)),
        policy: ResamplePolicy::Identity,
    }
}

/// One single-granule file per entry of `values`, holding a constant raster.
fn archive(values: &[(&str, f64, f32)]) -> (MemoryStore, EventLog) {
    let mut store = MemoryStore::new();
    for &(name, time, fill) in values {
        store.insert(
            format!("/src/{name}"),
            MemoryFile::with_variable(
                TimeAxis {
                    values: vec![time],
                    units: None,
                    calendar: None,
                },
                "v",
                vec![Raster::filled(2, 2, fill)],
            ),
        );
    }
    let log = store.log();
    (store, log)
}

fn weights(entries: &[(usize, f64)]) -> HashMap<usize, f64> {
    entries.iter().copied().collect()
}

#[test]
fn diff_release_sequence_releases_each_departed_file_once() {
    let (store, log) = archive(&[
        ("f1.nc", 0.0, 1.0),
        ("f2.nc", 6.0, 2.0),
        ("f3.nc", 12.0, 3.0),
    ]);
    let f1 = Path::new("/src/f1.nc");
    let f2 = Path::new("/src/f2.nc");
    let f3 = Path::new("/src/f3.nc");

    let mut provider = SourceProvider::new(store, spec(), config()).unwrap();
    provider.prepare().unwrap();

    // index scans open and close each file once; everything past the
    // baseline belongs to the compute sequence
    let base_f1 = log.closes_of(f1);
    let base_f2 = log.closes_of(f2);
    let base_f3 = log.closes_of(f3);

    provider.compute_variable_images(&weights(&[(0, 0.5), (1, 0.5)])).unwrap();
    assert_eq!(log.closes_of(f1), base_f1);
    assert_eq!(log.closes_of(f2), base_f2);

    provider.compute_variable_images(&weights(&[(1, 0.5), (2, 0.5)])).unwrap();
    assert_eq!(log.closes_of(f1), base_f1 + 1, "f1 released after call 2");
    assert_eq!(log.closes_of(f2), base_f2, "f2 still in the working set");

    provider.compute_variable_images(&weights(&[(2, 1.0)])).unwrap();
    assert_eq!(log.closes_of(f1), base_f1 + 1, "f1 released exactly once");
    assert_eq!(log.closes_of(f2), base_f2 + 1, "f2 released after call 3");
    assert_eq!(log.closes_of(f3), base_f3, "f3 never released mid-sequence");

    provider.close();
    assert_eq!(log.closes_of(f3), base_f3 + 1, "close releases the rest");
}

#[test]
fn handles_stay_cached_between_overlapping_steps() {
    let (store, log) = archive(&[("f1.nc", 0.0, 1.0), ("f2.nc", 6.0, 2.0)]);
    let f2 = Path::new("/src/f2.nc");

    let mut provider = SourceProvider::new(store, spec(), config()).unwrap();
    provider.prepare().unwrap();
    let base = log.opens_of(f2);

    provider.compute_variable_images(&weights(&[(0, 0.5), (1, 0.5)])).unwrap();
    provider.compute_variable_images(&weights(&[(1, 1.0)])).unwrap();

    // f2 stayed in the working set; the second step reused its handle
    assert_eq!(log.opens_of(f2), base + 1);
}

#[test]
fn blends_overlapping_granules_with_scheduler_weights() {
    let (store, _log) = archive(&[("a.nc", 0.0, 10.0), ("b.nc", 6.0, 20.0)]);
    let mut provider = SourceProvider::new(store, spec(), config()).unwrap();
    provider.prepare().unwrap();

    let images = provider
        .compute_variable_images(&weights(&[(0, 0.25), (1, 0.75)]))
        .unwrap();
    let raster = &images["v"];
    for &v in raster.data() {
        assert!((v - 17.5).abs() < 1e-5);
    }
}

#[test]
fn single_granule_passes_through_unchanged() {
    let (store, _log) = archive(&[("a.nc", 0.0, 4.25)]);
    let mut provider = SourceProvider::new(store, spec(), config()).unwrap();
    provider.prepare().unwrap();

    let images = provider.compute_variable_images(&weights(&[(0, 1.0)])).unwrap();
    assert_eq!(images["v"], Raster::filled(2, 2, 4.25));
}

#[test]
fn empty_working_set_yields_fill_rasters() {
    let (store, _log) = archive(&[("a.nc", 0.0, 1.0)]);
    let mut provider = SourceProvider::new(store, spec(), config()).unwrap();
    provider.prepare().unwrap();

    let images = provider.compute_variable_images(&HashMap::new()).unwrap();
    assert_eq!(images["v"], Raster::filled(2, 2, -9999.0));
}

#[test]
fn compute_before_prepare_is_rejected() {
    let (store, _log) = archive(&[("a.nc", 0.0, 1.0)]);
    let mut provider = SourceProvider::new(store, spec(), config()).unwrap();

    let err = provider.compute_variable_images(&weights(&[(0, 1.0)])).unwrap_err();
    assert!(matches!(err, ProviderError::NotPrepared));
}

#[test]
fn failed_prepare_leaves_provider_retryable() {
    let (store, _log) = archive(&[("a.nc", 0.0, 1.0)]);
    let mut bad_spec = spec();
    bad_spec.dir = PathBuf::from("/not-there");

    let mut provider = SourceProvider::new(store, bad_spec, config()).unwrap();
    assert!(provider.prepare().is_err());

    // still unprepared, not wedged in some half-open state
    let err = provider.compute_variable_images(&weights(&[(0, 1.0)])).unwrap_err();
    assert!(matches!(err, ProviderError::NotPrepared));
    assert!(provider.source_time_ranges().is_empty());
}

#[test]
fn close_is_idempotent_and_final() {
    let (store, log) = archive(&[("a.nc", 0.0, 1.0)]);
    let a = Path::new("/src/a.nc");

    let mut provider = SourceProvider::new(store, spec(), config()).unwrap();
    provider.prepare().unwrap();
    provider.compute_variable_images(&weights(&[(0, 1.0)])).unwrap();

    provider.close();
    let closes = log.closes_of(a);
    provider.close();
    assert_eq!(log.closes_of(a), closes, "second close releases nothing new");

    let err = provider.compute_variable_images(&weights(&[(0, 1.0)])).unwrap_err();
    assert!(matches!(err, ProviderError::Closed));
    assert!(matches!(provider.prepare().unwrap_err(), ProviderError::Closed));
}

#[test]
fn unknown_granule_index_is_rejected_without_side_effects() {
    let (store, log) = archive(&[("a.nc", 0.0, 1.0)]);
    let mut provider = SourceProvider::new(store, spec(), config()).unwrap();
    provider.prepare().unwrap();
    let base_events = log.events().len();

    let err = provider.compute_variable_images(&weights(&[(7, 1.0)])).unwrap_err();
    assert!(matches!(err, ProviderError::UnknownGranule(7)));
    assert_eq!(log.events().len(), base_events);
}

#[test]
fn descriptors_and_coverage_accessors() {
    let (store, _log) = archive(&[("a.nc", 0.0, 1.0)]);
    let provider = SourceProvider::new(store, spec(), config()).unwrap();

    let descriptors = provider.variable_descriptors();
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors["v"].fill_value, -9999.0);
    assert_eq!(provider.spatial_coverage(), (0, 0, 2, 2));
}

#[test]
fn index_is_sorted_and_stable_after_prepare() {
    let (store, _log) = archive(&[
        ("late.nc", 12.0, 3.0),
        ("early.nc", 0.0, 1.0),
        ("middle.nc", 6.0, 2.0),
    ]);
    let mut provider = SourceProvider::new(store, spec(), config()).unwrap();
    provider.prepare().unwrap();

    let starts: Vec<_> = provider.source_time_ranges().iter().map(|g| g.start).collect();
    let mut sorted = starts.clone();
    sorted.sort();
    assert_eq!(starts, sorted);
}
