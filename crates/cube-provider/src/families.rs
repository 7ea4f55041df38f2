//! Shipped source family configurations.
//!
//! Each function builds the [`SourceSpec`] for one supported archive. The
//! specs differ only in strategy values (filename filter, time decoding
//! rule, variable metadata, resampling policy); the provider machinery is
//! shared. Units strings are pinned here where the archives are known to
//! declare questionable epochs in-file.

use crate::index::{FilenameFilter, TimeAxisRule, TimeCoding};
use crate::provider::SourceSpec;
use crate::resample::ResamplePolicy;
use chrono::Duration;
use cube_common::{BoundingBox, Calendar, DataType, GridSpec, VariableDescriptor};
use std::path::PathBuf;

/// 2-metre air temperature, 6-hourly granules in one file per year
/// (`t2m_<year>.nc`).
///
/// The native grid carries 721 latitude rows at 0.25 degrees; the
/// southernmost row is cropped away to match the 720-row cube grid.
pub fn air_temperature(dir: impl Into<PathBuf>) -> SourceSpec {
    let mut t2m = VariableDescriptor::new("t2m", "t2m", DataType::Float32, -32767.0, "K");
    t2m.scale_factor = 0.001_971_820_293_842_892_3;
    t2m.add_offset = 259.267_873_953_134_3;
    t2m.long_name = Some("2 metre temperature".to_string());

    SourceSpec {
        name: "air_temperature".to_string(),
        dir: dir.into(),
        filter: FilenameFilter::YearToken,
        time: TimeCoding {
            variable: "time".to_string(),
            units: Some("hours since 1900-01-01 00:00:0.0".to_string()),
            calendar: Calendar::Gregorian,
            rule: TimeAxisRule::InstantPlusInterval {
                interval: Duration::hours(6),
            },
        },
        variables: vec![t2m],
        native_grid: GridSpec::new(1440, 721, BoundingBox::new(0.0, -90.125, 360.0, 90.125)),
        policy: ResamplePolicy::Crop {
            x_offset: 0,
            y_offset: 0,
        },
    }
}

/// Monthly burnt area, with explicit per-granule time bounds.
pub fn burnt_area(dir: impl Into<PathBuf>) -> SourceSpec {
    let mut burned = VariableDescriptor::new(
        "burned_area",
        "BurntArea",
        DataType::Float32,
        -9999.0,
        "hectares",
    );
    burned.standard_name = Some("burned_area".to_string());
    burned.references = Some(
        "Giglio, Louis, James T. Randerson, and Guido R. Werf. \"Analysis of daily, \
         monthly, and annual burned area using the fourth-generation global fire \
         emissions database (GFED4).\" Journal of Geophysical Research: \
         Biogeosciences 118.1 (2013): 317-328."
            .to_string(),
    );
    burned.comment = Some("Burnt Area based on the GFED4 fire product.".to_string());
    burned.url = Some("http://www.globalfiredata.org/".to_string());

    SourceSpec {
        name: "burnt_area".to_string(),
        dir: dir.into(),
        filter: FilenameFilter::Any,
        time: TimeCoding {
            variable: "time_bnds".to_string(),
            // in-file epoch ('days since 1582-10-14') is suspect; pinned
            // pending review with the data producers
            units: Some("days since 1582-10-24 00:00".to_string()),
            calendar: Calendar::Gregorian,
            rule: TimeAxisRule::ExplicitBounds,
        },
        variables: vec![burned],
        native_grid: GridSpec::global_quarter_degree(),
        policy: ResamplePolicy::Identity,
    }
}

/// Monthly soil moisture, gzip-compressed granules (`*.nc.gz`) whose time
/// axis only records period starts.
pub fn soil_moisture(dir: impl Into<PathBuf>) -> SourceSpec {
    let mut moisture = VariableDescriptor::new(
        "SoilMoisture",
        "SoilMoisture",
        DataType::Float32,
        -9999.0,
        "m3",
    );
    moisture.long_name = Some("Soil moisture".to_string());

    SourceSpec {
        name: "soil_moisture".to_string(),
        dir: dir.into(),
        filter: FilenameFilter::Suffix(".nc.gz"),
        time: TimeCoding {
            variable: "time".to_string(),
            units: Some("days since 1582-10-15 00:00".to_string()),
            calendar: Calendar::Gregorian,
            rule: TimeAxisRule::ConsecutiveInstants {
                trailing: Duration::days(31),
            },
        },
        variables: vec![moisture],
        native_grid: GridSpec::global_quarter_degree(),
        policy: ResamplePolicy::Identity,
    }
}
