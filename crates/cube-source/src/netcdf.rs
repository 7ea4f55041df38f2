//! NetCDF-backed raster store.
//!
//! Gzip-compressed granules (`.nc.gz`) are decompressed into a temp file
//! before opening, since libnetcdf needs a real file path. The spill file
//! lives exactly as long as the open dataset handle.

use crate::dataset::{RasterStore, SourceDataset, TimeAxis, TimeBounds};
use crate::{SourceError, SourceResult};
use cube_common::Raster;
use flate2::read::GzDecoder;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;

impl From<netcdf::Error> for SourceError {
    fn from(err: netcdf::Error) -> Self {
        SourceError::NetCdf(err.to_string())
    }
}

/// Opens NetCDF source files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetcdfStore;

/// One open NetCDF dataset.
pub struct NetcdfDataset {
    file: netcdf::File,
    /// Keeps the decompression spill alive for gz granules.
    _spill: Option<NamedTempFile>,
}

impl RasterStore for NetcdfStore {
    type Dataset = NetcdfDataset;

    fn list(&self, dir: &Path) -> SourceResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                SourceError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::Other, "directory walk failed")
                }))
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    fn open(&self, path: &Path) -> SourceResult<NetcdfDataset> {
        let is_gzip = path.to_string_lossy().ends_with(".nc.gz");

        let (file, spill) = if is_gzip {
            let spill = spill_gzip(path)?;
            let file = netcdf::open(spill.path())?;
            (file, Some(spill))
        } else {
            (netcdf::open(path)?, None)
        };

        debug!(path = %path.display(), gzip = is_gzip, "opened source dataset");
        Ok(NetcdfDataset {
            file,
            _spill: spill,
        })
    }
}

/// Decompress a gzip granule into a temp file libnetcdf can open.
fn spill_gzip(path: &Path) -> SourceResult<NamedTempFile> {
    let input = std::fs::File::open(path)?;
    let mut decoder = GzDecoder::new(BufReader::new(input));
    let mut spill = tempfile::Builder::new().suffix(".nc").tempfile()?;
    std::io::copy(&mut decoder, &mut spill)?;
    Ok(spill)
}

impl SourceDataset for NetcdfDataset {
    fn time_axis(&self, variable: &str) -> SourceResult<TimeAxis> {
        let var = self
            .file
            .variable(variable)
            .ok_or_else(|| SourceError::MissingVariable(variable.to_string()))?;

        let values: Vec<f64> = var.get_values(..)?;
        Ok(TimeAxis {
            values,
            units: get_str_attr(&var, "units"),
            calendar: get_str_attr(&var, "calendar"),
        })
    }

    fn time_bounds(&self, variable: &str) -> SourceResult<TimeBounds> {
        let var = self
            .file
            .variable(variable)
            .ok_or_else(|| SourceError::MissingVariable(variable.to_string()))?;

        let values: Vec<f64> = var.get_values(..)?;
        if values.len() % 2 != 0 {
            return Err(SourceError::InvalidLayout {
                variable: variable.to_string(),
                message: format!("expected (time, 2) bounds, got {} values", values.len()),
            });
        }

        // (time, 2) row-major: start/end pairs interleave
        let starts = values.iter().copied().step_by(2).collect();
        let ends = values.iter().copied().skip(1).step_by(2).collect();
        Ok(TimeBounds {
            starts,
            ends,
            units: get_str_attr(&var, "units"),
            calendar: get_str_attr(&var, "calendar"),
        })
    }

    fn read_slice(&self, variable: &str, time_index: usize) -> SourceResult<Raster> {
        let var = self
            .file
            .variable(variable)
            .ok_or_else(|| SourceError::MissingVariable(variable.to_string()))?;

        let dims = var.dimensions();
        if dims.len() != 3 {
            return Err(SourceError::InvalidLayout {
                variable: variable.to_string(),
                message: format!("expected (time, y, x) layout, got {} dimensions", dims.len()),
            });
        }
        let height = dims[1].len();
        let width = dims[2].len();

        let raw: Vec<f32> = var.get_values((time_index, .., ..))?;

        let scale_factor = get_f32_attr(&var, "scale_factor").unwrap_or(1.0);
        let add_offset = get_f32_attr(&var, "add_offset").unwrap_or(0.0);
        let fill_value = get_f32_attr(&var, "_FillValue")
            .or_else(|| get_f32_attr(&var, "missing_value"));

        let data: Vec<f32> = raw
            .iter()
            .map(|&v| {
                if Some(v) == fill_value {
                    f32::NAN
                } else {
                    v * scale_factor + add_offset
                }
            })
            .collect();

        Ok(Raster::new(width, height, data))
    }
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_str_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

fn get_f32_attr(var: &netcdf::Variable, name: &str) -> Option<f32> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f32::try_from(attr_value).ok()
}
