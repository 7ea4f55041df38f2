//! Provider contract and the shared provider implementation.
//!
//! One concrete provider type serves every source family; the differences
//! between archives live entirely in [`SourceSpec`] strategy values (time
//! decoding rule, filename filter, variable set, resampling policy).

use crate::aggregate::blend;
use crate::cache::DatasetCache;
use crate::error::{ProviderError, Result};
use crate::index::{build_index, FilenameFilter, Granule, TimeCoding};
use crate::resample::{crop, resample_nearest, ResamplePolicy};
use cube_common::{CubeConfig, GridSpec, Raster, VariableDescriptor};
use cube_source::{RasterStore, SourceDataset};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, info};

/// The contract between the external scheduler and one source provider.
///
/// Lifecycle: Constructed -> Prepared -> Computing (repeatable) -> Closed.
/// The scheduler calls [`prepare`] once, then [`compute_variable_images`]
/// once per output time step in increasing order, then [`close`]. Calls are
/// strictly sequential; no concurrent use of one provider instance.
///
/// [`prepare`]: CubeSourceProvider::prepare
/// [`compute_variable_images`]: CubeSourceProvider::compute_variable_images
/// [`close`]: CubeSourceProvider::close
pub trait CubeSourceProvider {
    /// Build the granule index.
    ///
    /// On error the provider stays unprepared and the call may be retried.
    fn prepare(&mut self) -> Result<()>;

    /// Static metadata for every variable this provider produces, keyed by
    /// output name.
    fn variable_descriptors(&self) -> HashMap<String, VariableDescriptor>;

    /// Compute the rasters of one output time step from the scheduler's
    /// granule-index to overlap-weight mapping.
    ///
    /// An empty mapping is not an error: it yields an all-fill raster per
    /// variable so the cube writer always receives a complete step.
    fn compute_variable_images(
        &mut self,
        index_to_weight: &HashMap<usize, f64>,
    ) -> Result<HashMap<String, Raster>>;

    /// The granule index, for the scheduler to compute per-step overlaps
    /// and weights. Empty before [`prepare`] succeeds.
    ///
    /// [`prepare`]: CubeSourceProvider::prepare
    fn source_time_ranges(&self) -> &[Granule];

    /// Sub-window `(x, y, width, height)` of the cube grid this provider
    /// populates.
    fn spatial_coverage(&self) -> (usize, usize, usize, usize);

    /// Release every cached file handle. Idempotent, and must succeed even
    /// after a failed compute call left handles open.
    fn close(&mut self);
}

/// Per-family configuration: everything that distinguishes one source
/// archive from another.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    /// Family name, used in logs and error messages
    pub name: String,
    /// Directory holding the family's source files
    pub dir: PathBuf,
    pub filter: FilenameFilter,
    pub time: TimeCoding,
    /// Variables extracted from each granule
    pub variables: Vec<VariableDescriptor>,
    /// Grid the source files natively use
    pub native_grid: GridSpec,
    pub policy: ResamplePolicy,
}

impl SourceSpec {
    /// Check the configured cube grid against this family's resampling
    /// capability.
    ///
    /// Fails fast with a descriptive error; an unsupported grid must never
    /// silently degrade data quality.
    pub fn validate(&self, config: &CubeConfig) -> Result<()> {
        let cube = config.grid();
        match self.policy {
            ResamplePolicy::Identity => {
                if self.native_grid.width != cube.width || self.native_grid.height != cube.height
                {
                    return Err(ProviderError::UnsupportedGrid {
                        source: self.name.clone(),
                        message: format!(
                            "native grid {}x{} must equal cube grid {}x{}; \
                             this family does not implement spatial aggregation",
                            self.native_grid.width, self.native_grid.height, cube.width, cube.height
                        ),
                    });
                }
            }
            ResamplePolicy::Crop { x_offset, y_offset } => {
                if !self.native_grid.same_resolution(&cube) {
                    return Err(ProviderError::UnsupportedGrid {
                        source: self.name.clone(),
                        message: "crop fast path requires matching resolution".to_string(),
                    });
                }
                if x_offset + cube.width > self.native_grid.width
                    || y_offset + cube.height > self.native_grid.height
                {
                    return Err(ProviderError::UnsupportedGrid {
                        source: self.name.clone(),
                        message: format!(
                            "crop window {}x{} at offset ({}, {}) exceeds native grid {}x{}",
                            cube.width,
                            cube.height,
                            x_offset,
                            y_offset,
                            self.native_grid.width,
                            self.native_grid.height
                        ),
                    });
                }
            }
            ResamplePolicy::Nearest => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProviderState {
    Constructed,
    Prepared,
    Closed,
}

/// Shared provider implementation, parameterized by a [`SourceSpec`].
pub struct SourceProvider<S: RasterStore> {
    spec: SourceSpec,
    config: CubeConfig,
    cache: DatasetCache<S>,
    index: Vec<Granule>,
    /// Working set of the immediately preceding compute call
    previous: HashSet<usize>,
    state: ProviderState,
}

impl<S: RasterStore> SourceProvider<S> {
    /// Create a provider.
    ///
    /// Fails immediately if the cube grid is outside the family's declared
    /// resampling support.
    pub fn new(store: S, spec: SourceSpec, config: CubeConfig) -> Result<Self> {
        spec.validate(&config)?;
        Ok(Self {
            spec,
            config,
            cache: DatasetCache::new(store),
            index: Vec::new(),
            previous: HashSet::new(),
            state: ProviderState::Constructed,
        })
    }

    fn extract_slice(&mut self, granule_index: usize, source_name: &str) -> Result<Raster> {
        let granule = &self.index[granule_index];
        let dataset = self.cache.acquire(&granule.path)?;
        Ok(dataset.read_slice(source_name, granule.time_index)?)
    }

    /// Resample per policy, then substitute the declared fill value for any
    /// cell still missing.
    fn finalize(&self, raster: Raster, descriptor: &VariableDescriptor) -> Raster {
        let cube = self.config.grid();
        let mut out = match self.spec.policy {
            ResamplePolicy::Identity => raster,
            ResamplePolicy::Crop { x_offset, y_offset } => {
                crop(&raster, x_offset, y_offset, cube.width, cube.height)
            }
            ResamplePolicy::Nearest => {
                resample_nearest(&raster, &self.spec.native_grid, &cube, f32::NAN)
            }
        };
        out.fill_missing(descriptor.fill_value);
        out
    }
}

impl<S: RasterStore> CubeSourceProvider for SourceProvider<S> {
    fn prepare(&mut self) -> Result<()> {
        match self.state {
            ProviderState::Closed => return Err(ProviderError::Closed),
            ProviderState::Prepared => return Ok(()),
            ProviderState::Constructed => {}
        }

        let window = self.config.time_window();
        let index = build_index(
            self.cache.store(),
            &self.spec.dir,
            &self.spec.filter,
            &self.spec.time,
            &window,
        )?;

        info!(source = %self.spec.name, granules = index.len(), "prepared provider");
        self.index = index;
        self.state = ProviderState::Prepared;
        Ok(())
    }

    fn variable_descriptors(&self) -> HashMap<String, VariableDescriptor> {
        self.spec
            .variables
            .iter()
            .map(|d| (d.output_name.clone(), d.clone()))
            .collect()
    }

    fn compute_variable_images(
        &mut self,
        index_to_weight: &HashMap<usize, f64>,
    ) -> Result<HashMap<String, Raster>> {
        match self.state {
            ProviderState::Constructed => return Err(ProviderError::NotPrepared),
            ProviderState::Closed => return Err(ProviderError::Closed),
            ProviderState::Prepared => {}
        }

        // validate up front so a bad index mutates nothing
        for &i in index_to_weight.keys() {
            if i >= self.index.len() {
                return Err(ProviderError::UnknownGranule(i));
            }
        }

        let new_set: HashSet<usize> = index_to_weight.keys().copied().collect();

        // release handles only the previous step still held
        let mut released = 0usize;
        for &i in &self.previous {
            if !new_set.contains(&i) {
                let path = self.index[i].path.clone();
                self.cache.release(&path);
                released += 1;
            }
        }
        self.previous = new_set;

        let cube = self.config.grid();
        let mut images = HashMap::new();

        if self.previous.is_empty() {
            debug!(source = %self.spec.name, "empty working set, producing fill rasters");
            for descriptor in &self.spec.variables {
                images.insert(
                    descriptor.output_name.clone(),
                    Raster::filled(cube.width, cube.height, descriptor.fill_value),
                );
            }
            return Ok(images);
        }

        let mut indices: Vec<usize> = self.previous.iter().copied().collect();
        indices.sort_unstable();

        let variables = self.spec.variables.clone();
        for descriptor in &variables {
            let raster = if indices.len() == 1 {
                self.extract_slice(indices[0], &descriptor.source_name)?
            } else {
                let mut slices = Vec::with_capacity(indices.len());
                let mut weights = Vec::with_capacity(indices.len());
                for &i in &indices {
                    slices.push(self.extract_slice(i, &descriptor.source_name)?);
                    weights.push(index_to_weight[&i]);
                }
                blend(&slices, &weights)
            };
            images.insert(descriptor.output_name.clone(), self.finalize(raster, descriptor));
        }

        debug!(
            source = %self.spec.name,
            granules = indices.len(),
            released = released,
            open_handles = self.cache.open_count(),
            "computed variable images"
        );
        Ok(images)
    }

    fn source_time_ranges(&self) -> &[Granule] {
        &self.index
    }

    fn spatial_coverage(&self) -> (usize, usize, usize, usize) {
        (0, 0, self.config.grid_width, self.config.grid_height)
    }

    fn close(&mut self) {
        self.cache.release_all();
        self.state = ProviderState::Closed;
    }
}
