//! Typed run configuration: a `Config`/method-chaining `Builder` pair.

use crate::error::ConfigError;

/// Which execution path computes the tessellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    Cpu,
    Gpu,
}

impl Default for DeviceKind {
    fn default() -> Self {
        DeviceKind::Cpu
    }
}

/// Run configuration for a tessellation pass. Build via [`Builder`] or
/// `Config::default()`.
#[derive(Clone, Debug)]
pub struct Config {
    pub k: usize,
    pub device: DeviceKind,
    pub cpu_nthreads: usize,
    pub gpu_ndsize: usize,
    pub chunksize: usize,
    pub use_chunking: bool,
    pub use_recompute: bool,
    pub knn_grid_resolution: usize,
    pub cc_p_maxsize: usize,
    pub cc_t_maxsize: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            k: 64,
            device: DeviceKind::Cpu,
            cpu_nthreads: 0,
            gpu_ndsize: 1,
            chunksize: 8196,
            use_chunking: false,
            use_recompute: false,
            knn_grid_resolution: 16,
            cc_p_maxsize: 32,
            cc_t_maxsize: 32,
        }
    }
}

impl Config {
    /// Resolves `k == 0` ("auto") to `min(n_points, 64)`.
    pub fn resolve_k(&mut self, n_points: usize) {
        if self.k == 0 {
            self.k = n_points.min(64);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.knn_grid_resolution == 0 {
            return Err(ConfigError::ZeroGridResolution);
        }
        if self.cc_p_maxsize == 0 || self.cc_p_maxsize > 255 {
            return Err(ConfigError::InvalidPlaneCapacity(self.cc_p_maxsize));
        }
        if self.cc_t_maxsize == 0 {
            return Err(ConfigError::ZeroTriangleCapacity);
        }
        if self.k == 0 {
            return Err(ConfigError::ZeroK);
        }
        Ok(())
    }
}

/// Method-chaining builder for [`Config`].
#[derive(Clone, Debug, Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Self {
        Builder {
            config: Config::default(),
        }
    }

    pub fn k(mut self, k: usize) -> Self {
        self.config.k = k;
        self
    }

    pub fn device(mut self, device: DeviceKind) -> Self {
        self.config.device = device;
        self
    }

    pub fn cpu_nthreads(mut self, n: usize) -> Self {
        self.config.cpu_nthreads = n;
        self
    }

    pub fn gpu_ndsize(mut self, n: usize) -> Self {
        self.config.gpu_ndsize = n;
        self
    }

    pub fn chunksize(mut self, n: usize) -> Self {
        self.config.chunksize = n;
        self
    }

    pub fn use_chunking(mut self, v: bool) -> Self {
        self.config.use_chunking = v;
        self
    }

    pub fn use_recompute(mut self, v: bool) -> Self {
        self.config.use_recompute = v;
        self
    }

    pub fn knn_grid_resolution(mut self, n: usize) -> Self {
        self.config.knn_grid_resolution = n;
        self
    }

    pub fn cc_p_maxsize(mut self, n: usize) -> Self {
        self.config.cc_p_maxsize = n;
        self
    }

    pub fn cc_t_maxsize(mut self, n: usize) -> Self {
        self.config.cc_t_maxsize = n;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
