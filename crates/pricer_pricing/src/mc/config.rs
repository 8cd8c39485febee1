//! Path engine configuration.
//!
//! [`EngineConfig`] can be built fluently through [`EngineConfigBuilder`] or
//! loaded from a TOML document. Both routes validate the same way.
//!
//! ```toml
//! number_of_paths = 65536
//! threads = 0          # 0 = one worker per hardware thread
//! seed = 42
//! multithreaded = true
//! ```

use std::path::Path;

use serde::Deserialize;

use super::error::ConfigError;

/// Maximum number of simulation paths allowed.
pub const MAX_PATHS: usize = 10_000_000;

/// Maximum number of worker threads allowed.
pub const MAX_THREADS: usize = 1024;

/// Path engine configuration.
///
/// Immutable once built. Use [`EngineConfig::builder`] or
/// [`EngineConfig::from_toml_str`] to construct instances.
///
/// # Examples
///
/// ```rust
/// use pricer_pricing::mc::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .number_of_paths(8_192)
///     .threads(2)
///     .seed(7)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.number_of_paths(), 8_192);
/// assert_eq!(config.parallelism(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    number_of_paths: usize,
    threads: usize,
    seed: u64,
    multithreaded: bool,
}

impl EngineConfig {
    /// Creates a new configuration builder.
    #[inline]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Parses and validates a TOML configuration document.
    ///
    /// Missing keys fall back to the builder defaults, except
    /// `number_of_paths`, which is required.
    ///
    /// # Errors
    ///
    /// `ConfigError::ParseError` for malformed TOML, otherwise the same
    /// validation errors as [`EngineConfigBuilder::build`].
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let raw: RawEngineConfig =
            toml::from_str(s).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        raw.into_builder().build()
    }

    /// Reads and validates a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Number of simulated paths in the ensemble.
    #[inline]
    pub fn number_of_paths(&self) -> usize {
        self.number_of_paths
    }

    /// Configured worker count (0 means hardware threads).
    #[inline]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Base seed handed to random processes through the engine feature.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Whether block dispatch should use a worker pool.
    #[inline]
    pub fn multithreaded(&self) -> bool {
        self.multithreaded
    }

    /// Effective worker count: 1 when single-threaded, hardware threads when
    /// `threads == 0`, otherwise `threads`.
    pub fn parallelism(&self) -> usize {
        if !self.multithreaded {
            1
        } else if self.threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.threads
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// - `InvalidPathCount` if `number_of_paths` is 0 or above [`MAX_PATHS`]
    /// - `InvalidThreadCount` if `threads` is above [`MAX_THREADS`]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.number_of_paths == 0 || self.number_of_paths > MAX_PATHS {
            return Err(ConfigError::InvalidPathCount(self.number_of_paths));
        }
        if self.threads > MAX_THREADS {
            return Err(ConfigError::InvalidThreadCount(self.threads));
        }
        Ok(())
    }
}

/// Builder for [`EngineConfig`].
///
/// Defaults: `threads = 0`, `seed = 0`, `multithreaded = true`.
#[derive(Clone, Debug)]
pub struct EngineConfigBuilder {
    number_of_paths: Option<usize>,
    threads: usize,
    seed: u64,
    multithreaded: bool,
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self {
            number_of_paths: None,
            threads: 0,
            seed: 0,
            multithreaded: true,
        }
    }
}

impl EngineConfigBuilder {
    /// Sets the number of simulation paths.
    #[inline]
    pub fn number_of_paths(mut self, number_of_paths: usize) -> Self {
        self.number_of_paths = Some(number_of_paths);
        self
    }

    /// Sets the worker count (0 selects hardware threads).
    #[inline]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the base seed.
    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enables or disables multithreaded block dispatch.
    #[inline]
    pub fn multithreaded(mut self, multithreaded: bool) -> Self {
        self.multithreaded = multithreaded;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `number_of_paths` is not set or any value
    /// fails [`EngineConfig::validate`].
    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        let number_of_paths = self.number_of_paths.ok_or(ConfigError::InvalidParameter {
            name: "number_of_paths",
            value: "must be specified".to_string(),
        })?;

        let config = EngineConfig {
            number_of_paths,
            threads: self.threads,
            seed: self.seed,
            multithreaded: self.multithreaded,
        };

        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEngineConfig {
    number_of_paths: Option<usize>,
    threads: Option<usize>,
    seed: Option<u64>,
    multithreaded: Option<bool>,
}

impl RawEngineConfig {
    fn into_builder(self) -> EngineConfigBuilder {
        let mut builder = EngineConfigBuilder::default();
        builder.number_of_paths = self.number_of_paths;
        if let Some(threads) = self.threads {
            builder = builder.threads(threads);
        }
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        if let Some(multithreaded) = self.multithreaded {
            builder = builder.multithreaded(multithreaded);
        }
        builder
    }
}
