//! Engine configuration
//!
//! An immutable value constructed once at startup and passed explicitly
//! to whatever needs it - model builders and asset resolution. The core
//! performs no path discovery of its own: layer specs receive fully
//! resolved paths from here.

use std::path::{Path, PathBuf};

/// Immutable run configuration
#[derive(Clone, Debug)]
pub struct EngineConfig {
    base_path: PathBuf,
    debug: bool,
    single_layer: Option<usize>,
}

impl EngineConfig {
    /// Start building a configuration rooted at a data directory
    pub fn builder(base_path: impl Into<PathBuf>) -> EngineConfigBuilder {
        EngineConfigBuilder {
            base_path: base_path.into(),
            debug: false,
            single_layer: None,
        }
    }

    /// The data directory holding weights, biases, and images
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Whether verbose diagnostics were requested
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Restrict execution to one layer index, if requested
    pub fn single_layer(&self) -> Option<usize> {
        self.single_layer
    }

    /// Resolve a tensor file name against the base path
    pub fn tensor_path(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    /// Resolve the weight file for a named layer (`<layer>_weights.bin`)
    pub fn weight_path(&self, layer: &str) -> PathBuf {
        self.tensor_path(&format!("{layer}_weights.bin"))
    }

    /// Resolve the bias file for a named layer (`<layer>_biases.bin`)
    pub fn bias_path(&self, layer: &str) -> PathBuf {
        self.tensor_path(&format!("{layer}_biases.bin"))
    }

    /// Resolve the expected-output reference file for a layer index
    /// (`layer_<n>_output.bin`)
    pub fn reference_path(&self, index: usize) -> PathBuf {
        self.tensor_path(&format!("layer_{index}_output.bin"))
    }
}

/// Builder for [`EngineConfig`]
#[derive(Clone, Debug)]
pub struct EngineConfigBuilder {
    base_path: PathBuf,
    debug: bool,
    single_layer: Option<usize>,
}

impl EngineConfigBuilder {
    /// Enable verbose diagnostics
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Restrict execution to a single layer index
    pub fn single_layer(mut self, index: Option<usize>) -> Self {
        self.single_layer = index;
        self
    }

    /// Finalize the immutable configuration
    pub fn build(self) -> EngineConfig {
        EngineConfig {
            base_path: self.base_path,
            debug: self.debug,
            single_layer: self.single_layer,
        }
    }
}
