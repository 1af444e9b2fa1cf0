use std::path::PathBuf;

use config::{Config, Environment};
use serde::Deserialize;

use crate::batch::DEFAULT_CHUNK_SIZE;
use crate::error::{Error, Result};

const ENV_PREFIX: &str = "SDB";

/// Run settings: built-in defaults, then `SDB_*` environment variables, then CLI flags.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Defaults to the current directory.
    #[serde(default)]
    pub input_dir: Option<PathBuf>,
    /// Defaults to the input directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            input_dir: None,
            output_dir: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn from_environment(env: Environment) -> Result<Self> {
        let settings: Settings = Config::builder().add_source(env).build()?.try_deserialize()?;
        settings.validated()
    }

    pub fn with_overrides(
        mut self,
        input_dir: Option<PathBuf>,
        output_dir: Option<PathBuf>,
        chunk_size: Option<usize>,
    ) -> Result<Self> {
        if input_dir.is_some() {
            self.input_dir = input_dir;
        }
        if output_dir.is_some() {
            self.output_dir = output_dir;
        }
        if let Some(size) = chunk_size {
            self.chunk_size = size;
        }
        self.validated()
    }

    fn validated(self) -> Result<Self> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidChunkSize);
        }
        Ok(self)
    }

    pub fn input_dir(&self) -> Result<PathBuf> {
        match &self.input_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().map_err(Error::CurrentDir),
        }
    }

    pub fn output_dir(&self) -> Result<PathBuf> {
        match &self.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => self.input_dir(),
        }
    }
}
