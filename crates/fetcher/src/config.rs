//! Configuration types for the fetch engine

use std::time::Duration;

use crate::core::error::{FetchError, Result};

/// Configuration for a fetch batch
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Limit for establishing a connection. There is no whole-request
    /// timeout; only the cancellation token ends a slow transfer.
    pub connect_timeout: Duration,
    /// How long idle pooled connections are kept
    pub pool_idle_timeout: Duration,
    pub user_agent: String,
    /// Content-Type accepted in addition to a missing one
    pub expected_content_type: String,
    /// Extension of written files, without the dot
    pub file_extension: String,
    /// Largest chunk moved between cancellation checks
    pub copy_buffer_size: usize,
    /// `None` starts every item at once; `Some(n)` runs at most `n` fetches at a time
    pub max_concurrent: Option<usize>,
    /// Delete a destination file left incomplete by a failed or cancelled fetch
    pub remove_partial_files: bool,
}

impl FetchConfig {
    pub fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder::default()
    }

    /// Check the values that would make a batch impossible to run
    pub fn validate(&self) -> Result<()> {
        if self.copy_buffer_size == 0 {
            return Err(invalid("copy buffer size must be at least one byte", "copy_buffer_size"));
        }
        if self.max_concurrent == Some(0) {
            return Err(invalid("max concurrent fetches must be at least 1", "max_concurrent"));
        }
        if self.file_extension.trim_start_matches('.').is_empty() {
            return Err(invalid("file extension must not be empty", "file_extension"));
        }
        Ok(())
    }
}

fn invalid(message: &str, field: &str) -> FetchError {
    FetchError::Configuration {
        message: message.to_string(),
        field: Some(field.to_string()),
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: concat!("fetcher/", env!("CARGO_PKG_VERSION")).to_string(),
            expected_content_type: "application/pdf".to_string(),
            file_extension: "pdf".to_string(),
            copy_buffer_size: 64 * 1024,
            max_concurrent: None,
            remove_partial_files: true,
        }
    }
}

/// Builder for `FetchConfig`
#[derive(Debug, Clone, Default)]
pub struct FetchConfigBuilder {
    config: FetchConfig,
}

impl FetchConfigBuilder {
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn expected_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.config.expected_content_type = content_type.into();
        self
    }

    pub fn file_extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.config.file_extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn copy_buffer_size(mut self, size: usize) -> Self {
        self.config.copy_buffer_size = size;
        self
    }

    pub fn max_concurrent(mut self, limit: Option<usize>) -> Self {
        self.config.max_concurrent = limit;
        self
    }

    pub fn remove_partial_files(mut self, remove: bool) -> Self {
        self.config.remove_partial_files = remove;
        self
    }

    pub fn build(self) -> Result<FetchConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
