//! Configuration of the dependency-refresh thread pool.
//!
//! Refreshing a stale result fans out over its dependencies and joins at a
//! single point; this module owns the pool that fan-out runs on.

use anyhow::Result;

/// Thread-pool configuration for a [`QueryDatabase`].
///
/// [`QueryDatabase`]: crate::QueryDatabase
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    /// Number of worker threads for dependency refresh.
    ///
    /// `None` uses the number of CPU cores.
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    /// Build the rayon pool described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread pool cannot be created.
    pub(crate) fn build_pool(&self) -> Result<rayon::ThreadPool> {
        let mut builder = rayon::ThreadPoolBuilder::new();

        if let Some(num) = self.num_threads {
            builder = builder.num_threads(num);
        }

        Ok(builder.build()?)
    }
}
