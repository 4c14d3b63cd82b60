//! The compute-backend handle kernels run under.
//!
//! Kernels take an [`Executor`] and run their parallel outer loops inside
//! [`Executor::install`]. The shared executor uses the process-global rayon
//! pool (sized by `RAYON_NUM_THREADS`); a sized executor owns a dedicated
//! pool, which pins the static row partition and with it the exact set of
//! per-thread write ranges.

/// Handle selecting the thread pool a kernel invocation runs on.
pub struct Executor {
    pool: Option<rayon::ThreadPool>,
}

impl Executor {
    /// Executor backed by the process-global rayon pool.
    #[must_use]
    pub fn shared() -> Self {
        Self { pool: None }
    }

    /// Executor backed by a dedicated pool of `num_threads` workers.
    ///
    /// # Returns
    /// * `Err(String)` if the pool cannot be built
    pub fn with_num_threads(num_threads: usize) -> Result<Self, String> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self { pool: Some(pool) })
    }

    /// Runs `op` inside this executor's pool.
    ///
    /// Parallel iterators used by `op` are scheduled on the dedicated pool
    /// when one exists, otherwise on the global pool.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    /// Number of worker threads this executor schedules onto.
    #[must_use]
    pub fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::shared()
    }
}
