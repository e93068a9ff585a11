//! Thread pool handle for the parallel phases of an import.
//!
//! Built once per `NodesBuilder` and passed down to the id map and the
//! accumulators; nothing runs on rayon's global pool, so two imports in
//! the same process never share workers.

use std::sync::Arc;

use crate::config::Concurrency;
use crate::error::{GraphError, Result};

#[derive(Clone)]
pub struct ImportPool {
    pool: Arc<rayon::ThreadPool>,
    concurrency: Concurrency,
}

impl ImportPool {
    pub fn new(concurrency: Concurrency) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(concurrency.value())
            .thread_name(|i| format!("rfdb-import-{i}"))
            .build()
            .map_err(|e| GraphError::Pool(format!("rayon pool: {e}")))?;
        Ok(Self {
            pool: Arc::new(pool),
            concurrency,
        })
    }

    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// Run `op` inside the pool; parallel iterators used by `op` execute
    /// on this pool's threads.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_install_runs_on_named_pool_threads() {
        let pool = ImportPool::new(Concurrency::new(2).unwrap()).unwrap();
        assert_eq!(pool.concurrency().value(), 2);

        let names: Vec<String> = pool.install(|| {
            (0..16)
                .into_par_iter()
                .map(|_| std::thread::current().name().unwrap_or_default().to_string())
                .collect()
        });
        assert!(names.iter().all(|n| n.starts_with("rfdb-import-")));
        assert_eq!(pool.install(rayon::current_num_threads), 2);
    }
}
