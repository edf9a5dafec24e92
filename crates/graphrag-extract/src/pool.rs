//! Bounded worker pool (spec §4.3, §5): file-level work units are
//! independent; no worker observes another's partial state; results merge
//! into a single buffer after `.collect()`.

use std::path::PathBuf;

use rayon::{ThreadPool, ThreadPoolBuilder};

pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    pub fn new(width: usize) -> Self {
        let pool = ThreadPoolBuilder::new()
            .num_threads(width.max(1))
            .build()
            .expect("failed to build extractor worker pool");
        Self { pool }
    }

    /// Runs `work` once per file, in parallel, and flattens the per-file
    /// results into one vector. No shared mutable state crosses files
    /// beyond this return value.
    pub fn map_files<T: Send>(
        &self,
        files: &[PathBuf],
        work: impl Fn(&PathBuf) -> Vec<T> + Sync,
    ) -> Vec<T> {
        use rayon::prelude::*;
        self.pool.install(|| files.par_iter().flat_map(&work).collect())
    }

    /// Runs an arbitrary closure on this pool, so callers with work that
    /// isn't a per-file map (e.g. an extractor's separate entity and edge
    /// passes) still benefit from the bounded thread count.
    pub fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        self.pool.install(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_files_flattens_per_file_results() {
        let pool = WorkerPool::new(2);
        let files = vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")];
        let results = pool.map_files(&files, |p| vec![p.display().to_string()]);
        assert_eq!(results.len(), 3);
    }
}
