//! Ordering of query results for display.

use bserlink_heap::Heap;
use std::path::PathBuf;

/// The `limit` smallest paths in byte order, smallest first.
///
/// Without a limit every path is returned, sorted.
pub fn first_sorted(files: Vec<PathBuf>, limit: Option<usize>) -> Vec<PathBuf> {
    let take = limit.unwrap_or(files.len()).min(files.len());
    let mut heap = Heap::with_capacity(files.len(), |a: &PathBuf, b: &PathBuf| {
        a.as_os_str().cmp(b.as_os_str())
    });
    for file in files {
        heap.insert(file);
    }
    std::iter::from_fn(|| heap.extract_min()).take(take).collect()
}
