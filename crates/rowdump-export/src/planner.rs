//! Pagination planning
//!
//! Splits a record count into fixed-size page fetches.

use crate::error::{ExportError, Result};
use serde::{Deserialize, Serialize};

/// One unit of scheduled work: "fetch page `index`"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageTask {
    /// Zero-based page index, also the slot of the page in the results
    pub index: usize,
    /// Records per page, shared by every task of a plan
    pub page_size: u64,
}

impl PageTask {
    pub fn new(index: usize, page_size: u64) -> Self {
        Self { index, page_size }
    }

    /// Offset of the first record of this page
    pub fn offset(&self) -> u64 {
        self.index as u64 * self.page_size
    }

    /// Maximum number of records on this page
    pub fn limit(&self) -> u64 {
        self.page_size
    }
}

/// Number of pages needed to cover `total` records, rounding up
pub fn page_count(total: u64, page_size: u64) -> Result<u64> {
    if page_size == 0 {
        return Err(ExportError::invalid_argument("page size must be at least 1"));
    }
    Ok(total.div_ceil(page_size))
}

/// Produce one task per page, indices `0..page_count(total, page_size)`
///
/// `total == 0` yields no tasks; `page_size >= total` yields exactly one.
pub fn plan(total: u64, page_size: u64) -> Result<Vec<PageTask>> {
    let pages = page_count(total, page_size)?;
    let pages = usize::try_from(pages).map_err(|_| {
        ExportError::invalid_argument(format!("{} pages do not fit in memory", pages))
    })?;

    Ok((0..pages).map(|index| PageTask::new(index, page_size)).collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_remainder_page_is_kept() {
        let tasks = plan(1001, 200).unwrap();
        assert_eq!(tasks.len(), 6);
        assert_eq!(tasks[5].offset(), 1000);
        assert_eq!(tasks[5].limit(), 200);
    }

    #[test]
    fn test_exact_division() {
        let tasks = plan(1000, 200).unwrap();
        assert_eq!(tasks.len(), 5);
        let offsets: Vec<u64> = tasks.iter().map(PageTask::offset).collect();
        assert_eq!(offsets, vec![0, 200, 400, 600, 800]);
    }

    #[test]
    fn test_empty_dataset_has_no_tasks() {
        assert!(plan(0, 50).unwrap().is_empty());
    }

    #[test]
    fn test_page_larger_than_dataset() {
        let tasks = plan(10, 200).unwrap();
        assert_eq!(tasks, vec![PageTask::new(0, 200)]);
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        assert!(matches!(plan(10, 0), Err(ExportError::InvalidArgument(_))));
        assert!(matches!(page_count(0, 0), Err(ExportError::InvalidArgument(_))));
    }

    proptest! {
        #[test]
        fn prop_task_count_is_ceiling(total in 0u64..100_000, page_size in 1u64..5_000) {
            let tasks = plan(total, page_size).unwrap();
            let expected = (total + page_size - 1) / page_size;
            prop_assert_eq!(tasks.len() as u64, expected);
            prop_assert_eq!(tasks.is_empty(), total == 0);
        }

        #[test]
        fn prop_tasks_cover_every_record_once(total in 1u64..20_000, page_size in 1u64..1_000) {
            let tasks = plan(total, page_size).unwrap();
            for (i, task) in tasks.iter().enumerate() {
                prop_assert_eq!(task.index, i);
                prop_assert_eq!(task.page_size, page_size);
                prop_assert!(task.offset() < total);
            }
            let last = tasks.last().unwrap();
            prop_assert!(last.offset() + last.limit() >= total);
        }
    }
}
