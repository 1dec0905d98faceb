//! Worklist queries over registered samples.
//!
//! A worklist is a filtered, paginated view of the sample registry. Filters combine with
//! AND; an unset filter field matches everything. Pages are 1-based and there is always at
//! least one page, even when nothing matches.

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::sample::{Priority, Sample, SampleStatus};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorklistFilter {
    /// Case-insensitive substring of the patient name or PID, the sample id or the order id.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    /// Case-insensitive substring of the sample's test type.
    #[serde(default)]
    pub test_type: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub status: Option<SampleStatus>,
}

impl WorklistFilter {
    pub fn matches(&self, sample: &Sample) -> bool {
        self.matches_search(sample)
            && self.department.as_deref().map_or(true, |wanted| {
                sample
                    .department
                    .as_deref()
                    .is_some_and(|d| d.eq_ignore_ascii_case(wanted.trim()))
            })
            && self
                .test_type
                .as_deref()
                .map_or(true, |wanted| contains_ignore_case(&sample.test_type, wanted))
            && self.priority.map_or(true, |p| sample.priority == p)
            && self.status.map_or(true, |s| sample.status() == s)
    }

    fn matches_search(&self, sample: &Sample) -> bool {
        let Some(query) = self.search.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
            return true;
        };
        [
            sample.patient.name.as_str(),
            sample.patient.pid.as_str(),
            sample.sample_id.as_str(),
            sample.order_id.as_str(),
        ]
        .into_iter()
        .any(|field| contains_ignore_case(field, query))
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

/// One page of a worklist.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// The page actually returned, after clamping.
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Slice `items` into the requested 1-based page.
///
/// Page `0` is treated as page 1 and pages past the end return the last page. `page_size` is
/// clamped to `1..=MAX_PAGE_SIZE`.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);

    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total_items);
    Page {
        items: items[start..end].to_vec(),
        page,
        page_size,
        total_items,
        total_pages,
    }
}

/// A worklist cursor: the current filter and page.
///
/// Changing the filter returns to page 1, so a narrower result never leaves the operator on
/// a page that no longer exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorklistQuery {
    filter: WorklistFilter,
    page: usize,
    page_size: usize,
}

impl Default for WorklistQuery {
    fn default() -> Self {
        Self::new(WorklistFilter::default())
    }
}

impl WorklistQuery {
    pub fn new(filter: WorklistFilter) -> Self {
        Self {
            filter,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn filter(&self) -> &WorklistFilter {
        &self.filter
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_filter(&mut self, filter: WorklistFilter) {
        if filter != self.filter {
            self.filter = filter;
            self.page = 1;
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Filter `samples`, preserving their order, and return the current page.
    pub fn run(&self, samples: &[Sample]) -> Page<Sample> {
        let matching: Vec<Sample> = samples
            .iter()
            .filter(|s| self.filter.matches(s))
            .cloned()
            .collect();
        paginate(&matching, self.page, self.page_size)
    }
}
