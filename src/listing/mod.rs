//! Client-side list shaping: search, categorical filters, sort and paging.
//!
//! Everything here is a pure function of the displayed records and the
//! current `ListQuery`. Pages recompute their visible rows on every render,
//! so the shaped view can never drift from the underlying data.

use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Trait for records that can be shown on a list page.
pub trait Listable {
  /// Sortable columns
  type Column: Copy + PartialEq + std::fmt::Debug;
  /// Categorical fields usable as exact-match filters
  type Category: Copy + PartialEq + std::fmt::Debug;

  /// Text fields matched by the search box.
  fn search_fields(&self) -> Vec<&str>;

  /// Value of a categorical field, `None` when the record has none.
  fn category_value(&self, category: Self::Category) -> Option<&str>;

  /// Compare two records by a column (ascending).
  fn compare(&self, other: &Self, column: Self::Column) -> Ordering;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
  #[default]
  Ascending,
  Descending,
}

impl SortDirection {
  pub fn flip(self) -> Self {
    match self {
      SortDirection::Ascending => SortDirection::Descending,
      SortDirection::Descending => SortDirection::Ascending,
    }
  }

  pub fn arrow(self) -> &'static str {
    match self {
      SortDirection::Ascending => "▲",
      SortDirection::Descending => "▼",
    }
  }
}

/// The user's current search / filter / sort / page selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery<R: Listable> {
  pub search: String,
  pub filters: Vec<(R::Category, String)>,
  pub sort: Option<(R::Column, SortDirection)>,
  /// 1-indexed
  pub page: usize,
  pub page_size: usize,
}

impl<R: Listable> ListQuery<R> {
  pub fn new(page_size: usize) -> Self {
    Self {
      search: String::new(),
      filters: Vec::new(),
      sort: None,
      page: 1,
      page_size: page_size.max(1),
    }
  }

  /// Set (or replace) the exact-match filter for a category.
  pub fn set_filter(&mut self, category: R::Category, value: impl Into<String>) {
    self.clear_filter(category);
    self.filters.push((category, value.into()));
  }

  pub fn clear_filter(&mut self, category: R::Category) {
    self.filters.retain(|(c, _)| *c != category);
  }

  pub fn filter_value(&self, category: R::Category) -> Option<&str> {
    self
      .filters
      .iter()
      .find(|(c, _)| *c == category)
      .map(|(_, v)| v.as_str())
  }

  /// Whether a record passes the search term and every filter.
  pub fn matches(&self, record: &R) -> bool {
    let term = self.search.trim().to_lowercase();
    let search_ok = term.is_empty()
      || record
        .search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(&term));

    search_ok
      && self
        .filters
        .iter()
        .all(|(category, value)| record.category_value(*category) == Some(value.as_str()))
  }
}

/// One page of shaped rows.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView<'a, R> {
  pub rows: Vec<&'a R>,
  /// Effective 1-indexed page after clamping
  pub page: usize,
  pub page_count: usize,
  pub total_matches: usize,
}

/// Filter, sort and paginate `items`.
///
/// A page past the end (e.g. after a filter shrank the list) is clamped to
/// the last page; an empty result reports page 1 of 0.
pub fn shape<'a, R: Listable>(items: &'a [R], query: &ListQuery<R>) -> PageView<'a, R> {
  let mut matched: Vec<&R> = items.iter().filter(|r| query.matches(r)).collect();

  if let Some((column, direction)) = query.sort {
    // Stable sort keeps server order for ties
    matched.sort_by(|a, b| {
      let ord = a.compare(b, column);
      match direction {
        SortDirection::Ascending => ord,
        SortDirection::Descending => ord.reverse(),
      }
    });
  }

  let total_matches = matched.len();
  let page_size = query.page_size.max(1);
  let page_count = total_matches.div_ceil(page_size);
  let page = query.page.clamp(1, page_count.max(1));

  let rows = matched
    .into_iter()
    .skip((page - 1) * page_size)
    .take(page_size)
    .collect();

  PageView {
    rows,
    page,
    page_count,
    total_matches,
  }
}

/// Distinct values of a category, sorted, for populating filter tabs.
pub fn unique_values<R: Listable>(items: &[R], category: R::Category) -> Vec<String> {
  let values: BTreeSet<&str> = items
    .iter()
    .filter_map(|item| item.category_value(category))
    .collect();
  values.into_iter().map(String::from).collect()
}

/// Case-insensitive string comparison for `Listable::compare` impls.
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
  a.to_lowercase().cmp(&b.to_lowercase())
}

/// Total order over floats for `Listable::compare` impls.
pub fn cmp_f64(a: f64, b: f64) -> Ordering {
  a.total_cmp(&b)
}
