//! Server-side data-table protocol.
//!
//! Every `POST .../json` endpoint accepts a [`DataTableRequest`] and answers
//! with a [`DataTableResponse`].

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::{DEFAULT_DATATABLE_LENGTH, MAX_PAGE_SIZE};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DataTableSearch {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DataTableOrder {
    /// Column name to sort by; unknown names are ignored
    pub column: String,
    #[serde(default)]
    pub dir: SortDirection,
}

/// Draw request sent by the front-end table
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DataTableRequest {
    #[serde(default)]
    pub draw: u64,
    #[serde(default)]
    pub start: u64,
    #[serde(default = "default_length")]
    pub length: u64,
    #[serde(default)]
    pub search: DataTableSearch,
    #[serde(default)]
    pub order: Vec<DataTableOrder>,
}

fn default_length() -> u64 {
    DEFAULT_DATATABLE_LENGTH
}

impl Default for DataTableRequest {
    fn default() -> Self {
        Self {
            draw: 0,
            start: 0,
            length: DEFAULT_DATATABLE_LENGTH,
            search: DataTableSearch::default(),
            order: Vec::new(),
        }
    }
}

impl DataTableRequest {
    /// Rows per draw, capped at the page maximum. Zero falls back to the default.
    pub fn limit(&self) -> u64 {
        match self.length {
            0 => DEFAULT_DATATABLE_LENGTH,
            n => n.min(MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        self.start
    }

    /// Trimmed search term, `None` when blank.
    pub fn term(&self) -> Option<&str> {
        let term = self.search.value.trim();
        (!term.is_empty()).then_some(term)
    }
}

/// Rows of one draw
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTableResponse<T> {
    pub draw: u64,
    pub records_total: u64,
    pub records_filtered: u64,
    pub data: Vec<T>,
}

impl<T> DataTableResponse<T> {
    pub fn new(draw: u64, records_total: u64, records_filtered: u64, data: Vec<T>) -> Self {
        Self {
            draw,
            records_total,
            records_filtered,
            data,
        }
    }

    /// Convert the rows while keeping the counters.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> DataTableResponse<U> {
        DataTableResponse {
            draw: self.draw,
            records_total: self.records_total,
            records_filtered: self.records_filtered,
            data: self.data.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_is_capped() {
        let req: DataTableRequest =
            serde_json::from_value(serde_json::json!({"draw": 3, "length": 5000})).unwrap();
        assert_eq!(req.limit(), MAX_PAGE_SIZE);
        assert_eq!(req.draw, 3);
    }

    #[test]
    fn test_blank_search_is_none() {
        let req: DataTableRequest =
            serde_json::from_value(serde_json::json!({"search": {"value": "   "}})).unwrap();
        assert_eq!(req.term(), None);
    }

    #[test]
    fn test_response_uses_camel_case_counters() {
        let json = serde_json::to_value(DataTableResponse::new(1, 10, 2, vec![1, 2])).unwrap();
        assert_eq!(json["recordsTotal"], 10);
        assert_eq!(json["recordsFiltered"], 2);
    }

    #[test]
    fn test_rows_are_mapped_before_serializing() {
        struct Row(u32);
        let response = DataTableResponse::new(4, 2, 2, vec![Row(1), Row(2)]).map(|row| row.0 * 10);
        assert_eq!(response.draw, 4);
        assert_eq!(response.data, vec![10, 20]);
    }
}
