//! Request and response shapes shared across handlers.

mod datatable;
mod pagination;
mod response;

pub use datatable::{
    DataTableOrder, DataTableRequest, DataTableResponse, DataTableSearch, SortDirection,
};
pub use pagination::{Paginated, PaginationMeta, PaginationParams};
pub use response::{ApiResponse, Created, MessageResponse, NoContent};
