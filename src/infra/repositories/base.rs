//! Query building blocks shared by the concrete stores.

use sea_orm::{
    sea_query::{Expr, Func},
    Condition, ConnectionTrait, EntityTrait, FromQueryResult, Order, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};

use crate::errors::AppResult;
use crate::types::{DataTableRequest, DataTableResponse, PaginationParams, SortDirection};

/// Columns a data table may search and sort on.
///
/// Sorting is only ever applied through this whitelist, so client-supplied
/// column names never reach the SQL.
pub struct TableColumns<'a, E: EntityTrait> {
    /// String columns matched case-insensitively against the search term
    pub searchable: &'a [E::Column],
    /// Public column name to entity column
    pub sortable: &'a [(&'a str, E::Column)],
    /// Applied when the request names no known column
    pub default_sort: (E::Column, Order),
}

/// Run one data-table draw against `base`.
///
/// `recordsTotal` counts `base` as given; `recordsFiltered` counts it after
/// the search term is applied.
pub async fn fetch_datatable<E, C>(
    db: &C,
    base: Select<E>,
    req: &DataTableRequest,
    columns: &TableColumns<'_, E>,
) -> AppResult<DataTableResponse<E::Model>>
where
    E: EntityTrait,
    E::Model: FromQueryResult + Send + Sync + 'static,
    C: ConnectionTrait,
{
    let total = base.clone().count(db).await?;

    let filtered_query = match req.term() {
        Some(term) => base.filter(search_condition::<E>(columns.searchable, term)),
        None => base,
    };
    let filtered = filtered_query.clone().count(db).await?;

    let mut query = filtered_query;
    let mut sorted = false;
    for order in &req.order {
        if let Some((_, column)) = columns
            .sortable
            .iter()
            .find(|(name, _)| *name == order.column)
        {
            query = query.order_by(*column, direction(order.dir));
            sorted = true;
        }
    }
    if !sorted {
        let (column, order) = &columns.default_sort;
        query = query.order_by(*column, order.clone());
    }

    let rows = query
        .offset(req.offset())
        .limit(req.limit())
        .all(db)
        .await?;

    Ok(DataTableResponse::new(req.draw, total, filtered, rows))
}

/// One page of `base` plus the total row count.
pub async fn fetch_page<E, C>(
    db: &C,
    base: Select<E>,
    params: &PaginationParams,
) -> AppResult<(Vec<E::Model>, u64)>
where
    E: EntityTrait,
    E::Model: FromQueryResult + Send + Sync + 'static,
    C: ConnectionTrait,
{
    let paginator = base.paginate(db, params.limit());
    let total = paginator.num_items().await?;
    let data = paginator.fetch_page(params.page.saturating_sub(1)).await?;
    Ok((data, total))
}

fn search_condition<E: EntityTrait>(columns: &[E::Column], term: &str) -> Condition {
    let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
    columns.iter().fold(Condition::any(), |condition, column| {
        condition.add(Expr::expr(Func::lower(Expr::col((E::default(), *column)))).like(pattern.clone()))
    })
}

fn direction(dir: SortDirection) -> Order {
    match dir {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    }
}

/// Escape LIKE wildcards in user input.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_direction() {
        assert!(matches!(direction(SortDirection::Desc), Order::Desc));
        assert!(matches!(direction(SortDirection::Asc), Order::Asc));
    }
}
