use sqlx::PgConnection;

use porter_core::models::{ListRequest, Product};

use crate::error::StoreError;
use crate::query::{product_sort_field, search_pattern, sort_direction};

/// Catalog read path. Search, sort and pagination all happen in the
/// database; the planner never goes through here, it reads the joined
/// candidate view instead.
pub struct ProductRepository;

#[derive(sqlx::FromRow)]
struct ProductRow {
    product_id: i64,
    name: String,
    value: i64,
    weight: i64,
    image: String,
    description: String,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            product_id: row.product_id,
            name: row.name,
            value: row.value,
            weight: row.weight,
            image: row.image,
            description: row.description,
        }
    }
}

impl ProductRepository {
    /// Catalog listing with the shared search, sort and pagination
    /// discipline. The search text matches name or description.
    pub async fn list_products(
        conn: &mut PgConnection,
        req: &ListRequest,
    ) -> Result<(Vec<Product>, i64), StoreError> {
        let pattern = search_pattern(req);

        let where_clause = if pattern.is_some() {
            " WHERE (name LIKE $1 OR description LIKE $2)"
        } else {
            ""
        };

        let count_sql = format!("SELECT COUNT(*) FROM products{where_clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(pattern) = &pattern {
            count_query = count_query.bind(pattern.clone()).bind(pattern.clone());
        }
        let total = count_query.fetch_one(&mut *conn).await?;

        // Allowlisted column, never raw user input.
        let sort_field = product_sort_field(&req.sort_field);
        let direction = sort_direction(req);

        let order_clause = if sort_field == "product_id" {
            format!(" ORDER BY {sort_field} {direction}")
        } else {
            // Ascending identifier as the secondary key stabilizes pages
            // when the primary sort admits duplicates.
            format!(" ORDER BY {sort_field} {direction}, product_id ASC")
        };
        let limit_clause = if pattern.is_some() {
            " LIMIT $3 OFFSET $4"
        } else {
            " LIMIT $1 OFFSET $2"
        };

        let sql = format!(
            "SELECT product_id, name, value, weight, image, description \
             FROM products{where_clause}{order_clause}{limit_clause}"
        );
        let mut page_query = sqlx::query_as::<_, ProductRow>(&sql);
        if let Some(pattern) = &pattern {
            page_query = page_query.bind(pattern.clone()).bind(pattern.clone());
        }
        let rows = page_query
            .bind(req.page_size)
            .bind(req.offset)
            .fetch_all(&mut *conn)
            .await?;

        Ok((rows.into_iter().map(Product::from).collect(), total))
    }
}
