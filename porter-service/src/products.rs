use porter_core::models::{ListRequest, Product};
use porter_store::{DbClient, ProductRepository};

use crate::error::ServiceError;

/// Catalog listing for the storefront.
pub struct ProductService {
    db: DbClient,
}

impl ProductService {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }

    pub async fn list_products(
        &self,
        req: &ListRequest,
    ) -> Result<(Vec<Product>, i64), ServiceError> {
        let mut conn = self.db.pool.acquire().await?;
        Ok(ProductRepository::list_products(&mut conn, req).await?)
    }
}
