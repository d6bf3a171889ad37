use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use tracing::info;
use validator::Validate;

use crate::database::store::{MarketStore, ProductFilter};
use crate::errors::{AppError, Result};
use crate::models::product::{CreateProduct, Product, ProductQuery, ProductResponse, UpdateProduct};
use crate::models::user::Claims;

#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn MarketStore>,
}

impl ProductService {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        ProductService { store }
    }

    pub async fn create(&self, actor: &Claims, payload: CreateProduct) -> Result<ProductResponse> {
        payload.validate()?;

        let owner = self
            .store
            .find_user(&actor.user_id()?)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        if !owner.role.can_sell() {
            return Err(AppError::forbidden("Only farmers and suppliers can list products"));
        }
        if owner.blocked {
            return Err(AppError::forbidden("Account is blocked"));
        }
        if !owner.approved {
            return Err(AppError::forbidden("Account is awaiting admin approval"));
        }

        let product = Product::from_request(owner.id, owner.role, payload);
        self.store.insert_product(&product).await?;

        info!(
            "🌽 {} listed '{}' ({} units, verified: {})",
            owner.name, product.name, product.quantity, product.verified
        );
        Ok(product.into())
    }

    /// Public catalogue: verified listings only.
    pub async fn list_public(&self, query: ProductQuery) -> Result<Vec<ProductResponse>> {
        let filter = ProductFilter {
            owner_id: query.seller.as_deref().map(ObjectId::parse_str).transpose()?,
            product_type: query.product_type.as_deref().map(str::parse).transpose()?,
            category: query.category,
            verified: Some(true),
        };
        let products = self.store.list_products(&filter).await?;
        Ok(products.into_iter().map(ProductResponse::from).collect())
    }

    pub async fn list_mine(&self, actor: &Claims) -> Result<Vec<ProductResponse>> {
        let filter = ProductFilter {
            owner_id: Some(actor.user_id()?),
            ..Default::default()
        };
        let products = self.store.list_products(&filter).await?;
        Ok(products.into_iter().map(ProductResponse::from).collect())
    }

    pub async fn get(&self, product_id: &str) -> Result<ProductResponse> {
        let id = ObjectId::parse_str(product_id)?;
        self.store
            .find_product(&id)
            .await?
            .map(ProductResponse::from)
            .ok_or_else(|| AppError::not_found("Product"))
    }

    pub async fn update(
        &self,
        actor: &Claims,
        product_id: &str,
        payload: UpdateProduct,
    ) -> Result<ProductResponse> {
        payload.validate()?;
        let product = self.owned_product(actor, product_id).await?;
        self.store
            .update_product(&product.id, &payload)
            .await?
            .map(ProductResponse::from)
            .ok_or_else(|| AppError::not_found("Product"))
    }

    pub async fn delete(&self, actor: &Claims, product_id: &str) -> Result<()> {
        let product = self.owned_product(actor, product_id).await?;
        if !self.store.delete_product(&product.id).await? {
            return Err(AppError::not_found("Product"));
        }
        info!("🗑️ Product {} deleted by its owner", product.id.to_hex());
        Ok(())
    }

    async fn owned_product(&self, actor: &Claims, product_id: &str) -> Result<Product> {
        let id = ObjectId::parse_str(product_id)?;
        let product = self
            .store
            .find_product(&id)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;

        if product.owner_id != actor.user_id()? {
            return Err(AppError::forbidden("Only the owner can modify this product"));
        }
        Ok(product)
    }
}
