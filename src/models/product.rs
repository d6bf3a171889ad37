use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::models::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Produce,
    Seed,
    Fertilizer,
}

impl ProductType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductType::Produce => "produce",
            ProductType::Seed => "seed",
            ProductType::Fertilizer => "fertilizer",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "produce" => Ok(ProductType::Produce),
            "seed" => Ok(ProductType::Seed),
            "fertilizer" => Ok(ProductType::Fertilizer),
            other => Err(AppError::invalid_input(format!("Invalid product type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub owner_id: ObjectId,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub category: Option<String>,
    pub harvest_date: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub certification: Option<String>,
    #[serde(default)]
    pub verified: bool,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Farmer produce goes live immediately; everything else waits for an admin.
    pub fn verified_on_creation(owner_role: Role, product_type: ProductType) -> bool {
        owner_role == Role::Farmer && product_type == ProductType::Produce
    }

    pub fn from_request(owner_id: ObjectId, owner_role: Role, req: CreateProduct) -> Self {
        let now = Utc::now();
        Product {
            id: ObjectId::new(),
            owner_id,
            verified: Self::verified_on_creation(owner_role, req.product_type),
            name: req.name.trim().to_string(),
            price: req.price,
            quantity: req.quantity,
            product_type: req.product_type,
            category: req.category,
            harvest_date: req.harvest_date,
            image_url: req.image_url,
            certification: req.certification,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites only the fields present in `update`.
    pub fn apply(&mut self, update: &UpdateProduct) {
        if let Some(name) = &update.name {
            self.name = name.trim().to_string();
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(quantity) = update.quantity {
            self.quantity = quantity;
        }
        if let Some(category) = &update.category {
            self.category = Some(category.clone());
        }
        if let Some(harvest_date) = update.harvest_date {
            self.harvest_date = Some(harvest_date);
        }
        if let Some(image_url) = &update.image_url {
            self.image_url = Some(image_url.clone());
        }
        if let Some(certification) = &update.certification {
            self.certification = Some(certification.clone());
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,

    #[validate(range(exclusive_min = 0.0, message = "Price must be positive"))]
    pub price: f64,

    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i64,

    #[serde(rename = "type")]
    pub product_type: ProductType,

    pub category: Option<String>,
    pub harvest_date: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub certification: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduct {
    #[validate(length(min = 1, max = 120, message = "Name cannot be empty"))]
    pub name: Option<String>,

    #[validate(range(exclusive_min = 0.0, message = "Price must be positive"))]
    pub price: Option<f64>,

    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i64>,

    pub category: Option<String>,
    pub harvest_date: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub certification: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    pub category: Option<String>,
    pub seller: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyProductRequest {
    pub verified: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub category: Option<String>,
    pub harvest_date: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub certification: Option<String>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        ProductResponse {
            id: product.id.to_hex(),
            owner_id: product.owner_id.to_hex(),
            name: product.name,
            price: product.price,
            quantity: product.quantity,
            product_type: product.product_type,
            category: product.category,
            harvest_date: product.harvest_date,
            image_url: product.image_url,
            certification: product.certification,
            verified: product.verified,
            created_at: product.created_at,
        }
    }
}
