use crate::models::{Category, Money, Product, ProductUpdate};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

fn parse_category(raw: &str) -> Result<Category, AppError> {
    raw.parse()
        .map_err(|e: String| AppError::BadRequest(anyhow::anyhow!(e)))
}

fn positive_price(price: Money) -> Result<Money, AppError> {
    if price.is_zero() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Price must be greater than zero"
        )));
    }
    Ok(price)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub category: String,
    pub stock: u32,
    #[validate(length(min = 1, message = "Weight is required"))]
    pub weight: String,
    #[serde(default)]
    pub image: String,
}

impl CreateProductRequest {
    /// Validate and build the record to insert.
    pub fn into_product(self, id: String) -> Result<Product, AppError> {
        self.validate()?;
        let category = parse_category(&self.category)?;
        let price = positive_price(self.price)?;
        let now = mongodb::bson::DateTime::now();
        Ok(Product {
            id,
            name: self.name.trim().to_string(),
            description: self.description,
            price,
            category,
            stock: self.stock,
            weight: self.weight,
            image: self.image,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub category: Option<String>,
    pub stock: Option<u32>,
    pub weight: Option<String>,
    pub image: Option<String>,
}

impl TryFrom<UpdateProductRequest> for ProductUpdate {
    type Error = AppError;

    fn try_from(req: UpdateProductRequest) -> Result<Self, Self::Error> {
        req.validate()?;
        Ok(ProductUpdate {
            name: req.name.map(|n| n.trim().to_string()),
            description: req.description,
            price: req.price.map(positive_price).transpose()?,
            category: req.category.as_deref().map(parse_category).transpose()?,
            stock: req.stock,
            weight: req.weight,
            image: req.image,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
}

impl ProductQuery {
    pub fn category(&self) -> Result<Option<Category>, AppError> {
        self.category.as_deref().map(parse_category).transpose()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub category: Category,
    pub stock: u32,
    pub weight: String,
    pub image: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price: p.price,
            category: p.category,
            stock: p.stock,
            weight: p.weight,
            image: p.image,
            created_at: p.created_at.to_string(),
            updated_at: p.updated_at.to_string(),
        }
    }
}
