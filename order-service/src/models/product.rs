use crate::models::Money;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed set of grocery categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Fruits,
    Vegetables,
    Dairy,
    Bakery,
    Beverages,
    Snacks,
    Staples,
    Spices,
    Meat,
    Seafood,
    Frozen,
    Household,
    PersonalCare,
}

impl Category {
    pub const ALL: [Category; 13] = [
        Category::Fruits,
        Category::Vegetables,
        Category::Dairy,
        Category::Bakery,
        Category::Beverages,
        Category::Snacks,
        Category::Staples,
        Category::Spices,
        Category::Meat,
        Category::Seafood,
        Category::Frozen,
        Category::Household,
        Category::PersonalCare,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Fruits => "fruits",
            Category::Vegetables => "vegetables",
            Category::Dairy => "dairy",
            Category::Bakery => "bakery",
            Category::Beverages => "beverages",
            Category::Snacks => "snacks",
            Category::Staples => "staples",
            Category::Spices => "spices",
            Category::Meat => "meat",
            Category::Seafood => "seafood",
            Category::Frozen => "frozen",
            Category::Household => "household",
            Category::PersonalCare => "personal-care",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
                format!("Invalid category. Must be one of: {}", names.join(", "))
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: Money,
    pub category: Category,
    pub stock: u32,
    /// Free-form pack size, e.g. "5kg" or "500ml".
    pub weight: String,
    #[serde(default)]
    pub image: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Partial update; `None` fields are left as they are.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub category: Option<Category>,
    pub stock: Option<u32>,
    pub weight: Option<String>,
    pub image: Option<String>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.category.is_none()
            && self.stock.is_none()
            && self.weight.is_none()
            && self.image.is_none()
    }
}

impl Product {
    pub fn apply(&mut self, update: ProductUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(stock) = update.stock {
            self.stock = stock;
        }
        if let Some(weight) = update.weight {
            self.weight = weight;
        }
        if let Some(image) = update.image {
            self.image = image;
        }
        self.updated_at = DateTime::now();
    }
}
