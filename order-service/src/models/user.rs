use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

/// Identity record. Read-only from the order workflow's point of view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    /// Identity-provider id; unique and immutable after signup.
    pub external_id: String,
    /// Phone number; unique. This is the buyer key at the HTTP boundary.
    pub number: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub addresses: Vec<Address>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    /// System-assigned.
    pub id: String,
    pub line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

/// Fields a profile update may change. `None` leaves the field untouched;
/// `addresses` replaces the whole set.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub number: Option<String>,
    pub image: Option<String>,
    pub addresses: Option<Vec<Address>>,
}

impl User {
    pub fn apply(&mut self, update: UserUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(number) = update.number {
            self.number = number;
        }
        if let Some(image) = update.image {
            self.image = image;
        }
        if let Some(addresses) = update.addresses {
            self.addresses = addresses;
        }
        self.updated_at = DateTime::now();
    }
}
