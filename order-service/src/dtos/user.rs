use crate::models::{new_id, Address, User, UserUpdate};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddressInput {
    #[validate(length(min = 1, message = "Address line 1 is required"))]
    pub line1: String,
    pub line2: Option<String>,
    pub landmark: Option<String>,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,
    #[validate(length(min = 1, message = "Pincode is required"))]
    pub pincode: String,
}

impl From<AddressInput> for Address {
    fn from(a: AddressInput) -> Self {
        Self {
            id: new_id(),
            line1: a.line1,
            line2: a.line2,
            landmark: a.landmark,
            city: a.city,
            state: a.state,
            pincode: a.pincode,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(alias = "clerkId")]
    #[validate(length(min = 1, message = "External id is required"))]
    pub external_id: String,
    #[validate(length(min = 10, message = "Phone number must be at least 10 characters"))]
    pub number: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    #[validate(nested)]
    pub addresses: Vec<AddressInput>,
}

impl CreateUserRequest {
    pub fn into_user(self) -> Result<User, AppError> {
        self.validate()?;
        let now = mongodb::bson::DateTime::now();
        Ok(User {
            id: new_id(),
            external_id: self.external_id,
            number: self.number.trim().to_string(),
            name: self.name,
            image: self.image,
            addresses: self.addresses.into_iter().map(Address::from).collect(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 10, message = "Phone number must be at least 10 characters"))]
    pub number: Option<String>,
    pub image: Option<String>,
    #[validate(nested)]
    pub addresses: Option<Vec<AddressInput>>,
}

impl TryFrom<UpdateUserRequest> for UserUpdate {
    type Error = AppError;

    fn try_from(req: UpdateUserRequest) -> Result<Self, Self::Error> {
        req.validate()?;
        Ok(UserUpdate {
            name: req.name,
            number: req.number.map(|n| n.trim().to_string()),
            image: req.image,
            addresses: req
                .addresses
                .map(|list| list.into_iter().map(Address::from).collect()),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub external_id: String,
    pub number: String,
    pub name: String,
    pub image: String,
    pub addresses: Vec<Address>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            external_id: u.external_id,
            number: u.number,
            name: u.name,
            image: u.image,
            addresses: u.addresses,
            created_at: u.created_at.to_string(),
            updated_at: u.updated_at.to_string(),
        }
    }
}
