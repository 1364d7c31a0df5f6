use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::Id;
use crate::repository::{FieldValue, Record};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            other => Err(format!("\"{other}\" is not a valid choice.")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    pub name: String,
    pub visibility: Visibility,
    pub is_active: bool,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: Id,
    /// Owning product id
    pub product: Id,
    /// Stored-file reference
    pub image: String,
    pub caption: String,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// Stored product row. Relations are held by id; see [`ProductDetail`] for the read form.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub released_on: NaiveDate,
    pub in_stock: bool,
    pub category_id: Id,
    pub tag_ids: Vec<Id>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// Product with its category, tags and images resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub released_on: NaiveDate,
    pub in_stock: bool,
    pub category: Category,
    pub tags: Vec<Tag>,
    pub images: Vec<ProductImage>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

impl Record for Category {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Integer(self.id)),
            "name" => Some(FieldValue::Text(&self.name)),
            "visibility" => Some(FieldValue::Text(self.visibility.as_str())),
            "is_active" => Some(FieldValue::Boolean(self.is_active)),
            _ => None,
        }
    }
}

impl Record for Tag {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Integer(self.id)),
            "name" => Some(FieldValue::Text(&self.name)),
            _ => None,
        }
    }
}

impl Record for ProductImage {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Integer(self.id)),
            "product" | "product.id" => Some(FieldValue::Integer(self.product)),
            "image" => Some(FieldValue::Text(&self.image)),
            "caption" => Some(FieldValue::Text(&self.caption)),
            _ => None,
        }
    }
}
