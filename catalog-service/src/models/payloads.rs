//! Write payloads accepted by the resource endpoints.
//!
//! Create payloads hold every field as `Option` so a missing required field is
//! reported per field instead of failing the whole body. Patch payloads are
//! partial: only the supplied fields are validated and applied.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use super::{FieldErrors, Id, Validate, Visibility};

pub const CATEGORY_NAME_MAX: usize = 120;
pub const TAG_NAME_MAX: usize = 60;
pub const PRODUCT_NAME_MAX: usize = 150;
pub const CAPTION_MAX: usize = 200;
pub const BIO_MAX: usize = 200;
pub const FILE_REF_MAX: usize = 100;

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn check_visibility(errors: &mut FieldErrors, visibility: Option<&str>) {
    if let Some(Err(message)) = visibility.map(str::parse::<Visibility>) {
        errors.add("visibility", message);
    }
}

fn check_price(errors: &mut FieldErrors, price: i64) {
    if price > i64::from(i32::MAX) {
        errors.add(
            "price",
            format!("Ensure this value is less than or equal to {}.", i32::MAX),
        );
    } else if price < i64::from(i32::MIN) {
        errors.add(
            "price",
            format!("Ensure this value is greater than or equal to {}.", i32::MIN),
        );
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCategory {
    pub name: Option<String>,
    pub visibility: Option<String>,
    pub is_active: Option<bool>,
}

impl Validate for NewCategory {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        match &self.name {
            Some(name) => errors.check_text("name", name, CATEGORY_NAME_MAX),
            None => errors.required("name"),
        }
        check_visibility(&mut errors, self.visibility.as_deref());
        errors.into_result()
    }
}

impl NewCategory {
    /// Parsed visibility, defaulting to public
    pub fn visibility(&self) -> Visibility {
        self.visibility
            .as_deref()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub visibility: Option<String>,
    pub is_active: Option<bool>,
}

impl Validate for CategoryPatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            errors.check_text("name", name, CATEGORY_NAME_MAX);
        }
        check_visibility(&mut errors, self.visibility.as_deref());
        errors.into_result()
    }
}

impl CategoryPatch {
    pub fn visibility(&self) -> Option<Visibility> {
        self.visibility.as_deref().and_then(|v| v.parse().ok())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTag {
    pub name: Option<String>,
}

impl Validate for NewTag {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        match &self.name {
            Some(name) => errors.check_text("name", name, TAG_NAME_MAX),
            None => errors.required("name"),
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagPatch {
    pub name: Option<String>,
}

impl Validate for TagPatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            errors.check_text("name", name, TAG_NAME_MAX);
        }
        errors.into_result()
    }
}

/// Product write form: relations are given by id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub released_on: Option<NaiveDate>,
    pub in_stock: Option<bool>,
    pub category_id: Option<Id>,
    pub tag_ids: Option<Vec<Id>>,
}

impl Validate for NewProduct {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        match &self.name {
            Some(name) => errors.check_text("name", name, PRODUCT_NAME_MAX),
            None => errors.required("name"),
        }
        match self.price {
            Some(price) => check_price(&mut errors, price),
            None => errors.required("price"),
        }
        if self.released_on.is_none() {
            errors.required("released_on");
        }
        if self.category_id.is_none() {
            errors.required("category_id");
        }
        if self.tag_ids.is_none() {
            errors.required("tag_ids");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub released_on: Option<NaiveDate>,
    pub in_stock: Option<bool>,
    pub category_id: Option<Id>,
    pub tag_ids: Option<Vec<Id>>,
}

impl Validate for ProductPatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            errors.check_text("name", name, PRODUCT_NAME_MAX);
        }
        if let Some(price) = self.price {
            check_price(&mut errors, price);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProductImage {
    pub product: Option<Id>,
    pub image: Option<String>,
    pub caption: Option<String>,
}

impl Validate for NewProductImage {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.product.is_none() {
            errors.required("product");
        }
        match &self.image {
            Some(image) => errors.check_text("image", image, FILE_REF_MAX),
            None => errors.required("image"),
        }
        if let Some(caption) = &self.caption {
            errors.check_max_length("caption", caption, CAPTION_MAX);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductImagePatch {
    pub product: Option<Id>,
    pub image: Option<String>,
    pub caption: Option<String>,
}

impl Validate for ProductImagePatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(image) = &self.image {
            errors.check_text("image", image, FILE_REF_MAX);
        }
        if let Some(caption) = &self.caption {
            errors.check_max_length("caption", caption, CAPTION_MAX);
        }
        errors.into_result()
    }
}

/// Profile update. The owner is fixed; nullable fields accept an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub bio: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub birth_date: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "nullable")]
    pub resume: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub avatar: Option<Option<String>>,
}

impl Validate for ProfilePatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(bio) = &self.bio {
            errors.check_max_length("bio", bio, BIO_MAX);
        }
        if let Some(Some(resume)) = &self.resume {
            errors.check_max_length("resume", resume, FILE_REF_MAX);
        }
        if let Some(Some(avatar)) = &self.avatar {
            errors.check_max_length("avatar", avatar, FILE_REF_MAX);
        }
        errors.into_result()
    }
}
