//! Catalog records, their wire representations and write payloads

mod catalog;
mod payloads;
mod profile;
mod user;
mod validation;

pub use catalog::{Category, Product, ProductDetail, ProductImage, Tag, Visibility};
pub use payloads::{
    CategoryPatch, NewCategory, NewProduct, NewProductImage, NewTag, ProductImagePatch,
    ProductPatch, ProfilePatch, TagPatch,
};
pub use profile::{NewProfile, Profile, ProfileDetail};
pub use user::{NewUser, Role, User, UserSummary};
pub use validation::{FieldErrors, Validate};

/// Record identifier; assigned by the store on create, ascending.
pub type Id = i64;
