//! `/categories/` endpoints

use super::CollectionEndpoint;
use crate::models::{Category, Id};
use crate::policy;
use crate::repository::Categories;

impl CollectionEndpoint for Categories {
    const POLICY: policy::Resource = policy::Resource::Category;
    const PATH: &'static str = "/categories/";

    fn view_id(view: &Category) -> Id {
        view.id
    }
}
