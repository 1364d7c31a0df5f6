//! `/products/` endpoints
//!
//! The only filterable collection: the query string is parsed into a
//! [`ProductFilter`] for listing as well as for item lookups.

use std::collections::HashMap;

use super::{ApiError, CollectionEndpoint};
use crate::filter::ProductFilter;
use crate::models::{Id, ProductDetail};
use crate::policy;
use crate::repository::{Predicate, Products};

impl CollectionEndpoint for Products {
    const POLICY: policy::Resource = policy::Resource::Product;
    const PATH: &'static str = "/products/";

    fn filter(params: &HashMap<String, String>) -> Result<Predicate, ApiError> {
        Ok(ProductFilter::from_params(params)?.predicate())
    }

    fn view_id(view: &ProductDetail) -> Id {
        view.id
    }
}
