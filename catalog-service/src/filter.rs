//! Product filter pipeline
//!
//! Raw query parameters are parsed once into a typed [`ProductFilter`], which
//! then produces a [`Predicate`] for the repository. Unrecognized parameters and
//! empty values are ignored; a recognized parameter whose value does not parse
//! into its expected type is rejected.
//!
//! | parameter       | match                                              |
//! |-----------------|----------------------------------------------------|
//! | `category_name` | category name contains value (case-insensitive)    |
//! | `price_min`     | price >= value                                     |
//! | `price_max`     | price <= value                                     |
//! | `released_on`   | release date equals value (`YYYY-MM-DD`)           |
//! | `in_stock`      | `true`/`1` or `false`/`0`; anything else ignored   |
//! | `search`        | name OR category name contains value               |

use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;

use crate::repository::{FilterCondition, Predicate};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid value \"{value}\" for parameter '{parameter}': {expected}")]
pub struct InvalidFilter {
    pub parameter: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Typed product criteria. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category_name: Option<String>,
    pub price_min: Option<i64>,
    pub price_max: Option<i64>,
    pub released_on: Option<NaiveDate>,
    pub in_stock: Option<bool>,
    pub search: Option<String>,
}

/// Non-empty value of a parameter
fn param<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params.get(name).map(String::as_str).filter(|v| !v.is_empty())
}

fn parse_price(params: &HashMap<String, String>, name: &'static str) -> Result<Option<i64>, InvalidFilter> {
    param(params, name)
        .map(|raw| {
            raw.trim().parse::<i64>().map_err(|_| InvalidFilter {
                parameter: name,
                value: raw.to_string(),
                expected: "expected an integer",
            })
        })
        .transpose()
}

fn parse_stock_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

impl ProductFilter {
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, InvalidFilter> {
        let released_on = param(params, "released_on")
            .map(|raw| {
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| InvalidFilter {
                    parameter: "released_on",
                    value: raw.to_string(),
                    expected: "expected a date formatted YYYY-MM-DD",
                })
            })
            .transpose()?;

        Ok(Self {
            category_name: param(params, "category_name").map(str::to_string),
            price_min: parse_price(params, "price_min")?,
            price_max: parse_price(params, "price_max")?,
            released_on,
            in_stock: param(params, "in_stock").and_then(parse_stock_flag),
            search: param(params, "search").map(str::to_string),
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// AND of every present criterion; equality and range checks come before substring scans.
    pub fn predicate(&self) -> Predicate {
        let mut predicate = Predicate::all();

        if let Some(in_stock) = self.in_stock {
            predicate = predicate.and(FilterCondition::eq("in_stock", in_stock));
        }
        if let Some(released_on) = self.released_on {
            predicate = predicate.and(FilterCondition::eq("released_on", released_on));
        }
        if let Some(min) = self.price_min {
            predicate = predicate.and(FilterCondition::gte("price", min));
        }
        if let Some(max) = self.price_max {
            predicate = predicate.and(FilterCondition::lte("price", max));
        }
        if let Some(category_name) = &self.category_name {
            predicate = predicate.and(FilterCondition::icontains("category.name", category_name));
        }
        if let Some(search) = &self.search {
            predicate = predicate.and(Predicate::any_of([
                FilterCondition::icontains("name", search).into(),
                FilterCondition::icontains("category.name", search).into(),
            ]));
        }

        predicate
    }
}
