//! Predicates, windows and aggregate specifications for repository queries
//!
//! Predicates are plain data: a tree of [`FilterCondition`]s joined with AND/OR,
//! evaluated against anything implementing [`Record`]. Storage backends may
//! evaluate them in memory or translate them into their own query language.
//!
//! # Example
//!
//! ```rust
//! use catalog_service::repository::{FilterCondition, Predicate};
//!
//! let cheap_and_available = Predicate::all()
//!     .and(FilterCondition::lte("price", 100))
//!     .and(FilterCondition::eq("in_stock", true));
//! ```

use chrono::NaiveDate;
use std::fmt;

use super::error::{RepositoryError, RepositoryOperation};

/// A borrowed view of one field of a record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Integer(i64),
    Text(&'a str),
    Boolean(bool),
    Date(NaiveDate),
}

/// Anything a [`Predicate`] can be evaluated against.
///
/// Related records are reached with dotted names such as `category.name`.
/// Unknown fields return `None`, which never matches.
pub trait Record {
    fn field(&self, name: &str) -> Option<FieldValue<'_>>;
}

impl<R: Record + ?Sized> Record for &R {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        (**self).field(name)
    }
}

/// Half-open window `[offset, offset + limit)` over an ordered collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub limit: u64,
}

impl Window {
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Window from explicit bounds; an inverted range is empty
    #[must_use]
    pub const fn range(start: u64, end: u64) -> Self {
        Self {
            offset: start,
            limit: end.saturating_sub(start),
        }
    }

    /// Exclusive end, saturating at `u64::MAX`
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.offset.saturating_add(self.limit)
    }

    /// Clamp the window to a collection of `total` records, as a `usize` range
    pub fn clamp(&self, total: usize) -> std::ops::Range<usize> {
        let start = usize::try_from(self.offset).unwrap_or(usize::MAX).min(total);
        let end = usize::try_from(self.end()).unwrap_or(usize::MAX).min(total);
        start..end.max(start)
    }
}

/// Comparison operators for filter conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Equal,
    GreaterThanOrEqual,
    LessThanOrEqual,
    /// Case-insensitive substring match on text
    IContains,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::IContains => write!(f, "ICONTAINS"),
        }
    }
}

/// Owned comparison value of a filter condition
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    Date(NaiveDate),
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub field: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl FilterCondition {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::Equal, value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value.into())
    }

    /// Case-insensitive substring match; the needle is lowercased once here
    pub fn icontains(field: impl Into<String>, needle: &str) -> Self {
        Self::new(
            field,
            FilterOperator::IContains,
            FilterValue::String(needle.to_lowercase()),
        )
    }

    /// Evaluate against a record. Missing fields and mismatched types never match.
    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        let Some(actual) = record.field(&self.field) else {
            return false;
        };

        use std::cmp::Ordering;
        let ordering = match (actual, &self.value) {
            (FieldValue::Text(text), FilterValue::String(needle))
                if self.operator == FilterOperator::IContains =>
            {
                return text.to_lowercase().contains(needle.as_str());
            }
            (FieldValue::Integer(a), FilterValue::Integer(b)) => a.cmp(b),
            (FieldValue::Date(a), FilterValue::Date(b)) => a.cmp(b),
            (FieldValue::Text(a), FilterValue::String(b)) => a.cmp(b.as_str()),
            (FieldValue::Boolean(a), FilterValue::Boolean(b)) => a.cmp(b),
            _ => return false,
        };

        match self.operator {
            FilterOperator::Equal => ordering == Ordering::Equal,
            FilterOperator::GreaterThanOrEqual => ordering != Ordering::Less,
            FilterOperator::LessThanOrEqual => ordering != Ordering::Greater,
            FilterOperator::IContains => false,
        }
    }
}

/// Boolean test over a single record, composed with AND/OR.
///
/// `And(vec![])` matches everything; `Or(vec![])` matches nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Condition(FilterCondition),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// The predicate that matches every record
    pub fn all() -> Self {
        Self::And(Vec::new())
    }

    /// AND another predicate onto this one, flattening nested conjunctions
    #[must_use]
    pub fn and(self, other: impl Into<Predicate>) -> Self {
        match (self, other.into()) {
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), right) => {
                left.push(right);
                Self::And(left)
            }
            (left, right) => Self::And(vec![left, right]),
        }
    }

    pub fn any_of(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self::Or(predicates.into_iter().collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::And(parts) if parts.is_empty())
    }

    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        match self {
            Self::Condition(condition) => condition.matches(record),
            Self::And(parts) => parts.iter().all(|p| p.matches(record)),
            Self::Or(parts) => parts.iter().any(|p| p.matches(record)),
        }
    }
}

impl From<FilterCondition> for Predicate {
    fn from(condition: FilterCondition) -> Self {
        Self::Condition(condition)
    }
}

/// Collections an [`AggregateQuery`] can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Categories,
    Tags,
    Products,
    ProductImages,
    Profiles,
    Users,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Categories => "categories",
            Self::Tags => "tags",
            Self::Products => "products",
            Self::ProductImages => "product_images",
            Self::Profiles => "profiles",
            Self::Users => "users",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateSpec {
    Count,
    CountWhere(Predicate),
    /// Sum of an integer field; 0 over an empty collection
    Sum(&'static str),
    /// Mean of an integer field; `None` over an empty collection
    Avg(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateQuery {
    pub collection: Collection,
    pub spec: AggregateSpec,
}

impl AggregateQuery {
    pub fn new(collection: Collection, spec: AggregateSpec) -> Self {
        Self { collection, spec }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateValue {
    Count(u64),
    Sum(i64),
    Avg(Option<f64>),
}

impl AggregateValue {
    pub fn as_count(&self) -> u64 {
        match self {
            Self::Count(n) => *n,
            _ => 0,
        }
    }

    pub fn as_sum(&self) -> i64 {
        match self {
            Self::Sum(n) => *n,
            _ => 0,
        }
    }

    pub fn as_avg(&self) -> Option<f64> {
        match self {
            Self::Avg(v) => *v,
            _ => None,
        }
    }
}

enum Accumulator<'s> {
    Count(Option<&'s Predicate>, u64),
    Numeric {
        field: &'static str,
        mean: bool,
        total: i128,
        seen: u64,
    },
}

/// Evaluate several aggregates over one collection in a single pass.
pub fn fold_aggregates<R, I>(
    specs: &[&AggregateSpec],
    records: I,
) -> Result<Vec<AggregateValue>, RepositoryError>
where
    R: Record,
    I: IntoIterator<Item = R>,
{
    let mut accumulators: Vec<Accumulator<'_>> = specs
        .iter()
        .map(|spec| match spec {
            AggregateSpec::Count => Accumulator::Count(None, 0),
            AggregateSpec::CountWhere(predicate) => Accumulator::Count(Some(predicate), 0),
            AggregateSpec::Sum(field) => Accumulator::Numeric {
                field: *field,
                mean: false,
                total: 0,
                seen: 0,
            },
            AggregateSpec::Avg(field) => Accumulator::Numeric {
                field: *field,
                mean: true,
                total: 0,
                seen: 0,
            },
        })
        .collect();

    for record in records {
        for acc in accumulators.iter_mut() {
            match acc {
                Accumulator::Count(predicate, n) => {
                    if predicate.map_or(true, |p| p.matches(&record)) {
                        *n += 1;
                    }
                }
                Accumulator::Numeric {
                    field, total, seen, ..
                } => match record.field(field) {
                    Some(FieldValue::Integer(value)) => {
                        *total += i128::from(value);
                        *seen += 1;
                    }
                    Some(_) => {
                        return Err(RepositoryError::unsupported(
                            RepositoryOperation::Aggregate,
                            format!("field '{field}' is not numeric"),
                        ))
                    }
                    None => {}
                },
            }
        }
    }

    accumulators
        .into_iter()
        .map(|acc| match acc {
            Accumulator::Count(_, n) => Ok(AggregateValue::Count(n)),
            Accumulator::Numeric {
                mean: true,
                total,
                seen,
                ..
            } => Ok(AggregateValue::Avg(
                (seen > 0).then(|| total as f64 / seen as f64),
            )),
            Accumulator::Numeric { field, total, .. } => i64::try_from(total)
                .map(AggregateValue::Sum)
                .map_err(|_| {
                    RepositoryError::unsupported(
                        RepositoryOperation::Aggregate,
                        format!("sum of '{field}' overflows"),
                    )
                }),
        })
        .collect()
}
