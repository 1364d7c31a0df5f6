//! Catalog summary statistics
//!
//! Each summary is computed from a single [`Aggregator::aggregate`] call, so
//! every figure in one response describes the same snapshot of the store.

use serde::{Deserialize, Serialize};

use crate::repository::{
    AggregateQuery, AggregateSpec, AggregateValue, Aggregator, Collection, FilterCondition,
    RepositoryResult,
};

/// Figures shown on the admin dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_products: u64,
    pub total_price: i64,
    pub total_categories: u64,
    /// Products currently in stock
    pub total_stock: u64,
    pub total_users: u64,
}

/// Price and stock figures over all products
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductStats {
    pub total_products: u64,
    /// `None` when there are no products
    pub avg_price: Option<f64>,
    pub total_price: i64,
    pub total_in_stock: u64,
    pub total_out_of_stock: u64,
}

fn in_stock(flag: bool) -> AggregateSpec {
    AggregateSpec::CountWhere(FilterCondition::eq("in_stock", flag).into())
}

fn value(values: &[AggregateValue], index: usize) -> AggregateValue {
    values.get(index).copied().unwrap_or(AggregateValue::Count(0))
}

impl DashboardStats {
    pub async fn compute<A: Aggregator>(aggregator: &A) -> RepositoryResult<Self> {
        let queries = [
            AggregateQuery::new(Collection::Products, AggregateSpec::Count),
            AggregateQuery::new(Collection::Products, AggregateSpec::Sum("price")),
            AggregateQuery::new(Collection::Categories, AggregateSpec::Count),
            AggregateQuery::new(Collection::Products, in_stock(true)),
            AggregateQuery::new(Collection::Users, AggregateSpec::Count),
        ];
        let values = aggregator.aggregate(&queries).await?;

        Ok(Self {
            total_products: value(&values, 0).as_count(),
            total_price: value(&values, 1).as_sum(),
            total_categories: value(&values, 2).as_count(),
            total_stock: value(&values, 3).as_count(),
            total_users: value(&values, 4).as_count(),
        })
    }
}

impl ProductStats {
    pub async fn compute<A: Aggregator>(aggregator: &A) -> RepositoryResult<Self> {
        let queries = [
            AggregateQuery::new(Collection::Products, AggregateSpec::Count),
            AggregateQuery::new(Collection::Products, AggregateSpec::Avg("price")),
            AggregateQuery::new(Collection::Products, AggregateSpec::Sum("price")),
            AggregateQuery::new(Collection::Products, in_stock(true)),
            AggregateQuery::new(Collection::Products, in_stock(false)),
        ];
        let values = aggregator.aggregate(&queries).await?;

        Ok(Self {
            total_products: value(&values, 0).as_count(),
            avg_price: value(&values, 1).as_avg(),
            total_price: value(&values, 2).as_sum(),
            total_in_stock: value(&values, 3).as_count(),
            total_out_of_stock: value(&values, 4).as_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewCategory, NewProduct, NewUser, Role};
    use crate::repository::{MemoryStore, Repository};
    use chrono::NaiveDate;

    async fn store_with_products(prices: &[(i64, bool)]) -> MemoryStore {
        let store = MemoryStore::new();
        let category = store
            .categories()
            .create(NewCategory {
                name: Some("Tools".into()),
                ..NewCategory::default()
            })
            .await
            .unwrap();
        for (i, &(price, in_stock)) in prices.iter().enumerate() {
            store
                .products()
                .create(NewProduct {
                    name: Some(format!("p{i}")),
                    description: None,
                    price: Some(price),
                    released_on: NaiveDate::from_ymd_opt(2024, 1, 1),
                    in_stock: Some(in_stock),
                    category_id: Some(category.id),
                    tag_ids: Some(vec![]),
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_product_stats() {
        let store = store_with_products(&[(100, true), (200, false), (300, true)]).await;
        let stats = ProductStats::compute(&store).await.unwrap();
        assert_eq!(stats.total_products, 3);
        assert_eq!(stats.avg_price, Some(200.0));
        assert_eq!(stats.total_price, 600);
        assert_eq!(stats.total_in_stock, 2);
        assert_eq!(stats.total_out_of_stock, 1);
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = MemoryStore::new();
        let stats = ProductStats::compute(&store).await.unwrap();
        assert_eq!(stats.total_products, 0);
        assert_eq!(stats.avg_price, None);
        assert_eq!(stats.total_price, 0);

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["avg_price"].is_null());

        let dashboard = DashboardStats::compute(&store).await.unwrap();
        assert_eq!(dashboard.total_price, 0);
        assert_eq!(dashboard.total_users, 0);
    }

    #[tokio::test]
    async fn test_dashboard_stats() {
        let store = store_with_products(&[(5, true), (7, false)]).await;
        store
            .users()
            .create(NewUser {
                username: "admin".into(),
                email: "admin@example.com".into(),
                password_hash: String::new(),
                role: Role::Admin,
            })
            .await
            .unwrap();

        let stats = DashboardStats::compute(&store).await.unwrap();
        assert_eq!(
            stats,
            DashboardStats {
                total_products: 2,
                total_price: 12,
                total_categories: 1,
                total_stock: 1,
                total_users: 1,
            }
        );
    }
}
