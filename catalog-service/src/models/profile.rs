use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Id, UserSummary};

/// Stored profile row; exactly one per user.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: Id,
    pub user_id: Id,
    pub bio: String,
    pub birth_date: Option<NaiveDate>,
    pub resume: Option<String>,
    pub avatar: Option<String>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// Profile with its owner resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDetail {
    pub id: Id,
    pub user: UserSummary,
    pub bio: String,
    pub birth_date: Option<NaiveDate>,
    pub resume: Option<String>,
    pub avatar: Option<String>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// Internal creation input; profiles are created alongside accounts, not over HTTP.
#[derive(Debug, Clone, Default)]
pub struct NewProfile {
    pub user_id: Id,
    pub bio: String,
    pub birth_date: Option<NaiveDate>,
}
