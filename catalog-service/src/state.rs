//! Application state management

use std::sync::Arc;

use crate::auth::{MemoryTokenStore, PasswordHasher, TokenGenerator, TokenStore};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{NewProfile, NewUser};
use crate::repository::{FilterCondition, MemoryStore, Predicate, Repository};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: MemoryStore,
    tokens: Arc<dyn TokenStore>,
    hasher: PasswordHasher,
}

impl AppState {
    /// Create a builder for custom state
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Catalog data shared by every repository
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn tokens(&self) -> &dyn TokenStore {
        self.tokens.as_ref()
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// Create the configured bootstrap accounts, each with an empty profile.
    ///
    /// Accounts whose username already exists are left untouched.
    pub async fn bootstrap(&self) -> Result<usize> {
        let users = self.store.users();
        let profiles = self.store.profiles();
        let mut created = 0;

        for account in &self.config.bootstrap.users {
            let by_username: Predicate = FilterCondition::eq("username", account.username.as_str()).into();
            let taken = users
                .find_first(&by_username)
                .await
                .map_err(|e| Error::Bootstrap(e.to_string()))?
                .is_some();
            if taken {
                tracing::debug!(username = %account.username, "bootstrap account already exists");
                continue;
            }

            let password_hash = self.hasher.hash(&account.password)?;
            let user = users
                .create(NewUser {
                    username: account.username.clone(),
                    email: account.email.clone(),
                    password_hash,
                    role: account.role,
                })
                .await
                .map_err(|e| Error::Bootstrap(e.to_string()))?;
            profiles
                .create(NewProfile {
                    user_id: user.id,
                    ..NewProfile::default()
                })
                .await
                .map_err(|e| Error::Bootstrap(e.to_string()))?;

            tracing::info!(username = %user.username, role = %user.role, "bootstrap account created");
            created += 1;
        }

        Ok(created)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.config.service.name)
            .finish_non_exhaustive()
    }
}

/// Builder for AppState
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<Config>,
    store: Option<MemoryStore>,
    tokens: Option<Arc<dyn TokenStore>>,
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration (defaults to `Config::default()`)
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Share an existing store
    pub fn store(mut self, store: MemoryStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a custom token store instead of the in-process one
    pub fn token_store(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Build the state; fails when the configured password hashing costs are invalid
    pub fn build(self) -> Result<AppState> {
        let config = self.config.unwrap_or_default();
        let hasher = PasswordHasher::new(&config.auth)?;
        let tokens = self.tokens.unwrap_or_else(|| {
            Arc::new(MemoryTokenStore::new(TokenGenerator::from_config(&config.auth)))
        });

        Ok(AppState {
            config: Arc::new(config),
            store: self.store.unwrap_or_default(),
            tokens,
            hasher,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BootstrapUser;
    use crate::models::Role;

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.auth.memory_cost_kib = 1024;
        config.auth.time_cost = 1;
        config.auth.parallelism = 1;
        config
    }

    #[tokio::test]
    async fn test_bootstrap_creates_users_and_profiles() {
        let mut config = fast_config();
        config.bootstrap.users = vec![
            BootstrapUser {
                username: "root".into(),
                email: "root@example.com".into(),
                password: "rootpassword".into(),
                role: Role::Admin,
            },
            BootstrapUser {
                username: "clerk".into(),
                email: String::new(),
                password: "clerkpassword".into(),
                role: Role::Staff,
            },
        ];
        let state = AppState::builder().config(config).build().unwrap();

        assert_eq!(state.bootstrap().await.unwrap(), 2);
        // A second run finds the accounts already there
        assert_eq!(state.bootstrap().await.unwrap(), 0);

        let store = state.store();
        assert_eq!(store.users().count(&Predicate::all()).await.unwrap(), 2);
        assert_eq!(store.profiles().count(&Predicate::all()).await.unwrap(), 2);

        let root = store.users().find_by_id(&1).await.unwrap().unwrap();
        assert_eq!(root.role, Role::Admin);
        assert!(state.hasher().verify("rootpassword", &root.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_short_password() {
        let mut config = fast_config();
        config.bootstrap.users = vec![BootstrapUser {
            username: "weak".into(),
            email: String::new(),
            password: "short".into(),
            role: Role::Plain,
        }];
        let state = AppState::builder().config(config).build().unwrap();
        assert!(matches!(state.bootstrap().await, Err(Error::ValidationError(_))));
    }

    #[test]
    fn test_invalid_hash_costs_fail_build() {
        let mut config = fast_config();
        config.auth.time_cost = 0;
        assert!(AppState::builder().config(config).build().is_err());
    }
}
