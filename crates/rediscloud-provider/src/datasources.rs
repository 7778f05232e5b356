//! Read-only data sources
//!
//! Lookups the host exposes alongside the managed resources: subscriptions
//! and databases by name, payment methods, plans, regions, modules, and
//! data-persistence options. Reads take no locks and never wait.

use std::sync::Arc;

use rediscloud_api::account::{
    DataPersistenceOption, ModuleInfo, PaymentMethod, Region, SubscriptionPlan,
};
use rediscloud_api::{AccountHandler, DatabaseHandler, SubscriptionHandler};

use crate::database::DatabaseState;
use crate::error::{ProviderError, Result};
use crate::ids::{DatabaseId, SubscriptionId};
use crate::provider::Provider;
use crate::subscription::SubscriptionState;

/// Read-only lookups against the account
pub struct DataSources {
    provider: Arc<Provider>,
}

impl DataSources {
    #[must_use]
    pub fn new(provider: Arc<Provider>) -> Self {
        Self { provider }
    }

    /// Find a subscription by its (account-unique) name
    pub async fn subscription_by_name(&self, name: &str) -> Result<SubscriptionState> {
        let handler = SubscriptionHandler::new(self.provider.client().clone());
        let matches: Vec<_> = handler
            .list()
            .await?
            .into_iter()
            .filter(|sub| sub.name.as_deref() == Some(name))
            .collect();
        match matches.as_slice() {
            [] => Err(ProviderError::NotFound {
                resource: "subscription",
                id: name.to_string(),
            }),
            [sub] => {
                let id = SubscriptionId(sub.id.ok_or_else(|| {
                    ProviderError::Internal("subscription listed without an id".to_string())
                })?);
                crate::subscription::SubscriptionResource::new(Arc::clone(&self.provider))
                    .read(id)
                    .await?
                    .ok_or(ProviderError::NotFound {
                        resource: "subscription",
                        id: id.to_string(),
                    })
            }
            _ => Err(ProviderError::Invalid(format!(
                "more than one subscription is named {name:?}"
            ))),
        }
    }

    /// Find a database by name within a subscription
    pub async fn database_by_name(
        &self,
        subscription: SubscriptionId,
        name: &str,
    ) -> Result<DatabaseState> {
        let handler = DatabaseHandler::new(self.provider.client().clone());
        let matches: Vec<_> = handler
            .list(subscription.0)
            .await?
            .into_iter()
            .filter(|db| db.name.as_deref() == Some(name))
            .collect();
        match matches.as_slice() {
            [] => Err(ProviderError::NotFound {
                resource: "database",
                id: format!("{subscription}/{name}"),
            }),
            [db] => {
                let id = DatabaseId {
                    subscription: subscription.0,
                    database: db.database_id.ok_or_else(|| {
                        ProviderError::Internal("database listed without an id".to_string())
                    })?,
                };
                crate::database::DatabaseResource::new(Arc::clone(&self.provider))
                    .read(id)
                    .await?
                    .ok_or(ProviderError::NotFound {
                        resource: "database",
                        id: id.to_string(),
                    })
            }
            _ => Err(ProviderError::Invalid(format!(
                "more than one database in subscription {subscription} is named {name:?}"
            ))),
        }
    }

    /// List the account's payment methods, optionally filtered by card type
    pub async fn payment_methods(&self, card_type: Option<&str>) -> Result<Vec<PaymentMethod>> {
        let methods = AccountHandler::new(self.provider.client().clone())
            .payment_methods()
            .await?;
        Ok(match card_type {
            Some(card_type) => methods
                .into_iter()
                .filter(|m| m.credit_card_type.as_deref() == Some(card_type))
                .collect(),
            None => methods,
        })
    }

    /// List subscription plans, optionally filtered by provider
    pub async fn plans(&self, provider: Option<&str>) -> Result<Vec<SubscriptionPlan>> {
        AccountHandler::new(self.provider.client().clone())
            .plans(provider)
            .await
            .map_err(Into::into)
    }

    /// List deployable regions, optionally filtered by provider
    pub async fn regions(&self, provider: Option<&str>) -> Result<Vec<Region>> {
        AccountHandler::new(self.provider.client().clone())
            .regions(provider)
            .await
            .map_err(Into::into)
    }

    /// List modules available to databases
    pub async fn database_modules(&self) -> Result<Vec<ModuleInfo>> {
        AccountHandler::new(self.provider.client().clone())
            .database_modules()
            .await
            .map_err(Into::into)
    }

    /// List supported data-persistence options
    pub async fn data_persistence_options(&self) -> Result<Vec<DataPersistenceOption>> {
        AccountHandler::new(self.provider.client().clone())
            .data_persistence_options()
            .await
            .map_err(Into::into)
    }
}
