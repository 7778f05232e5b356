//! Account-level read-only lookups
//!
//! These back the provider's data sources: payment methods, subscription
//! plans, regions, database modules, and data-persistence options.

use serde::{Deserialize, Serialize};

use crate::client::CloudClient;
use crate::error::Result;

/// A payment method registered on the account
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub method_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_card_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_card_end_digits: Option<i64>,
}

/// A subscription plan offered by the service
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_measurement_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_currency: Option<String>,
}

/// A deployable region
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// A module available for databases
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A data-persistence option
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataPersistenceOption {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentMethodList {
    #[serde(default)]
    payment_methods: Vec<PaymentMethod>,
}

#[derive(Deserialize)]
struct PlanList {
    #[serde(default)]
    plans: Vec<SubscriptionPlan>,
}

#[derive(Deserialize)]
struct RegionList {
    #[serde(default)]
    regions: Vec<Region>,
}

#[derive(Deserialize)]
struct ModuleList {
    #[serde(default)]
    modules: Vec<ModuleInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistenceList {
    #[serde(default)]
    data_persistence: Vec<DataPersistenceOption>,
}

/// Handler for account-level lookups
pub struct AccountHandler {
    client: CloudClient,
}

impl AccountHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    /// List the account's payment methods
    pub async fn payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        let list: PaymentMethodList = self.client.get("/payment-methods").await?;
        Ok(list.payment_methods)
    }

    /// List plans, optionally filtered by provider
    pub async fn plans(&self, provider: Option<&str>) -> Result<Vec<SubscriptionPlan>> {
        let path = match provider {
            Some(provider) => format!("/plans?provider={provider}"),
            None => "/plans".to_string(),
        };
        let list: PlanList = self.client.get(&path).await?;
        Ok(list.plans)
    }

    /// List deployable regions, optionally filtered by provider
    pub async fn regions(&self, provider: Option<&str>) -> Result<Vec<Region>> {
        let path = match provider {
            Some(provider) => format!("/regions?provider={provider}"),
            None => "/regions".to_string(),
        };
        let list: RegionList = self.client.get(&path).await?;
        Ok(list.regions)
    }

    /// List modules available to databases
    pub async fn database_modules(&self) -> Result<Vec<ModuleInfo>> {
        let list: ModuleList = self.client.get("/database-modules").await?;
        Ok(list.modules)
    }

    /// List supported data-persistence options
    pub async fn data_persistence_options(&self) -> Result<Vec<DataPersistenceOption>> {
        let list: PersistenceList = self.client.get("/data-persistence").await?;
        Ok(list.data_persistence)
    }
}
