//! # rediscloud-api
//!
//! Typed client for the Redis Cloud management REST API.
//!
//! The client is deliberately thin: one handler per resource family, request
//! and response types that mirror the wire shapes, and typed errors. Mutating
//! endpoints are fire-and-forget on the API side, answering with a
//! [`tasks::TaskStateUpdate`] that callers poll until it settles. Higher-level
//! orchestration (waiting for resources to reach a state, serializing
//! mutations per subscription) lives in the `rediscloud-provider` crate.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rediscloud_api::{ClientConfig, CloudClient, SubscriptionHandler};
//!
//! # async fn example() -> rediscloud_api::Result<()> {
//! let client = CloudClient::new(ClientConfig::new("access-key", "secret-key"))?;
//! let subscriptions = SubscriptionHandler::new(client.clone()).list().await?;
//! for sub in subscriptions {
//!     println!("{:?}: {:?}", sub.id, sub.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod acl;
pub mod client;
pub mod cloud_accounts;
pub mod connectivity;
pub mod databases;
pub mod error;
pub mod subscriptions;
pub mod tasks;

pub use account::AccountHandler;
pub use acl::AclHandler;
pub use client::{ClientConfig, CloudClient, DEFAULT_API_URL};
pub use cloud_accounts::CloudAccountHandler;
pub use connectivity::peering::VpcPeeringHandler;
pub use connectivity::psc::PscHandler;
pub use connectivity::transit_gateway::TransitGatewayHandler;
pub use databases::DatabaseHandler;
pub use error::{CloudError, Result};
pub use subscriptions::SubscriptionHandler;
pub use tasks::TaskHandler;
