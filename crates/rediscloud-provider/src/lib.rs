//! # rediscloud-provider
//!
//! Declarative resource lifecycle engine for the Redis Cloud management API.
//!
//! Each resource family gets a lifecycle façade ([`SubscriptionResource`],
//! [`DatabaseResource`], [`ActiveActiveDatabaseResource`],
//! [`PeeringResource`], [`TgwAttachmentResource`], [`PscResource`],
//! [`CloudAccountResource`], [`AclRuleResource`]) whose create/read/update/
//! delete methods translate a desired-state config into REST calls and
//! return only when the resource has settled in its terminal state. The host
//! drives these callbacks and owns persistence and diffing; configs and
//! states are plain serde-serializable structs, and composite ids implement
//! `FromStr`/`Display` for import.
//!
//! The machinery those façades share:
//!
//! - [`provider::Provider`]: the meta handle holding the API client, the
//!   per-subscription lock table ([`lock::PerIdLock`]), and wait timeouts.
//! - [`wait::StateChangeConf`]: the poll-until-target loop behind every
//!   "resource is now active" guarantee.
//! - [`plan::expand`]: creation-plan expansion into sizing databases.
//! - [`active_active::reconcile_overrides`]: rebuilds per-region override
//!   blocks from observed state, globals, and the prior state.
//! - [`error::classify`]: maps API errors onto the classes lifecycles act
//!   on (not-found clears the id, conflicts wait, validation surfaces).
//!
//! Mutations serialize per subscription: the remote API permits one
//! in-flight change per subscription, so each mutating call holds that
//! subscription's lock across the REST call and the wait that follows.
//! Cancellation is dropping the future; locks release on drop and the
//! abandoned remote operation is observed by the next read.

pub mod acl;
pub mod active_active;
pub mod cidr;
pub mod cloud_account;
pub mod database;
pub mod datasources;
pub mod error;
pub mod ids;
pub mod lock;
pub mod password;
pub mod peering;
pub mod plan;
pub mod provider;
pub mod psc;
pub mod subscription;
pub mod tgw;
pub mod wait;

pub use acl::AclRuleResource;
pub use active_active::ActiveActiveDatabaseResource;
pub use cloud_account::CloudAccountResource;
pub use database::DatabaseResource;
pub use datasources::DataSources;
pub use error::{ErrorClass, ProviderError, Result};
pub use ids::{
    AclRuleId, CloudAccountId, DatabaseId, PeeringId, PscServiceId, RegionPscServiceId,
    SubscriptionId, TgwAttachmentId,
};
pub use peering::PeeringResource;
pub use provider::{Provider, ResourceTimeouts};
pub use psc::PscResource;
pub use subscription::SubscriptionResource;
pub use tgw::TgwAttachmentResource;
