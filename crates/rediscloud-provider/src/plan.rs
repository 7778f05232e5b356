//! Creation-plan expansion
//!
//! The management API requires a subscription to be born with sizing
//! databases that fix its infrastructure footprint. Users declare a single
//! compact plan; this module expands it into the ordered sizing-database
//! list the create request carries.
//!
//! Two module families bend the rules: RedisGraph must inhabit a database of
//! its own, and RedisGraph/RediSearch size by different throughput units
//! than the user may have declared, so the expansion converts between
//! operations-per-second and shard counts using the service's ratios.

use serde::{Deserialize, Serialize};
use rediscloud_api::subscriptions::{
    ModuleSpec, SizingDatabaseSpec, THROUGHPUT_BY_OPS, THROUGHPUT_BY_SHARDS, ThroughputMeasurement,
};
use tracing::warn;

use crate::error::{ProviderError, Result};

/// Module that must live alone in its own database
pub const MODULE_REDISGRAPH: &str = "RedisGraph";
/// Module sized by shard count rather than ops/s
pub const MODULE_REDISEARCH: &str = "RediSearch";

/// Memory storage class of the subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemoryStorage {
    Ram,
    RamAndFlash,
}

impl MemoryStorage {
    /// Wire name of the storage class
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryStorage::Ram => "ram",
            MemoryStorage::RamAndFlash => "ram-and-flash",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "ram" => Ok(MemoryStorage::Ram),
            "ram-and-flash" => Ok(MemoryStorage::RamAndFlash),
            other => Err(ProviderError::Invalid(format!(
                "memory_storage must be \"ram\" or \"ram-and-flash\", got {other:?}"
            ))),
        }
    }
}

/// Throughput unit of a creation plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThroughputBy {
    OperationsPerSecond,
    NumberOfShards,
}

impl ThroughputBy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ThroughputBy::OperationsPerSecond => THROUGHPUT_BY_OPS,
            ThroughputBy::NumberOfShards => THROUGHPUT_BY_SHARDS,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            THROUGHPUT_BY_OPS => Ok(ThroughputBy::OperationsPerSecond),
            THROUGHPUT_BY_SHARDS => Ok(ThroughputBy::NumberOfShards),
            other => Err(ProviderError::Invalid(format!(
                "throughput_measurement.by must be \"{THROUGHPUT_BY_OPS}\" or \"{THROUGHPUT_BY_SHARDS}\", got {other:?}"
            ))),
        }
    }
}

/// Throughput declaration of a creation plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throughput {
    pub by: ThroughputBy,
    pub value: i64,
}

/// The user-declared creation plan of a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationPlan {
    pub memory_limit_in_gb: Option<f64>,
    pub dataset_size_in_gb: Option<f64>,
    pub average_item_size_in_bytes: Option<i64>,
    pub replication: bool,
    pub support_oss_cluster_api: bool,
    pub throughput: Throughput,
    pub quantity: i64,
    pub modules: Vec<String>,
}

/// Result of expanding a creation plan
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedPlan {
    /// Sizing databases in deterministic order (graph-only spec first)
    pub specs: Vec<SizingDatabaseSpec>,
    /// Non-fatal findings surfaced to the user
    pub warnings: Vec<String>,
}

/// Expand a creation plan into the sizing databases of a create request
pub fn expand(memory_storage: MemoryStorage, plan: &CreationPlan) -> Result<ExpandedPlan> {
    if plan.quantity < 1 {
        return Err(ProviderError::Invalid(format!(
            "creation_plan.quantity must be at least 1, got {}",
            plan.quantity
        )));
    }
    match (plan.memory_limit_in_gb, plan.dataset_size_in_gb) {
        (Some(_), Some(_)) => {
            return Err(ProviderError::Invalid(
                "creation_plan takes either memory_limit_in_gb or dataset_size_in_gb, not both"
                    .to_string(),
            ));
        }
        (None, None) => {
            return Err(ProviderError::Invalid(
                "creation_plan requires one of memory_limit_in_gb or dataset_size_in_gb"
                    .to_string(),
            ));
        }
        _ => {}
    }

    let mut warnings = Vec::new();
    let average_item_size = match (memory_storage, plan.average_item_size_in_bytes) {
        (MemoryStorage::RamAndFlash, size) => size,
        (MemoryStorage::Ram, Some(_)) => {
            let message = "average_item_size_in_bytes is only applicable with \
                           ram-and-flash storage and was ignored"
                .to_string();
            warn!("{message}");
            warnings.push(message);
            None
        }
        (MemoryStorage::Ram, None) => None,
    };

    let has_graph = plan.modules.iter().any(|m| m == MODULE_REDISGRAPH);
    // RedisGraph must be the sole module of its database; carve it out into
    // its own spec when it arrives alongside others.
    let module_groups: Vec<(Vec<String>, i64)> = if has_graph && plan.modules.len() > 1 {
        let rest: Vec<String> = plan
            .modules
            .iter()
            .filter(|m| *m != MODULE_REDISGRAPH)
            .cloned()
            .collect();
        vec![
            (vec![MODULE_REDISGRAPH.to_string()], 1),
            (rest, (plan.quantity - 1).max(1)),
        ]
    } else {
        vec![(plan.modules.clone(), plan.quantity)]
    };

    let specs = module_groups
        .into_iter()
        .enumerate()
        .map(|(index, (modules, quantity))| {
            let throughput = derive_throughput(&modules, plan.replication, plan.throughput);
            SizingDatabaseSpec {
                name: format!("sizing-db-{}", index + 1),
                protocol: Some("redis".to_string()),
                memory_limit_in_gb: plan.memory_limit_in_gb,
                dataset_size_in_gb: plan.dataset_size_in_gb,
                average_item_size_in_bytes: average_item_size,
                support_oss_cluster_api: Some(plan.support_oss_cluster_api),
                replication: Some(plan.replication),
                throughput_measurement: Some(ThroughputMeasurement {
                    by: throughput.by.as_str().to_string(),
                    value: throughput.value,
                }),
                local_throughput_measurement: Vec::new(),
                quantity: Some(quantity),
                modules: modules.into_iter().map(|name| ModuleSpec { name }).collect(),
            }
        })
        .collect();

    Ok(ExpandedPlan { specs, warnings })
}

/// Convert the declared throughput into the unit the spec's module family
/// sizes by; combinations without a special rule keep the user's unit.
fn derive_throughput(modules: &[String], replication: bool, declared: Throughput) -> Throughput {
    let has_search = modules.iter().any(|m| m == MODULE_REDISEARCH);
    let has_graph = modules.iter().any(|m| m == MODULE_REDISGRAPH);

    if has_search && declared.by == ThroughputBy::OperationsPerSecond {
        let ops_per_shard = if replication { 500 } else { 1000 };
        return Throughput {
            by: ThroughputBy::NumberOfShards,
            value: declared.value / ops_per_shard,
        };
    }
    if has_graph && declared.by == ThroughputBy::NumberOfShards {
        let ops_per_shard = if replication { 500 } else { 250 };
        return Throughput {
            by: ThroughputBy::OperationsPerSecond,
            value: declared.value * ops_per_shard,
        };
    }
    declared
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base_plan(modules: &[&str], quantity: i64) -> CreationPlan {
        CreationPlan {
            memory_limit_in_gb: Some(1.0),
            dataset_size_in_gb: None,
            average_item_size_in_bytes: None,
            replication: false,
            support_oss_cluster_api: false,
            throughput: Throughput {
                by: ThroughputBy::OperationsPerSecond,
                value: 10_000,
            },
            quantity,
            modules: modules.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn module_names(spec: &SizingDatabaseSpec) -> Vec<&str> {
        spec.modules.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_plain_modules_pass_through() {
        let plan = base_plan(&["RedisJSON", "RedisBloom"], 1);
        let expanded = expand(MemoryStorage::Ram, &plan).unwrap();

        assert_eq!(expanded.specs.len(), 1);
        let spec = &expanded.specs[0];
        assert_eq!(module_names(spec), vec!["RedisJSON", "RedisBloom"]);
        assert_eq!(spec.quantity, Some(1));
        assert_eq!(
            spec.throughput_measurement,
            Some(ThroughputMeasurement {
                by: THROUGHPUT_BY_OPS.to_string(),
                value: 10_000,
            })
        );
    }

    #[test]
    fn test_graph_is_separated_from_other_modules() {
        let mut plan = base_plan(&["RedisJSON", "RedisGraph", "RedisBloom"], 5);
        plan.replication = true;
        let expanded = expand(MemoryStorage::Ram, &plan).unwrap();

        assert_eq!(expanded.specs.len(), 2);
        let graph = &expanded.specs[0];
        assert_eq!(module_names(graph), vec!["RedisGraph"]);
        assert_eq!(graph.quantity, Some(1));
        // Declared by ops/s, so the graph rule (shards -> ops/s) does not fire.
        assert_eq!(
            graph.throughput_measurement,
            Some(ThroughputMeasurement {
                by: THROUGHPUT_BY_OPS.to_string(),
                value: 10_000,
            })
        );

        let rest = &expanded.specs[1];
        assert_eq!(module_names(rest), vec!["RedisJSON", "RedisBloom"]);
        assert_eq!(rest.quantity, Some(4));
        assert_eq!(
            rest.throughput_measurement,
            Some(ThroughputMeasurement {
                by: THROUGHPUT_BY_OPS.to_string(),
                value: 10_000,
            })
        );
    }

    #[test]
    fn test_graph_alone_is_not_split() {
        let plan = base_plan(&["RedisGraph"], 2);
        let expanded = expand(MemoryStorage::Ram, &plan).unwrap();
        assert_eq!(expanded.specs.len(), 1);
        assert_eq!(expanded.specs[0].quantity, Some(2));
    }

    #[test]
    fn test_graph_split_with_quantity_one_keeps_remainder() {
        let plan = base_plan(&["RedisGraph", "RedisJSON"], 1);
        let expanded = expand(MemoryStorage::Ram, &plan).unwrap();
        assert_eq!(expanded.specs.len(), 2);
        // max(Q-1, 1) keeps the remainder spec alive.
        assert_eq!(expanded.specs[1].quantity, Some(1));
    }

    #[test]
    fn test_search_converts_ops_to_shards() {
        let plan = base_plan(&["RediSearch"], 1);
        let expanded = expand(MemoryStorage::Ram, &plan).unwrap();
        assert_eq!(
            expanded.specs[0].throughput_measurement,
            Some(ThroughputMeasurement {
                by: THROUGHPUT_BY_SHARDS.to_string(),
                value: 10,
            })
        );

        let mut replicated = base_plan(&["RediSearch"], 1);
        replicated.replication = true;
        let expanded = expand(MemoryStorage::Ram, &replicated).unwrap();
        assert_eq!(
            expanded.specs[0].throughput_measurement,
            Some(ThroughputMeasurement {
                by: THROUGHPUT_BY_SHARDS.to_string(),
                value: 20,
            })
        );
    }

    #[test]
    fn test_search_declared_in_shards_is_preserved() {
        let mut plan = base_plan(&["RediSearch"], 1);
        plan.throughput = Throughput {
            by: ThroughputBy::NumberOfShards,
            value: 4,
        };
        let expanded = expand(MemoryStorage::Ram, &plan).unwrap();
        assert_eq!(
            expanded.specs[0].throughput_measurement,
            Some(ThroughputMeasurement {
                by: THROUGHPUT_BY_SHARDS.to_string(),
                value: 4,
            })
        );
    }

    #[test]
    fn test_graph_converts_shards_to_ops() {
        let mut plan = base_plan(&["RedisGraph"], 1);
        plan.throughput = Throughput {
            by: ThroughputBy::NumberOfShards,
            value: 4,
        };
        let expanded = expand(MemoryStorage::Ram, &plan).unwrap();
        assert_eq!(
            expanded.specs[0].throughput_measurement,
            Some(ThroughputMeasurement {
                by: THROUGHPUT_BY_OPS.to_string(),
                value: 1000,
            })
        );

        plan.replication = true;
        let expanded = expand(MemoryStorage::Ram, &plan).unwrap();
        assert_eq!(
            expanded.specs[0].throughput_measurement.as_ref().unwrap().value,
            2000
        );
    }

    #[test]
    fn test_average_item_size_dropped_on_ram() {
        let mut plan = base_plan(&["RedisJSON"], 1);
        plan.average_item_size_in_bytes = Some(512);

        let expanded = expand(MemoryStorage::Ram, &plan).unwrap();
        assert_eq!(expanded.specs[0].average_item_size_in_bytes, None);
        assert_eq!(expanded.warnings.len(), 1);

        let expanded = expand(MemoryStorage::RamAndFlash, &plan).unwrap();
        assert_eq!(expanded.specs[0].average_item_size_in_bytes, Some(512));
        assert!(expanded.warnings.is_empty());
    }

    #[test]
    fn test_expansion_is_idempotent() {
        let plan = base_plan(&["RedisJSON", "RedisGraph", "RediSearch"], 3);
        let first = expand(MemoryStorage::Ram, &plan).unwrap();
        let second = expand(MemoryStorage::Ram, &plan).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_memory_and_dataset_are_mutually_exclusive() {
        let mut plan = base_plan(&[], 1);
        plan.dataset_size_in_gb = Some(2.0);
        assert!(expand(MemoryStorage::Ram, &plan).is_err());

        plan.memory_limit_in_gb = None;
        plan.dataset_size_in_gb = None;
        assert!(expand(MemoryStorage::Ram, &plan).is_err());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let plan = base_plan(&[], 0);
        assert!(expand(MemoryStorage::Ram, &plan).is_err());
    }
}
