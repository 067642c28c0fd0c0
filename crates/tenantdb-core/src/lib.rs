pub mod catalog;
pub mod config;

pub use catalog::{Catalog, PLAN_EXISTING_CLUSTER_ID, SERVICE_ID, ServiceOffering, ServicePlan};
pub use config::{BrokerConfig, ClusterConfig, ConfigError, ControlPlaneKind, ParameterKeys};
