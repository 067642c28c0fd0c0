//! Service catalog advertised by the broker.
//!
//! The broker offers a single service with a single plan: attach a tenant
//! database to a cluster that already exists. Both identifiers are fixed.

use serde::Serialize;

/// Identifier of the one service offering.
pub const SERVICE_ID: &str = "2a04f349-4aab-4fcb-af6d-8e1749a77c13";

/// Identifier of the "use an existing cluster" plan.
pub const PLAN_EXISTING_CLUSTER_ID: &str = "8db474d1-3cc0-4f4d-b864-24e3bd49b874";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Catalog {
    pub services: Vec<ServiceOffering>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceOffering {
    pub id: String,
    pub name: String,
    pub description: String,
    pub bindable: bool,
    pub plan_updateable: bool,
    pub tags: Vec<String>,
    pub metadata: ServiceMetadata,
    pub plans: Vec<ServicePlan>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetadata {
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServicePlan {
    pub id: String,
    pub name: String,
    pub description: String,
    pub free: bool,
    pub bindable: bool,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            services: vec![ServiceOffering {
                id: SERVICE_ID.to_string(),
                name: "atlas-mongodb-cluster".to_string(),
                description: "Atlas/MongoDB for applications".to_string(),
                bindable: true,
                plan_updateable: false,
                tags: vec!["atlas".to_string(), "mongodb".to_string()],
                metadata: ServiceMetadata {
                    display_name: "Atlas - MongoDB Cloud Provider".to_string(),
                },
                plans: vec![ServicePlan {
                    id: PLAN_EXISTING_CLUSTER_ID.to_string(),
                    name: "atlas-mongodb-existing-cluster".to_string(),
                    description: "Atlas/MongoDB: Configure an existing cluster".to_string(),
                    free: false,
                    bindable: true,
                }],
            }],
        }
    }

    /// Whether `plan_id` names a plan of this catalog.
    pub fn has_plan(&self, plan_id: &str) -> bool {
        self.services
            .iter()
            .flat_map(|s| s.plans.iter())
            .any(|p| p.id == plan_id)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
