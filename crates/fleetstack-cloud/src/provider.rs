//! Provisioning service and compute lookup traits

use crate::error::Result;
use async_trait::async_trait;
use fleetstack_core::ResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stack creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateStackRequest {
    /// Unique stack name
    pub name: String,

    /// Serialized template body
    pub template_body: String,

    /// Named template parameters
    pub parameters: Vec<(String, String)>,

    /// Creation timeout enforced by the service (rolls back on expiry)
    pub timeout_minutes: u32,
}

/// One resource enumerated from a stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackResource {
    pub logical_id: String,

    /// Empty until the service has created the resource
    pub physical_id: Option<String>,

    /// Type name as reported by the service (e.g. "AWS::EC2::Instance")
    pub resource_type: String,
}

impl StackResource {
    pub fn kind(&self) -> Option<ResourceKind> {
        ResourceKind::from_type_name(&self.resource_type)
    }
}

/// Live description of a compute resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDescription {
    pub instance_id: String,
    pub tags: BTreeMap<String, String>,
    pub public_dns_name: Option<String>,
    pub private_dns_name: Option<String>,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
}

/// Declarative provisioning service
///
/// Implementations must accept a name only once per account and report
/// lifecycle statuses as plain strings (e.g. "CREATE_IN_PROGRESS").
#[async_trait]
pub trait StackService: Send + Sync {
    /// Returns the service name (e.g., "cloudformation")
    fn name(&self) -> &str;

    /// Submit a stack; returns as soon as the service accepted it
    async fn create_stack(&self, request: &CreateStackRequest) -> Result<()>;

    /// Current lifecycle status of the stack
    async fn describe_stack_status(&self, stack_name: &str) -> Result<String>;

    /// All resources the stack has produced
    async fn describe_stack_resources(&self, stack_name: &str) -> Result<Vec<StackResource>>;
}

/// Compute resource lookup
#[async_trait]
pub trait ComputeLookup: Send + Sync {
    async fn describe_instance(&self, instance_id: &str) -> Result<InstanceDescription>;
}
