//! CloudFormation stack service and EC2 instance lookup

use crate::error::{self, AwsError};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_cloudformation::types::{Parameter, StackStatus};
use fleetstack_cloud::{
    CloudError, ComputeLookup, CreateStackRequest, InstanceDescription, Result, StackResource,
    StackService,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Load shared SDK configuration for a region
///
/// Credentials come from the default provider chain (env, profile, IMDS).
pub async fn load_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

// Required members are plain references in newer SDK releases and
// `Option`s in older ones.
fn present<'a, T: ?Sized>(value: impl Into<Option<&'a T>>) -> Option<&'a T> {
    value.into()
}

/// CloudFormation-backed `StackService`
#[derive(Clone)]
pub struct CloudFormationService {
    client: aws_sdk_cloudformation::Client,
}

impl CloudFormationService {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_cloudformation::Client::new(config),
        }
    }
}

#[async_trait]
impl StackService for CloudFormationService {
    fn name(&self) -> &str {
        "cloudformation"
    }

    async fn create_stack(&self, request: &CreateStackRequest) -> Result<()> {
        let parameters = request
            .parameters
            .iter()
            .map(|(key, value)| {
                Parameter::builder()
                    .parameter_key(key)
                    .parameter_value(value)
                    .build()
            })
            .collect::<Vec<_>>();

        let output = self
            .client
            .create_stack()
            .stack_name(&request.name)
            .template_body(&request.template_body)
            .set_parameters(Some(parameters))
            .timeout_in_minutes(i32::try_from(request.timeout_minutes).unwrap_or(i32::MAX))
            .send()
            .await
            .map_err(|e| error::from_sdk("cloudformation:CreateStack", &request.name, e))?;

        debug!(
            stack = %request.name,
            stack_id = output.stack_id().unwrap_or_default(),
            "Stack accepted"
        );
        Ok(())
    }

    async fn describe_stack_status(&self, stack_name: &str) -> Result<String> {
        let output = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| error::from_sdk("cloudformation:DescribeStacks", stack_name, e))?;

        let stack = output.stacks().first().ok_or_else(|| {
            CloudError::from(AwsError::NotFound {
                operation: "cloudformation:DescribeStacks".into(),
                resource: stack_name.to_string(),
            })
        })?;
        Ok(present::<StackStatus>(stack.stack_status())
            .map(|status| status.as_str().to_string())
            .unwrap_or_default())
    }

    async fn describe_stack_resources(&self, stack_name: &str) -> Result<Vec<StackResource>> {
        let output = self
            .client
            .describe_stack_resources()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| {
                error::from_sdk("cloudformation:DescribeStackResources", stack_name, e)
            })?;

        Ok(output
            .stack_resources()
            .iter()
            .map(|resource| StackResource {
                logical_id: present::<str>(resource.logical_resource_id())
                    .unwrap_or_default()
                    .to_string(),
                physical_id: resource.physical_resource_id().map(str::to_string),
                resource_type: present::<str>(resource.resource_type())
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect())
    }
}

/// EC2-backed `ComputeLookup`
#[derive(Clone)]
pub struct Ec2Lookup {
    client: aws_sdk_ec2::Client,
}

impl Ec2Lookup {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_ec2::Client::new(config),
        }
    }
}

#[async_trait]
impl ComputeLookup for Ec2Lookup {
    async fn describe_instance(&self, instance_id: &str) -> Result<InstanceDescription> {
        let output = self
            .client
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(|e| error::from_sdk("ec2:DescribeInstances", instance_id, e))?;

        output
            .reservations()
            .iter()
            .flat_map(|reservation| reservation.instances())
            .find(|instance| instance.instance_id() == Some(instance_id))
            .map(to_description)
            .ok_or_else(|| CloudError::InstanceNotFound(instance_id.to_string()))
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

pub(crate) fn to_description(instance: &aws_sdk_ec2::types::Instance) -> InstanceDescription {
    let tags: BTreeMap<String, String> = instance
        .tags()
        .iter()
        .filter_map(|tag| {
            let value = tag.value().unwrap_or_default();
            Some((tag.key()?.to_string(), value.to_string()))
        })
        .collect();

    InstanceDescription {
        instance_id: instance.instance_id().unwrap_or_default().to_string(),
        tags,
        public_dns_name: non_empty(instance.public_dns_name()),
        private_dns_name: non_empty(instance.private_dns_name()),
        public_ip: non_empty(instance.public_ip_address()),
        private_ip: non_empty(instance.private_ip_address()),
    }
}
