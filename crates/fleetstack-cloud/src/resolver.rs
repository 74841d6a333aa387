//! Resource resolver
//!
//! Turns the compute resources of a finished stack into `HostRecord`s.

use crate::error::{CloudError, Result};
use crate::provider::{ComputeLookup, InstanceDescription, StackService};
use crate::settings::PollPolicy;
use crate::stack::StackRun;
use fleetstack_core::{Exposure, HostRecord, ResourceKind, Role};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

pub const PUBLIC_HOSTNAME_TAG: &str = "PublicHostname";
pub const PRIVATE_HOSTNAME_TAG: &str = "PrivateHostname";
pub const ROLE_TAG: &str = "Role";
pub const OS_TAG: &str = "OS";

/// Tags consumed by the resolver and not copied into `extra_tags`
pub const RESERVED_TAGS: [&str; 3] = [PUBLIC_HOSTNAME_TAG, PRIVATE_HOSTNAME_TAG, ROLE_TAG];

pub struct ResourceResolver<'a, S: StackService + ?Sized, C: ComputeLookup + ?Sized> {
    service: &'a S,
    compute: &'a C,
    policy: PollPolicy,
}

impl<'a, S, C> ResourceResolver<'a, S, C>
where
    S: StackService + ?Sized,
    C: ComputeLookup + ?Sized,
{
    pub fn new(service: &'a S, compute: &'a C, policy: PollPolicy) -> Self {
        Self {
            service,
            compute,
            policy,
        }
    }

    /// Resolve every compute resource of a successfully created stack
    #[tracing::instrument(skip_all, fields(stack = %run.name))]
    pub async fn resolve(&self, run: &StackRun) -> Result<Vec<HostRecord>> {
        let resources = self.service.describe_stack_resources(&run.name).await?;

        let mut records = Vec::new();
        for resource in resources {
            if resource.kind() != Some(ResourceKind::Instance) {
                debug!(
                    logical_id = %resource.logical_id,
                    resource_type = %resource.resource_type,
                    "Skipping non-compute resource"
                );
                continue;
            }
            let Some(instance_id) = resource.physical_id.filter(|id| !id.is_empty()) else {
                warn!(logical_id = %resource.logical_id, "Instance has no physical id, skipping");
                continue;
            };

            debug!(instance = %instance_id, "Instance created");
            let record = self.resolve_instance(&instance_id).await?;
            log_exposure(&record);
            records.push(record);
        }

        Ok(records)
    }

    /// Fetch one instance, retrying until its public hostname is known
    pub async fn resolve_instance(&self, instance_id: &str) -> Result<HostRecord> {
        let started = Instant::now();

        loop {
            match self.compute.describe_instance(instance_id).await {
                Ok(description) => {
                    if let Some(public_hostname) = public_hostname(&description) {
                        return Ok(to_record(description, public_hostname));
                    }
                    info!(
                        instance = %instance_id,
                        "Public hostname not yet known, will retry"
                    );
                }
                Err(e) if e.is_transient() => {
                    debug!(instance = %instance_id, error = %e, "Describe failed, retrying");
                }
                Err(e) => return Err(e),
            }

            if let Some(deadline) = self.policy.deadline {
                if started.elapsed() + self.policy.interval > deadline {
                    return Err(CloudError::Timeout(format!(
                        "public hostname of {} still unknown after {}s",
                        instance_id,
                        deadline.as_secs()
                    )));
                }
            }
            sleep(self.policy.interval).await;
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

fn public_hostname(description: &InstanceDescription) -> Option<String> {
    non_empty(description.tags.get(PUBLIC_HOSTNAME_TAG))
        .or_else(|| non_empty(description.public_dns_name.as_ref()))
}

fn private_hostname(description: &InstanceDescription) -> String {
    non_empty(description.tags.get(PRIVATE_HOSTNAME_TAG))
        .or_else(|| non_empty(description.private_dns_name.as_ref()))
        .unwrap_or_default()
}

fn to_record(description: InstanceDescription, public_hostname: String) -> HostRecord {
    let private_hostname = private_hostname(&description);
    let role = description.tags.get(ROLE_TAG).and_then(|tag| {
        let role = Role::from_tag(tag);
        if role.is_none() {
            warn!(instance = %description.instance_id, tag = %tag, "Unknown role tag");
        }
        role
    });
    let os = description.tags.get(OS_TAG).cloned();

    let extra_tags = description
        .tags
        .into_iter()
        .filter(|(key, _)| !RESERVED_TAGS.contains(&key.as_str()))
        .collect();

    HostRecord {
        instance_id: description.instance_id,
        role,
        os,
        public_hostname,
        private_hostname,
        public_ip: description.public_ip.filter(|ip| !ip.is_empty()),
        private_ip: description.private_ip.filter(|ip| !ip.is_empty()),
        extra_tags,
    }
}

fn log_exposure(record: &HostRecord) {
    let address = record.connect_address();
    let role = record.role.map(|r| r.tag()).unwrap_or("-");
    match address.exposure {
        Exposure::Public => info!(
            role,
            hostname = %address.hostname,
            ip = address.ip.as_deref().unwrap_or(""),
            instance = %record.instance_id,
            "Instance with public ip created"
        ),
        Exposure::Private => info!(
            role,
            hostname = %address.hostname,
            ip = address.ip.as_deref().unwrap_or(""),
            instance = %record.instance_id,
            "Instance with private ip created"
        ),
    }
}
