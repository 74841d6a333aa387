//! Scripted in-memory providers for tests

use crate::error::{CloudError, Result};
use crate::provider::{
    ComputeLookup, CreateStackRequest, InstanceDescription, StackResource, StackService,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

/// Replays a fixed sequence of status answers; the last one repeats
#[derive(Default)]
pub struct FakeStackService {
    statuses: Mutex<VecDeque<Result<String>>>,
    resources: Vec<StackResource>,
    pub created: Mutex<Vec<CreateStackRequest>>,
    pub status_calls: Mutex<u32>,
    pub reject_create: bool,
}

impl FakeStackService {
    pub fn with_statuses(statuses: &[&str]) -> Self {
        Self {
            statuses: Mutex::new(statuses.iter().map(|s| Ok(s.to_string())).collect()),
            ..Default::default()
        }
    }

    pub fn with_script(script: Vec<Result<String>>) -> Self {
        Self {
            statuses: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    pub fn with_resources(mut self, resources: Vec<StackResource>) -> Self {
        self.resources = resources;
        self
    }

    pub fn calls(&self) -> u32 {
        *self.status_calls.lock().unwrap()
    }
}

#[async_trait]
impl StackService for FakeStackService {
    fn name(&self) -> &str {
        "fake"
    }

    async fn create_stack(&self, request: &CreateStackRequest) -> Result<()> {
        if self.reject_create {
            return Err(CloudError::ApiError("AlreadyExistsException".into()));
        }
        self.created.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn describe_stack_status(&self, _stack_name: &str) -> Result<String> {
        *self.status_calls.lock().unwrap() += 1;
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            return statuses.pop_front().unwrap_or_else(|| Ok(String::new()));
        }
        match statuses.front() {
            Some(Ok(status)) => Ok(status.clone()),
            Some(Err(_)) => Err(CloudError::Throttled("Rate exceeded".into())),
            None => Ok("CREATE_IN_PROGRESS".into()),
        }
    }

    async fn describe_stack_resources(&self, _stack_name: &str) -> Result<Vec<StackResource>> {
        Ok(self.resources.clone())
    }
}

/// Hands out scripted descriptions per instance; the last one repeats
#[derive(Default)]
pub struct FakeCompute {
    descriptions: Mutex<BTreeMap<String, VecDeque<InstanceDescription>>>,
    pub fetches: Mutex<BTreeMap<String, u32>>,
}

impl FakeCompute {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instance(self, descriptions: Vec<InstanceDescription>) -> Self {
        if let Some(first) = descriptions.first() {
            let id = first.instance_id.clone();
            self.descriptions
                .lock()
                .unwrap()
                .insert(id, descriptions.into());
        }
        self
    }

    pub fn fetches_of(&self, instance_id: &str) -> u32 {
        self.fetches
            .lock()
            .unwrap()
            .get(instance_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ComputeLookup for FakeCompute {
    async fn describe_instance(&self, instance_id: &str) -> Result<InstanceDescription> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(instance_id.to_string())
            .or_default() += 1;

        let mut descriptions = self.descriptions.lock().unwrap();
        let queue = descriptions
            .get_mut(instance_id)
            .ok_or_else(|| CloudError::InstanceNotFound(instance_id.to_string()))?;
        if queue.len() > 1 {
            if let Some(next) = queue.pop_front() {
                return Ok(next);
            }
        }
        queue
            .front()
            .cloned()
            .ok_or_else(|| CloudError::InstanceNotFound(instance_id.to_string()))
    }
}

pub fn instance(id: &str, role: &str, public_dns: Option<&str>) -> InstanceDescription {
    InstanceDescription {
        instance_id: id.to_string(),
        tags: BTreeMap::from([
            ("Role".to_string(), role.to_string()),
            ("Name".to_string(), format!("jdoe_nfs_rhui_{}", role.to_lowercase())),
        ]),
        public_dns_name: public_dns.map(str::to_string),
        private_dns_name: Some(format!("ip-10-0-0-{}.internal", id.len())),
        public_ip: public_dns.map(|_| "54.0.0.1".to_string()),
        private_ip: Some("10.0.0.1".to_string()),
    }
}

pub fn instance_resource(logical_id: &str, physical_id: &str) -> StackResource {
    StackResource {
        logical_id: logical_id.to_string(),
        physical_id: Some(physical_id.to_string()),
        resource_type: "AWS::EC2::Instance".to_string(),
    }
}
