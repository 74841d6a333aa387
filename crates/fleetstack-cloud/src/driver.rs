//! Provisioning driver
//!
//! Submits a template and observes the stack until the service reports a
//! terminal status. Failed stacks are left in place for inspection.

use crate::error::{CloudError, Result};
use crate::provider::{CreateStackRequest, StackService};
use crate::settings::{PollPolicy, ProvisionSettings};
use crate::stack::{self, LifecycleState, StackRun, StatusClass};
use fleetstack_core::{ResourceGraph, template};
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

pub struct ProvisioningDriver<'a, S: StackService + ?Sized> {
    service: &'a S,
    policy: PollPolicy,
}

impl<'a, S: StackService + ?Sized> ProvisioningDriver<'a, S> {
    pub fn new(service: &'a S, policy: PollPolicy) -> Self {
        Self { service, policy }
    }

    /// Serialize and submit the graph under a freshly generated name
    ///
    /// Returns once the service accepted the request.
    #[tracing::instrument(skip_all, fields(service = self.service.name()))]
    pub async fn submit(
        &self,
        graph: &ResourceGraph,
        stack_name: &str,
        settings: &ProvisionSettings,
    ) -> Result<StackRun> {
        graph.validate()?;
        let template_body = template::to_template_body(graph)?;
        let name = stack::generate_stack_name(&settings.identity, stack_name);

        info!(stack = %name, timeout_minutes = settings.timeout_minutes, "Creating stack");
        let request = CreateStackRequest {
            name: name.clone(),
            template_body: template_body.clone(),
            parameters: settings.template_parameters(),
            timeout_minutes: settings.timeout_minutes,
        };
        self.service
            .create_stack(&request)
            .await
            .map_err(|e| CloudError::SubmissionFailed {
                stack: name.clone(),
                message: e.to_string(),
            })?;

        Ok(StackRun::new(name, template_body))
    }

    /// Poll until the stack reaches a terminal status
    ///
    /// Transient query failures are retried on the next tick. Any other
    /// query failure is returned as an error.
    #[tracing::instrument(skip_all, fields(stack = %run.name))]
    pub async fn await_terminal(&self, mut run: StackRun) -> Result<(bool, StackRun)> {
        let started = Instant::now();

        loop {
            sleep(self.policy.interval).await;

            if let Some(deadline) = self.policy.deadline {
                if started.elapsed() >= deadline {
                    warn!(polls = run.polls, "Stack did not finish before the deadline");
                    return Err(CloudError::Timeout(format!(
                        "stack {} still in progress after {}s",
                        run.name,
                        deadline.as_secs()
                    )));
                }
            }

            run.polls += 1;
            let status = match self.service.describe_stack_status(&run.name).await {
                Ok(status) => status,
                Err(e) if e.is_transient() => {
                    debug!(error = %e, "Status query failed, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let class = stack::classify(&status);
            debug!(status = %status, ?class, polls = run.polls, "Stack status");
            run.last_status = Some(status.clone());

            match class {
                StatusClass::InProgress => continue,
                StatusClass::Success => {
                    info!(polls = run.polls, "Stack creation completed");
                    run.finish(LifecycleState::Succeeded);
                    return Ok((true, run));
                }
                StatusClass::Failure => {
                    error!(status = %status, "Stack creation failed");
                    run.finish(LifecycleState::Failed { status });
                    return Ok((false, run));
                }
                StatusClass::Unknown => {
                    error!(status = %status, "Unrecognized stack status");
                    run.finish(LifecycleState::Failed { status });
                    return Ok((false, run));
                }
            }
        }
    }
}
