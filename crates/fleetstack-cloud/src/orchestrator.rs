//! build → submit → poll → resolve → emit

use crate::driver::ProvisioningDriver;
use crate::error::Result;
use crate::provider::{ComputeLookup, StackService};
use crate::resolver::ResourceResolver;
use crate::settings::ProvisionSettings;
use crate::stack::StackRun;
use fleetstack_core::{
    HostRecord, ImageCatalog, InventoryLayout, InventoryReport, ResourceGraph, Topology, build,
    inventory, naming, template,
};
use std::path::PathBuf;
use tracing::{info, warn};

/// Result of a provisioning run
#[derive(Debug)]
pub enum ProvisionOutcome {
    /// The stack reached a failure status and was left in place
    StackFailed { run: StackRun },

    Completed {
        run: StackRun,
        hosts: Vec<HostRecord>,
        inventory: InventoryReport,
    },
}

/// A graph built and serialized without contacting the service
#[derive(Debug, Clone)]
pub struct Plan {
    pub graph: ResourceGraph,
    pub template_body: String,
}

/// Build, validate and serialize the template
pub fn plan(
    topology: &Topology,
    catalog: &ImageCatalog,
    settings: &ProvisionSettings,
) -> Result<Plan> {
    let graph = build(topology, catalog, &settings.build_options())?;
    graph.validate()?;
    let template_body = template::to_template_body(&graph)?;
    Ok(Plan {
        graph,
        template_body,
    })
}

pub struct Orchestrator<'a, S: StackService + ?Sized, C: ComputeLookup + ?Sized> {
    service: &'a S,
    compute: &'a C,
    settings: &'a ProvisionSettings,
}

impl<'a, S, C> Orchestrator<'a, S, C>
where
    S: StackService + ?Sized,
    C: ComputeLookup + ?Sized,
{
    pub fn new(service: &'a S, compute: &'a C, settings: &'a ProvisionSettings) -> Self {
        Self {
            service,
            compute,
            settings,
        }
    }

    /// Run the whole flow for one topology
    ///
    /// `inventory_path` defaults to `hosts_<fs>_<name>.cfg` in the current
    /// directory.
    pub async fn provision(
        &self,
        topology: &Topology,
        catalog: &ImageCatalog,
        inventory_path: Option<PathBuf>,
    ) -> Result<ProvisionOutcome> {
        let plan = plan(topology, catalog, self.settings)?;

        let driver = ProvisioningDriver::new(self.service, self.settings.stack_poll);
        let run = driver.submit(&plan.graph, &topology.name, self.settings).await?;
        let (success, run) = driver.await_terminal(run).await?;
        if !success {
            warn!(stack = %run.name, "Stack left in place for inspection");
            return Ok(ProvisionOutcome::StackFailed { run });
        }

        let resolver =
            ResourceResolver::new(self.service, self.compute, self.settings.hostname_poll);
        let hosts = resolver.resolve(&run).await?;
        info!(stack = %run.name, hosts = hosts.len(), "Resolved hosts");

        let path = inventory_path.unwrap_or_else(|| {
            PathBuf::from(naming::inventory_file_name(topology.fs_mode, &topology.name))
        });
        let inventory = inventory::emit(
            &hosts,
            &InventoryLayout::from_topology(topology),
            &self.settings.decorations(),
            &path,
        )?;

        Ok(ProvisionOutcome::Completed {
            run,
            hosts,
            inventory,
        })
    }
}
