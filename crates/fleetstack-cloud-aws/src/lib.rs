//! FleetStack AWS Provider
//!
//! `StackService` on top of CloudFormation and `ComputeLookup` on top of EC2.
//!
//! ```no_run
//! # async fn example() {
//! use fleetstack_cloud_aws::{CloudFormationService, Ec2Lookup, load_config};
//!
//! let config = load_config("eu-west-1").await;
//! let stacks = CloudFormationService::new(&config);
//! let compute = Ec2Lookup::new(&config);
//! # }
//! ```

pub mod error;
pub mod provider;

pub use error::AwsError;
pub use provider::{CloudFormationService, Ec2Lookup, load_config};
