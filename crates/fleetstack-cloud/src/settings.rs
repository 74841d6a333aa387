//! Immutable provisioning settings

use fleetstack_core::{BuildOptions, FleetError, HostDecorations, OsTagStyle, naming};
use std::time::Duration;

/// Default delay between stack status queries
pub const STACK_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default delay between hostname lookups
pub const HOSTNAME_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Polling shape shared by the driver and the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,

    /// Give up with `CloudError::Timeout` once this much time has passed.
    /// `None` polls until the service reports something conclusive.
    pub deadline: Option<Duration>,
}

impl PollPolicy {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    pub fn stack() -> Self {
        Self::new(STACK_POLL_INTERVAL)
    }

    pub fn hostname() -> Self {
        Self::new(HOSTNAME_POLL_INTERVAL)
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Everything a provisioning run needs, resolved once up front
#[derive(Debug, Clone)]
pub struct ProvisionSettings {
    pub region: String,

    /// Key pair passed as the `KeyName` template parameter
    pub key_name: String,

    /// Leading alphabetic run of the key pair name
    pub identity: String,

    pub private_key_path: Option<String>,
    pub ssh_extra_args: Option<String>,

    /// Extra template parameters
    pub parameters: Vec<(String, String)>,

    pub timeout_minutes: u32,
    pub os_tag_style: OsTagStyle,
    pub stack_poll: PollPolicy,
    pub hostname_poll: PollPolicy,
}

impl ProvisionSettings {
    pub fn new(
        region: impl Into<String>,
        key_name: impl Into<String>,
    ) -> fleetstack_core::Result<Self> {
        let key_name = key_name.into();
        let identity = naming::identity_fragment(&key_name)?;
        Ok(Self {
            region: region.into(),
            key_name,
            identity,
            private_key_path: None,
            ssh_extra_args: None,
            parameters: Vec::new(),
            timeout_minutes: 10,
            os_tag_style: OsTagStyle::default(),
            stack_poll: PollPolicy::stack(),
            hostname_poll: PollPolicy::hostname(),
        })
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            identity: self.identity.clone(),
            os_tag_style: self.os_tag_style,
        }
    }

    pub fn decorations(&self) -> HostDecorations {
        HostDecorations {
            private_key_path: self.private_key_path.clone(),
            ssh_extra_args: self.ssh_extra_args.clone(),
        }
    }

    /// User parameters followed by `KeyName`
    pub fn template_parameters(&self) -> Vec<(String, String)> {
        let mut parameters = self.parameters.clone();
        parameters.push((
            fleetstack_core::template::KEY_NAME_PARAMETER.to_string(),
            self.key_name.clone(),
        ));
        parameters
    }
}

/// Parse a `NAME=VALUE` template parameter
pub fn parse_parameter(raw: &str) -> fleetstack_core::Result<(String, String)> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() && !value.contains('=') => {
            Ok((name.to_string(), value.to_string()))
        }
        _ => Err(FleetError::InvalidParameter(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_from_key_name() {
        let settings = ProvisionSettings::new("eu-west-1", "jdoe-eu").unwrap();
        assert_eq!(settings.identity, "jdoe");
        assert_eq!(settings.build_options().identity, "jdoe");
        assert!(ProvisionSettings::new("eu-west-1", "1234").is_err());
    }

    #[test]
    fn test_template_parameters_end_with_key_name() {
        let mut settings = ProvisionSettings::new("eu-west-1", "jdoe-eu").unwrap();
        settings.parameters = vec![("Env".into(), "qa".into())];
        assert_eq!(
            settings.template_parameters(),
            vec![
                ("Env".to_string(), "qa".to_string()),
                ("KeyName".to_string(), "jdoe-eu".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_parameter() {
        assert_eq!(
            parse_parameter("Env=qa").unwrap(),
            ("Env".to_string(), "qa".to_string())
        );
        assert_eq!(
            parse_parameter("Empty=").unwrap(),
            ("Empty".to_string(), String::new())
        );
        assert!(parse_parameter("novalue").is_err());
        assert!(parse_parameter("=qa").is_err());
        assert!(parse_parameter("a=b=c").is_err());
    }

    #[test]
    fn test_poll_policy_defaults() {
        assert_eq!(PollPolicy::stack().interval, Duration::from_secs(10));
        assert_eq!(PollPolicy::hostname().interval, Duration::from_secs(20));
        assert_eq!(PollPolicy::stack().deadline, None);
        assert_eq!(
            PollPolicy::stack()
                .with_deadline(Duration::from_secs(60))
                .deadline,
            Some(Duration::from_secs(60))
        );
    }
}
