//! Stack lifecycle tracking

use chrono::{DateTime, Utc};
use fleetstack_core::naming;
use rand::Rng;
use serde::{Deserialize, Serialize};

const SUFFIX_LEN: usize = 10;

/// The only status that counts as a successful creation
pub const SUCCESS_STATUS: &str = "CREATE_COMPLETE";

/// Classification of a raw lifecycle status reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    InProgress,
    Success,
    Failure,
    Unknown,
}

/// Classify a raw status string
///
/// Rollbacks in progress keep polling until the service reports the
/// rollback finished.
pub fn classify(status: &str) -> StatusClass {
    if status == SUCCESS_STATUS {
        StatusClass::Success
    } else if status.ends_with("IN_PROGRESS") {
        StatusClass::InProgress
    } else if status.ends_with("_FAILED")
        || status.ends_with("ROLLBACK_COMPLETE")
        || status == "DELETE_COMPLETE"
    {
        StatusClass::Failure
    } else {
        StatusClass::Unknown
    }
}

/// Lifecycle state of a submitted stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifecycleState {
    Pending,
    Succeeded,
    Failed { status: String },
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LifecycleState::Pending)
    }
}

/// A submitted stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackRun {
    pub name: String,
    pub state: LifecycleState,

    /// Template body as submitted
    pub template_body: String,

    /// Last raw status observed
    pub last_status: Option<String>,

    /// Number of status queries made (including failed ones)
    pub polls: u32,

    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl StackRun {
    pub fn new(name: impl Into<String>, template_body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: LifecycleState::Pending,
            template_body: template_body.into(),
            last_status: None,
            polls: 0,
            submitted_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == LifecycleState::Succeeded
    }

    pub(crate) fn finish(&mut self, state: LifecycleState) {
        self.state = state;
        self.finished_at = Some(Utc::now());
    }
}

/// Random lowercase suffix for stack names
pub fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect()
}

/// Generate a unique stack name: `STACK-<identity>-<name>-<suffix>`
pub fn generate_stack_name(identity: &str, stack_name: &str) -> String {
    naming::stack_id(identity, stack_name, &random_suffix())
}
