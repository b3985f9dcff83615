//! Monitoring handles handed to the job-completion poller.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{ExecError, Result};

/// The only state that crosses over to the external monitor.
///
/// Built once per successful dispatch; never touched again by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringHandle {
    pub deployment_id: String,
    pub job_id: String,
    pub poll_interval: Duration,
}

impl MonitoringHandle {
    /// Fails with `MissingJobId` when `job_id` is blank.
    pub fn build(
        deployment_id: impl Into<String>,
        job_id: impl Into<String>,
        poll_interval: Duration,
    ) -> Result<Self> {
        let job_id = job_id.into();
        if job_id.trim().is_empty() {
            return Err(ExecError::MissingJobId);
        }
        Ok(Self {
            deployment_id: deployment_id.into(),
            job_id,
            poll_interval,
        })
    }
}
