use std::convert::TryFrom;
use tokio::time::Duration;

#[derive(Clone, Debug, Default)]
pub struct PaxosOptions {
    /// Quorum size for both phases. Fixed for the lifetime of the replica; defaults to a simple
    /// majority of the configured cluster.
    pub majority: Option<usize>,
    pub rpc_timeout: Option<Duration>,
    pub retry_backoff_min: Option<Duration>,
    pub retry_backoff_max: Option<Duration>,
}

pub(super) struct PaxosOptionsValidated {
    majority: Option<usize>,
    pub rpc_timeout: Duration,
    pub retry_backoff_min: Duration,
    pub retry_backoff_max: Duration,
}

impl PaxosOptionsValidated {
    fn validate(&self) -> Result<(), &'static str> {
        if self.rpc_timeout == Duration::from_millis(0) {
            return Err("RPC timeout must be non-zero");
        }
        if self.retry_backoff_min > self.retry_backoff_max {
            return Err("Retry backoff minimum must not exceed maximum");
        }
        if self.majority == Some(0) {
            return Err("Majority must be at least 1");
        }

        Ok(())
    }

    pub fn majority(&self, cluster_size: usize) -> Result<usize, String> {
        match self.majority {
            Some(majority) if majority > cluster_size => Err(format!(
                "Majority {} exceeds cluster size {}",
                majority, cluster_size
            )),
            Some(majority) => Ok(majority),
            None => Ok(cluster_size / 2 + 1),
        }
    }
}

impl TryFrom<PaxosOptions> for PaxosOptionsValidated {
    type Error = &'static str;

    fn try_from(options: PaxosOptions) -> Result<Self, Self::Error> {
        let values = PaxosOptionsValidated {
            majority: options.majority,
            rpc_timeout: options.rpc_timeout.unwrap_or(Duration::from_millis(500)),
            retry_backoff_min: options.retry_backoff_min.unwrap_or(Duration::from_millis(10)),
            retry_backoff_max: options.retry_backoff_max.unwrap_or(Duration::from_millis(50)),
        };

        values.validate()?;
        Ok(values)
    }
}
