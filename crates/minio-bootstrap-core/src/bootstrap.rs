//! The reconciliation state machine.
//!
//! [`Bootstrapper::run`] walks a fixed sequence of steps:
//!
//! ```text
//! connect -> bucket -> identity -> policy -> attach -> cleanup -> verify
//! ```
//!
//! Each step probes before it mutates, so a second run against an already
//! provisioned store only rewrites the policy and re-applies the attachment.
//! Step results are collected into a [`BootstrapReport`].

use std::fmt;

use tracing::{debug, info, warn};

use crate::admin::{AdminError, ObjectStoreAdmin};
use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, BootstrapResult};
use crate::policy::PolicyDocument;
use crate::retry::{Clock, retry};
use crate::staging::StagedPolicy;

/// A step of the bootstrap sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Reach the service with the admin credentials.
    Connect,
    /// Ensure the bucket exists.
    Bucket,
    /// Ensure the application identity exists.
    Identity,
    /// Write the bucket-scoped policy.
    Policy,
    /// Attach the policy to the identity.
    Attach,
    /// Remove the staged policy file.
    Cleanup,
    /// Exercise the bucket with the application identity.
    Verify,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Bucket => "ensure bucket",
            Self::Identity => "ensure identity",
            Self::Policy => "ensure policy",
            Self::Attach => "attach policy",
            Self::Cleanup => "cleanup",
            Self::Verify => "verify access",
        })
    }
}

/// What a step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Completed with nothing to report.
    Done,
    /// A missing resource was created.
    Created,
    /// The resource was already in the desired state.
    AlreadyPresent,
    /// An existing resource was written again.
    Updated,
    /// Completed with a benign problem.
    Warned(String),
    /// Not run for this configuration.
    Skipped,
}

/// Per-step results of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    steps: Vec<(Step, StepOutcome)>,
}

impl BootstrapReport {
    fn record(&mut self, step: Step, outcome: StepOutcome) {
        self.steps.push((step, outcome));
    }

    /// The outcome of `step`, if it ran.
    #[must_use]
    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.steps.iter().find(|(s, _)| *s == step).map(|(_, o)| o)
    }

    /// All steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[(Step, StepOutcome)] {
        &self.steps
    }

    /// Whether any step completed with a warning.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.steps
            .iter()
            .any(|(_, o)| matches!(o, StepOutcome::Warned(_)))
    }
}

/// Drives one bootstrap run against an [`ObjectStoreAdmin`].
#[derive(Clone, Copy)]
pub struct Bootstrapper<'a> {
    config: &'a BootstrapConfig,
    admin: &'a dyn ObjectStoreAdmin,
    clock: &'a dyn Clock,
}

impl fmt::Debug for Bootstrapper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bootstrapper")
            .field("config", self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> Bootstrapper<'a> {
    /// Create a bootstrapper.
    #[must_use]
    pub fn new(
        config: &'a BootstrapConfig,
        admin: &'a dyn ObjectStoreAdmin,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            config,
            admin,
            clock,
        }
    }

    /// Run every step in order.
    ///
    /// # Errors
    ///
    /// - [`BootstrapError::ConnectTimeout`] when the retry budget runs out.
    /// - [`BootstrapError::Step`] when a probe or mutation fails with anything
    ///   other than a benign conflict.
    /// - [`BootstrapError::Staging`] when the policy file cannot be written.
    pub async fn run(&self) -> BootstrapResult<BootstrapReport> {
        let config = self.config;
        info!(
            bucket = %config.bucket,
            endpoint = %config.endpoint_url(),
            app_access_key = %config.app_credentials.access_key(),
            admin_access_key = %config.admin_credentials.access_key(),
            "starting object store bootstrap"
        );

        let mut report = BootstrapReport::default();

        report.record(Step::Connect, self.connect().await?);
        report.record(Step::Bucket, self.ensure_bucket().await?);
        report.record(Step::Identity, self.ensure_identity().await?);

        let document = PolicyDocument::for_bucket(&config.bucket);
        let staged = StagedPolicy::stage(&document, config.policy_dir.as_deref())
            .map_err(BootstrapError::Staging)?;

        let applied = match self.ensure_policy(&staged).await {
            Ok(outcome) => {
                report.record(Step::Policy, outcome);
                self.attach_policy().await
            }
            Err(e) => Err(e),
        };

        let cleanup = match staged.remove() {
            Ok(()) => StepOutcome::Done,
            Err(e) => {
                warn!(error = %e, "failed to remove staged policy document");
                StepOutcome::Warned(e.to_string())
            }
        };
        report.record(Step::Attach, applied?);
        report.record(Step::Cleanup, cleanup);

        report.record(Step::Verify, self.verify_access().await?);

        info!(
            bucket = %config.bucket,
            warnings = report.has_warnings(),
            "object store bootstrap complete"
        );
        Ok(report)
    }

    async fn connect(&self) -> BootstrapResult<StepOutcome> {
        let policy = &self.config.connect_retry;
        info!(
            endpoint = %self.config.endpoint_url(),
            max_attempts = policy.max_attempts,
            interval = ?policy.interval,
            deadline = ?policy.deadline,
            "waiting for object store"
        );

        retry(policy, self.clock, |attempt| async move {
            debug!(
                attempt = attempt.number,
                timeout = ?attempt.timeout,
                "checking object store connection"
            );
            let Some(limit) = attempt.timeout else {
                return self.admin.check_connection().await;
            };
            tokio::time::timeout(limit, self.admin.check_connection())
                .await
                .map_err(|_| AdminError::Unreachable(format!("no response within {limit:?}")))?
        })
        .await
        .map_err(|e| BootstrapError::ConnectTimeout {
            attempts: e.attempts(),
            last_error: e.into_last_error(),
        })?;

        info!("object store is reachable");
        Ok(StepOutcome::Done)
    }

    async fn ensure_bucket(&self) -> BootstrapResult<StepOutcome> {
        let bucket = self.config.bucket.as_str();
        let step = |source| BootstrapError::Step {
            step: Step::Bucket,
            source,
        };

        if self.admin.bucket_exists(bucket).await.map_err(step)? {
            info!(bucket, "bucket already exists");
            return Ok(StepOutcome::AlreadyPresent);
        }

        match self.admin.create_bucket(bucket).await {
            Ok(()) => {
                info!(bucket, "created bucket");
                Ok(StepOutcome::Created)
            }
            Err(e) if e.is_already_exists() => {
                info!(bucket, "bucket appeared concurrently, treating as existing");
                Ok(StepOutcome::AlreadyPresent)
            }
            Err(e) => Err(step(e)),
        }
    }

    async fn ensure_identity(&self) -> BootstrapResult<StepOutcome> {
        let credentials = &self.config.app_credentials;
        let access_key = credentials.access_key();
        let step = |source| BootstrapError::Step {
            step: Step::Identity,
            source,
        };

        if self.admin.user_exists(access_key).await.map_err(step)? {
            if !self.config.rotate_secret {
                info!(access_key, "application identity already exists, secret left unchanged");
                return Ok(StepOutcome::AlreadyPresent);
            }
            self.admin.put_user(credentials).await.map_err(step)?;
            warn!(access_key, "rotated secret of existing application identity");
            return Ok(StepOutcome::Updated);
        }

        match self.admin.put_user(credentials).await {
            Ok(()) => {
                info!(access_key, "created application identity");
                Ok(StepOutcome::Created)
            }
            Err(e) if e.is_already_exists() => {
                info!(access_key, "identity appeared concurrently, treating as existing");
                Ok(StepOutcome::AlreadyPresent)
            }
            Err(e) => Err(step(e)),
        }
    }

    async fn ensure_policy(&self, staged: &StagedPolicy) -> BootstrapResult<StepOutcome> {
        let name = self.config.policy_name();
        let document = staged.read().await.map_err(BootstrapError::Staging)?;

        match self.admin.put_policy(&name, &document).await {
            Ok(()) => {
                info!(policy = %name, path = %staged.path().display(), "wrote policy");
                Ok(StepOutcome::Updated)
            }
            Err(e @ AdminError::AlreadyExists { .. }) => {
                warn!(policy = %name, error = %e, "policy already exists, keeping existing definition");
                Ok(StepOutcome::Warned(e.to_string()))
            }
            Err(e) => {
                warn!(policy = %name, error = %e, "failed to write policy, continuing");
                Ok(StepOutcome::Warned(e.to_string()))
            }
        }
    }

    async fn attach_policy(&self) -> BootstrapResult<StepOutcome> {
        let policy = self.config.policy_name();
        let user = self.config.app_credentials.access_key();

        match self.admin.attach_policy(&policy, user).await {
            Ok(()) => {
                info!(policy = %policy, user, "attached policy");
                Ok(StepOutcome::Updated)
            }
            Err(AdminError::AlreadyAttached { .. }) => {
                info!(policy = %policy, user, "policy already attached");
                Ok(StepOutcome::AlreadyPresent)
            }
            Err(source) => Err(BootstrapError::Step {
                step: Step::Attach,
                source,
            }),
        }
    }

    async fn verify_access(&self) -> BootstrapResult<StepOutcome> {
        if !self.config.verify_access {
            return Ok(StepOutcome::Skipped);
        }

        let bucket = self.config.bucket.as_str();
        self.admin
            .probe_access(bucket, &self.config.app_credentials)
            .await
            .map_err(|source| BootstrapError::Step {
                step: Step::Verify,
                source,
            })?;

        info!(bucket, "application identity can read and write the bucket");
        Ok(StepOutcome::Done)
    }
}
