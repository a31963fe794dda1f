//! Probe protocol: repository lifecycle, author resolution polling, cleanup
//!
//! One probe per invocation. The flow is strictly linear: create a throwaway
//! repository, plant a commit authored with the target email, poll until
//! GitHub attributes the commit to an account (or the bound is exhausted),
//! fetch the profile for a resolved login, then delete the repository.
//! Cleanup runs on every exit path once the repository exists.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use compact_str::{CompactString, ToCompactString, format_compact};
use rand::Rng;
use tracing::{debug, info, instrument, warn};

use crate::{
    client::{GithubApi, Result},
    domain::Profile,
    email::EmailAddress,
};

/// Fixed bound on author-resolution polling.
///
/// GitHub's author-identity correlation is asynchronous and not guaranteed
/// to be immediate; a bounded poll trades latency for reliability without
/// blocking indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            attempts: 8,
            delay: Duration::from_secs(1),
        }
    }
}

impl PollSchedule {
    /// Delay to wait after a missed attempt, or `None` once the bound is
    /// exhausted. Attempts are zero-indexed; there is no delay after the
    /// final attempt.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        (attempt + 1 < self.attempts).then_some(self.delay)
    }
}

/// Suspension primitive used between poll attempts, injected so tests run
/// without real time.
#[allow(async_fn_in_trait)]
pub trait Sleep {
    async fn pause(&self, duration: Duration);
}

impl<S: Sleep> Sleep for &S {
    async fn pause(&self, duration: Duration) {
        (**self).pause(duration).await;
    }
}

/// Real clock
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleep;

impl Sleep for TokioSleep {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How the throwaway repository ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoDisposition {
    /// Deleted during cleanup.
    Deleted,
    /// Retention was requested; the repository was left in place.
    Kept { url: CompactString },
    /// Deletion failed; the repository may still exist.
    LeftBehind {
        name: CompactString,
        error: CompactString,
    },
}

/// Terminal result of one probe.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub email: EmailAddress,
    /// Platform-attributed login, if GitHub correlated the email.
    pub login: Option<CompactString>,
    pub profile: Option<Profile>,
    /// Resolution attempts actually performed.
    pub attempts: u32,
    pub repo: RepoDisposition,
}

impl ProbeOutcome {
    /// Whether GitHub mapped the email to an account.
    pub fn linked(&self) -> bool {
        self.login.is_some()
    }
}

/// Scoped ownership of the throwaway repository.
///
/// Armed as soon as the repository exists. `settle` runs on every exit path
/// of the probe and either deletes the repository or reports why it was
/// left in place; deletion failure is a warning, never an error.
struct RepoGuard<'a> {
    api: &'a GithubApi,
    owner: CompactString,
    name: CompactString,
    url: CompactString,
    keep: bool,
}

impl RepoGuard<'_> {
    async fn settle(self) -> RepoDisposition {
        if self.keep {
            info!(url = %self.url, "Keeping temporary repository");
            return RepoDisposition::Kept { url: self.url };
        }

        info!(repo = %self.name, "Cleaning up");
        match self.api.delete_repository(&self.owner, &self.name).await {
            Ok(()) => {
                debug!(repo = %self.name, "Temporary repository deleted");
                RepoDisposition::Deleted
            }
            Err(e) => {
                warn!(repo = %self.name, error = %e, "Failed to delete temporary repository");
                RepoDisposition::LeftBehind {
                    name: self.name,
                    error: e.to_compact_string(),
                }
            }
        }
    }
}

/// Drives one probe through the client.
#[derive(Debug)]
pub struct ProbeOrchestrator<S = TokioSleep> {
    api: Arc<GithubApi>,
    schedule: PollSchedule,
    sleep: S,
}

impl ProbeOrchestrator<TokioSleep> {
    pub fn new(api: Arc<GithubApi>) -> Self {
        Self::with_parts(api, PollSchedule::default(), TokioSleep)
    }
}

impl<S: Sleep> ProbeOrchestrator<S> {
    /// Orchestrator with an explicit schedule and clock.
    pub fn with_parts(api: Arc<GithubApi>, schedule: PollSchedule, sleep: S) -> Self {
        Self { api, schedule, sleep }
    }

    /// Run the probe to completion.
    ///
    /// A failure before the repository exists aborts with nothing to clean
    /// up. Once it exists, cleanup is attempted on every exit path; cleanup
    /// failure never masks the probe result.
    #[instrument(skip(self, email), fields(email = %email))]
    pub async fn run(&self, email: &EmailAddress, keep_repo: bool) -> Result<ProbeOutcome> {
        let identity = self.api.identity().await?;
        info!(login = %identity.login, "Authenticated");

        let name = generate_repo_name();
        info!(repo = %name, "Creating temporary repository");
        let repository = self.api.create_repository(&name).await?;
        debug!(repo = %repository.full_name, "Repository created");

        let guard = RepoGuard {
            api: self.api.as_ref(),
            owner: identity.login.clone(),
            name: name.clone(),
            url: repository.html_url,
            keep: keep_repo,
        };

        let probed = self.probe_repository(&identity.login, &name, email).await;
        let repo = guard.settle().await;

        let (login, profile, attempts) = probed?;
        Ok(ProbeOutcome {
            email: email.clone(),
            login,
            profile,
            attempts,
            repo,
        })
    }

    /// Steps that run while the repository exists.
    async fn probe_repository(
        &self,
        owner: &str,
        repo: &str,
        email: &EmailAddress,
    ) -> Result<(Option<CompactString>, Option<Profile>, u32)> {
        info!("Creating probe commit");
        let sha = self.api.create_probe_commit(owner, repo, email).await?;

        info!(%sha, "Resolving commit author");
        let (login, attempts) = self.resolve_with_polling(owner, repo, &sha).await?;

        let profile = match &login {
            Some(login) => {
                let profile = self.api.get_profile(login).await?;
                debug!(login = %profile.login, "Fetched public profile");
                Some(profile)
            }
            None => None,
        };

        Ok((login, profile, attempts))
    }

    /// Bounded poll for author attribution. Stops at the first non-empty
    /// login. Exhausting the bound is the valid "unlinked or
    /// privacy-protected" outcome, not an error.
    async fn resolve_with_polling(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<(Option<CompactString>, u32)> {
        let mut attempts = 0;
        for attempt in 0..self.schedule.attempts {
            attempts = attempt + 1;
            let resolution = self.api.resolve_commit_author(owner, repo, sha).await?;

            if let Some(login) = resolution.login {
                debug!(%login, attempts, "Commit author resolved");
                return Ok((Some(login), attempts));
            }
            debug!(author_email = %resolution.author_email, attempts, "Author not yet attributed");

            if let Some(delay) = self.schedule.delay_after(attempt) {
                self.sleep.pause(delay).await;
            }
        }

        debug!(attempts, "Commit author never resolved within the poll bound");
        Ok((None, attempts))
    }
}

const REPO_SUFFIX_LEN: usize = 8;

/// Collision-resistant name for the throwaway repository.
pub fn generate_repo_name() -> CompactString {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..REPO_SUFFIX_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format_compact!("tmp-probe-{}-{}", Utc::now().timestamp(), suffix)
}
