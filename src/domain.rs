use chrono::{DateTime, TimeDelta, Utc};
use compact_str::{CompactString, format_compact};
use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::email::EmailAddress;

/// How far back the planted author timestamp may be sampled.
const AUTHOR_BACKDATE_DAYS: i64 = 30;

/// Authenticated user, from `GET /user`.
#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    pub login: CompactString,
}

/// Repository metadata subset returned by `POST /user/repos`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoryDto {
    pub full_name: CompactString,
    pub html_url: CompactString,
}

/// Response of a contents-API write, reduced to the commit it produced.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentsWriteDto {
    pub commit: CommitRefDto,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitRefDto {
    pub sha: CompactString,
}

/// Commit metadata from `GET /repos/{owner}/{repo}/commits/{sha}`.
///
/// `author` is the platform-attributed account. It stays `None` until GitHub
/// has correlated the author email with a registered account, which may
/// never happen.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitDto {
    pub author: Option<ActorDto>,
    pub commit: GitCommitDto,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActorDto {
    pub login: CompactString,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitCommitDto {
    pub author: GitSignatureDto,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitSignatureDto {
    #[serde(default)]
    pub email: CompactString,
}

/// Outcome of a single author-resolution read.
///
/// An empty `login` means the email is not linked to any account *or* the
/// account has commit-email privacy enabled; the platform does not let us
/// tell these apart.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub login: Option<CompactString>,
    pub author_email: CompactString,
}

/// Public profile, from `GET /users/{username}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    pub login: CompactString,
    pub name: Option<CompactString>,
    pub bio: Option<CompactString>,
    pub location: Option<CompactString>,
    pub company: Option<CompactString>,
    pub html_url: CompactString,
    pub public_repos: Option<u32>,
    pub followers: Option<u32>,
}

/// Payload for `POST /user/repos`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRepositoryRequest {
    pub name: CompactString,
    pub private: bool,
    pub auto_init: bool,
    pub description: CompactString,
}

impl CreateRepositoryRequest {
    /// Private, auto-initialized throwaway repository.
    pub fn throwaway(name: &str) -> Self {
        Self {
            name: name.into(),
            private: true,
            auto_init: true,
            description: "Temporary repository, safe to delete".into(),
        }
    }
}

/// Payload for `PUT /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Clone, Serialize)]
pub struct WriteFileRequest {
    pub message: CompactString,
    /// Base64-encoded file content, per the contents-API convention.
    pub content: CompactString,
    pub author: CommitSignature,
    pub committer: CommitSignature,
}

/// Git author/committer block.
#[derive(Debug, Clone, Serialize)]
pub struct CommitSignature {
    pub name: CompactString,
    pub email: CompactString,
    pub date: DateTime<Utc>,
}

const FIRST_NAMES: &[&str] = &["Alex", "Sam", "Chris", "Jamie"];
const LAST_NAMES: &[&str] = &["Smith", "Jones", "Taylor", "Wright"];

impl CommitSignature {
    /// Author identity planted on the probe commit: a plausible human name,
    /// the target email, and a timestamp sampled uniformly from the recent
    /// past so the commit does not stand out.
    pub fn synthetic(email: &EmailAddress) -> Self {
        let mut rng = rand::thread_rng();
        let first = FIRST_NAMES.choose(&mut rng).copied().unwrap_or("Alex");
        let last = LAST_NAMES.choose(&mut rng).copied().unwrap_or("Smith");
        let backdate_secs = rng.gen_range(0..AUTHOR_BACKDATE_DAYS * 86_400);

        Self {
            name: format_compact!("{first} {last}"),
            email: email.as_str().into(),
            date: Utc::now() - TimeDelta::seconds(backdate_secs),
        }
    }

    /// Fixed neutral committer identity, stamped with the current time.
    pub fn neutral() -> Self {
        Self {
            name: "Probe Bot".into(),
            email: "bot@probe.invalid".into(),
            date: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_signature_carries_the_target_email() {
        let email: EmailAddress = "alice@example.com".parse().unwrap();
        let signature = CommitSignature::synthetic(&email);
        assert_eq!(signature.email, "alice@example.com");
        assert!(!signature.name.is_empty());
    }

    #[test]
    fn synthetic_timestamp_falls_within_the_backdate_window() {
        let email: EmailAddress = "alice@example.com".parse().unwrap();
        let now = Utc::now();
        for _ in 0..50 {
            let signature = CommitSignature::synthetic(&email);
            assert!(signature.date <= now + TimeDelta::seconds(1));
            assert!(signature.date >= now - TimeDelta::days(AUTHOR_BACKDATE_DAYS));
        }
    }

    #[test]
    fn neutral_committer_is_fixed() {
        let committer = CommitSignature::neutral();
        assert_eq!(committer.name, "Probe Bot");
        assert_eq!(committer.email, "bot@probe.invalid");
    }

    #[test]
    fn commit_dto_parses_unattributed_commits() {
        let raw = r#"{
            "author": null,
            "commit": {
                "author": { "name": "Alex Smith", "email": "alice@example.com", "date": "2024-01-01T00:00:00Z" }
            }
        }"#;
        let commit: CommitDto = serde_json::from_str(raw).unwrap();
        assert!(commit.author.is_none());
        assert_eq!(commit.commit.author.email, "alice@example.com");
    }

    #[test]
    fn commit_dto_parses_attributed_commits() {
        let raw = r#"{
            "author": { "login": "alice-gh" },
            "commit": {
                "author": { "name": "Alex Smith", "email": "alice@example.com", "date": "2024-01-01T00:00:00Z" }
            }
        }"#;
        let commit: CommitDto = serde_json::from_str(raw).unwrap();
        assert_eq!(commit.author.unwrap().login, "alice-gh");
    }

    #[test]
    fn profile_tolerates_absent_optional_fields() {
        let raw = r#"{ "login": "alice-gh", "html_url": "https://github.com/alice-gh" }"#;
        let profile: Profile = serde_json::from_str(raw).unwrap();
        assert_eq!(profile.login, "alice-gh");
        assert!(profile.name.is_none());
        assert!(profile.public_repos.is_none());
    }
}
