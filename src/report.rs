//! Terminal and machine-readable presentation of probe outcomes

use crossterm::style::Stylize;
use serde_json::{Value, json};

use crate::probe::{ProbeOutcome, RepoDisposition};

const BANNER: &str = r#"
        _                     _
   __ _| |__  _ __  _ __ ___ | |__   ___
  / _` | '_ \| '_ \| '__/ _ \| '_ \ / _ \
 | (_| | | | | |_) | | | (_) | |_) |  __/
  \__, |_| |_| .__/|_|  \___/|_.__/ \___|
  |___/      |_|
"#;

const BIO_MAX_LEN: usize = 80;

pub fn print_banner() {
    println!("{}", BANNER.magenta());
    println!("{}", "Discover the GitHub account behind an email".cyan());
    println!(
        "{}\n",
        "Ethical use only - probe addresses you are authorized to investigate".yellow()
    );
}

/// Render the outcome for humans.
pub fn print_outcome(outcome: &ProbeOutcome) {
    println!();

    if let Some(login) = &outcome.login {
        println!("{}", "ACCOUNT FOUND".green().bold());
        println!("{}     {}", "Email:".cyan(), outcome.email);
        println!("{}  {}", "Username:".cyan(), login.as_str().green().bold());
        if let Some(profile) = &outcome.profile {
            print_profile(profile);
        }
    } else {
        println!("{}", "NO ACCOUNT FOUND".yellow().bold());
        println!("{} {}", "Email:".cyan(), outcome.email);
        println!();
        println!(
            "{}",
            format!(
                "No correlation after {} resolution attempts. This email is not",
                outcome.attempts
            )
            .dim()
        );
        println!("{}", "linked to any GitHub account, or the account has email privacy enabled.".dim());
    }

    match &outcome.repo {
        RepoDisposition::Kept { url } => {
            println!();
            println!("{} {url}", "Repository kept:".cyan());
        }
        RepoDisposition::LeftBehind { name, error } => {
            println!();
            println!(
                "{}",
                format!("Failed to delete temporary repository {name}: {error}").yellow()
            );
        }
        RepoDisposition::Deleted => {}
    }

    println!();
}

fn print_profile(profile: &crate::domain::Profile) {
    if let Some(name) = &profile.name {
        println!("{}      {}", "Name:".cyan(), name);
    }
    println!("{}   {}", "Profile:".cyan(), profile.html_url);
    if let Some(bio) = &profile.bio {
        println!("{}       {}", "Bio:".cyan(), truncate(bio, BIO_MAX_LEN));
    }
    if let Some(location) = &profile.location {
        println!("{}  {}", "Location:".cyan(), location);
    }
    if let Some(company) = &profile.company {
        println!("{}   {}", "Company:".cyan(), company);
    }

    let mut stats = Vec::new();
    if let Some(repos) = profile.public_repos {
        stats.push(format!("{repos} repos"));
    }
    if let Some(followers) = profile.followers {
        stats.push(format!("{followers} followers"));
    }
    if !stats.is_empty() {
        println!("{}     {}", "Stats:".cyan(), stats.join(", "));
    }
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_len).collect();
        format!("{cut}...")
    }
}

/// Machine-readable outcome shape.
pub fn json_value(outcome: &ProbeOutcome) -> Value {
    let profile = outcome.profile.as_ref();
    json!({
        "email": outcome.email.as_str(),
        "github_username": outcome.login,
        "display_name": profile.and_then(|p| p.name.clone()),
        "profile_url": profile.map(|p| p.html_url.clone()),
        "linked": outcome.linked(),
    })
}

/// Machine-readable outcome on stdout.
pub fn print_json(outcome: &ProbeOutcome) {
    println!("{:#}", json_value(outcome));
}
