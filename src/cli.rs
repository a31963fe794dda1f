//! Command-line surface

use clap::Parser;

/// Discover the GitHub account linked to an email address.
///
/// Creates a throwaway private repository, plants a commit authored with the
/// target email, and asks GitHub which account it attributes the commit to.
#[derive(Debug, Parser)]
#[command(name = "ghprobe", version, about, after_help = "Use ethically and responsibly.")]
pub struct Cli {
    /// Email address to probe
    pub email: String,

    /// Keep the temporary repository instead of deleting it
    #[arg(long)]
    pub keep: bool,

    /// Never open a browser during token setup
    #[arg(long)]
    pub no_browser: bool,

    /// Print the result as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Skip the startup banner
    #[arg(long)]
    pub no_banner: bool,
}
