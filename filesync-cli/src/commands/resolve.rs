//! `filesync resolve` — print the destination set without syncing.

use anyhow::{Context, Result};
use clap::Args;

use filesync_core::{DestinationInputs, HostSettings, RawConfig};
use filesync_host::GitHubHost;
use filesync_sync::resolve_destinations;

use super::{DestinationArgs, HostArgs};

/// Arguments for `filesync resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub destinations: DestinationArgs,

    #[command(flatten)]
    pub host: HostArgs,

    /// Emit a JSON array instead of one repository per line.
    #[arg(long)]
    pub json: bool,
}

impl ResolveArgs {
    pub fn run(self) -> Result<()> {
        let json = self.json;
        let mut raw = RawConfig::default();
        self.destinations.apply(&mut raw);
        self.host.apply(&mut raw);

        let inputs = DestinationInputs::from_raw(&raw).context("invalid destination options")?;
        let settings = HostSettings::from_raw(&raw).context("invalid host options")?;

        // Without patterns the resolver makes no host calls.
        let host = GitHubHost::from_settings(&settings);
        let repos =
            resolve_destinations(&host, &inputs).context("destination resolution failed")?;

        if json {
            let names: Vec<&str> = repos.iter().map(|repo| repo.as_str()).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&names).context("failed to serialize repositories")?
            );
        } else {
            for repo in &repos {
                println!("{repo}");
            }
        }
        Ok(())
    }
}
