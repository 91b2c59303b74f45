//! CLI argument parsing for slurmview.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "slurmview")]
#[command(about = "Monitor a remote SLURM cluster over SSH")]
pub struct Args {
    /// Cluster login node hostname
    #[arg(long)]
    pub host: String,

    /// Remote username whose jobs and fair-share are monitored
    #[arg(long)]
    pub user: String,

    /// Snapshot poll interval in seconds
    #[arg(long, default_value = "30")]
    pub poll_interval: u64,
}
