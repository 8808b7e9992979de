//! 命令行模块
//! `-h` 被节点地址占用，所以帮助只提供 `--help`

use crate::config::*;
use clap::{ArgAction, Parser};
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "lset_harness",
    about = "Insert a seeded value sequence into a Large Set bin, then search for every value",
    disable_help_flag = true
)]
pub struct Cli {
    /// Node host
    #[arg(short = 'h', long, default_value = DEFAULT_HOST)]
    pub host: String,
    /// Node port
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Namespace
    #[arg(short = 'n', long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,
    /// Set name
    #[arg(short = 's', long, default_value = DEFAULT_SET)]
    pub set: String,
    /// Verbose (debug level) logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
    /// Stored-procedure package name
    #[arg(short = 'P', long, default_value = DEFAULT_PACKAGE)]
    pub package: String,
    /// Per-call timeout in milliseconds
    #[arg(short = 't', long = "timeout-ms", default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,
    /// Record lifetime in seconds (0 = never expire)
    #[arg(short = 'r', long = "record-ttl", default_value_t = DEFAULT_RECORD_TTL_SECS)]
    pub record_ttl_secs: u64,
    /// Operations per phase
    #[arg(short = 'i', long, default_value_t = DEFAULT_ITERATIONS)]
    pub iterations: usize,
    /// Record key
    #[arg(short = 'k', long, default_value = DEFAULT_RECORD_KEY)]
    pub key: String,
    /// Bin holding the Large Set
    #[arg(short = 'b', long, default_value = DEFAULT_BIN)]
    pub bin: String,
    /// Seed shared by the insert and search phases
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,
    /// Capacity hint forwarded to LSET create
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    pub capacity: u32,
    /// What to do when an insert fails
    #[arg(long, value_enum, default_value_t = FailurePolicy::Abort)]
    pub insert_policy: FailurePolicy,
    /// What to do when a search fails
    #[arg(long, value_enum, default_value_t = FailurePolicy::Continue)]
    pub search_policy: FailurePolicy,
    /// Run against the in-process store instead of a node
    #[arg(short = 'm', long)]
    pub memory: bool,
    /// Print help
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

impl Cli {
    pub fn into_config(self) -> HarnessConfig {
        HarnessConfig {
            host: self.host,
            port: self.port,
            namespace: self.namespace,
            set: self.set,
            timeout: Duration::from_millis(self.timeout_ms),
            record_ttl: Duration::from_secs(self.record_ttl_secs),
            verbose: self.verbose,
            package: self.package,
            key: self.key,
            bin: self.bin,
            iterations: self.iterations,
            seed: self.seed,
            capacity: self.capacity,
            insert_policy: self.insert_policy,
            search_policy: self.search_policy,
        }
    }
}
