// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::{Parser, Subcommand};
use kvlock::commands::acquire::{AcquireCommand, AcquireMode};
use kvlock::commands::reentrant::ReentrantCommand;
use kvlock::commands::release::ReleaseCommand;
use kvlock::commands::status::StatusCommand;
use kvlock::commands::sweep::SweepCommand;
use kvlock::config::new_kvlock_config;
use kvlock::error::{EXIT_LOCK_BUSY, Result, format_error_chain, get_exit_code};
use kvlock::logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kvlock")]
#[command(author, version, about = "Distributed locks over a shared store", long_about = None)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Store directory (overrides [store] dir in config.toml)
    #[arg(long, value_name = "DIR", global = true)]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire an exclusive lock and print its token
    #[command(visible_alias = "a")]
    Acquire {
        key: String,

        /// Holder token (a random UUID when omitted)
        #[arg(long)]
        token: Option<String>,

        /// Lease in seconds, clamped to 1..=10
        #[arg(long, value_name = "SECONDS")]
        ttl: Option<u64>,

        /// Retry up to N attempts before giving up
        #[arg(long, value_name = "N", conflicts_with = "wait")]
        retry_times: Option<u32>,

        /// Sleep between retries in milliseconds
        #[arg(long, value_name = "MS", conflicts_with = "wait")]
        retry_sleep_ms: Option<u64>,

        /// Wait until the lock is free (Ctrl-C to cancel)
        #[arg(short, long)]
        wait: bool,
    },

    /// Release an exclusive lock held by TOKEN
    Release {
        key: String,

        #[arg(long)]
        token: String,
    },

    /// Release a lock regardless of holder
    ForceRelease {
        key: String,

        /// Only release when held by this token
        #[arg(long)]
        token: Option<String>,
    },

    /// Take one hold of a reentrant lock and print the hold count
    Enter {
        key: String,

        #[arg(long)]
        owner: String,

        /// Maximum simultaneous holds (-1 for unlimited)
        #[arg(long, allow_hyphen_values = true)]
        max_count: Option<i64>,

        /// Lease in seconds, clamped to 3..=10
        #[arg(long, value_name = "SECONDS")]
        ttl: Option<u64>,
    },

    /// Drop one hold of a reentrant lock and print the remaining count
    Exit {
        key: String,

        #[arg(long)]
        owner: String,
    },

    /// Show who holds a lock
    #[command(visible_alias = "s")]
    Status {
        key: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Delete expired records and stale staging files from the store
    Sweep,
}

fn setup_logger(cli: &Cli) {
    logging::setup_logger(cli.verbose);
}

fn main() {
    let cli = Cli::parse();

    setup_logger(&cli);

    let mut config = match new_kvlock_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_error_chain(&e));
            std::process::exit(get_exit_code(&e));
        }
    };
    if let Some(dir) = cli.store_dir {
        config.store.dir = Some(dir);
    }

    // Ok(false) means the lock stayed busy.
    let result: Result<bool> = (|| match cli.command {
        Commands::Acquire {
            key,
            token,
            ttl,
            retry_times,
            retry_sleep_ms,
            wait,
        } => {
            let mode = if wait {
                AcquireMode::Wait
            } else if retry_times.is_some() || retry_sleep_ms.is_some() {
                AcquireMode::Retry {
                    times: retry_times,
                    sleep_ms: retry_sleep_ms,
                }
            } else {
                AcquireMode::Once
            };
            let command = AcquireCommand::new(&config)?;
            command.execute(&key, token.as_deref(), ttl, mode)
        }
        Commands::Release { key, token } => {
            let command = ReleaseCommand::new(&config)?;
            command.execute(&key, &token).map(|_| true)
        }
        Commands::ForceRelease { key, token } => {
            let command = ReleaseCommand::new(&config)?;
            command.execute_force(&key, token.as_deref()).map(|_| true)
        }
        Commands::Enter {
            key,
            owner,
            max_count,
            ttl,
        } => {
            let command = ReentrantCommand::new(&config)?;
            command.enter(&key, &owner, max_count, ttl)
        }
        Commands::Exit { key, owner } => {
            let command = ReentrantCommand::new(&config)?;
            command.exit(&key, &owner).map(|_| true)
        }
        Commands::Status { key, json } => {
            let command = StatusCommand::new(&config)?;
            command.execute(&key, json).map(|_| true)
        }
        Commands::Sweep => {
            let command = SweepCommand::new(&config)?;
            command.execute().map(|_| true)
        }
    })();

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(EXIT_LOCK_BUSY),
        Err(e) => {
            eprintln!("{}", format_error_chain(&e));
            std::process::exit(get_exit_code(&e));
        }
    }
}
