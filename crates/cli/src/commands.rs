//! Subcommand definitions and execution.

use crate::engine::Engine;
use clap::Subcommand;
use std::path::PathBuf;
use std::time::Duration;
use txgate_core::{Error, Identity};

/// Exit code for authorization denials.
const EXIT_DENIED: i32 = 77;
/// Exit code for unknown transaction codes.
const EXIT_NOT_FOUND: i32 = 66;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full dispatch pipeline for one transaction code.
    ///
    /// The stock binary has no business handlers registered, so a fully
    /// authorized request terminates at handler loading; the command is a
    /// routing/authorization preflight against a live data directory.
    Dispatch {
        /// Transaction code to dispatch
        #[arg(long)]
        code: u32,
        /// Profile id issuing the request
        #[arg(long)]
        profile: u32,
        /// Request params as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,
        /// Deadline in milliseconds (overrides the configured default)
        #[arg(long)]
        deadline_ms: Option<u64>,
    },
    /// Grant a (resource, action) pair to a profile
    Grant {
        #[arg(long)]
        profile: u32,
        #[arg(long)]
        resource: String,
        #[arg(long)]
        action: String,
    },
    /// Revoke a (resource, action) pair from a profile
    Revoke {
        #[arg(long)]
        profile: u32,
        #[arg(long)]
        resource: String,
        #[arg(long)]
        action: String,
    },
    /// Check whether a profile may invoke (resource, action)
    Check {
        #[arg(long)]
        profile: u32,
        #[arg(long)]
        resource: String,
        #[arg(long)]
        action: String,
    },
    /// List the loaded route table
    Routes,
}

impl Commands {
    pub async fn execute(self, config_file: Option<PathBuf>) -> eyre::Result<i32> {
        let engine = Engine::bring_up(config_file).await?;

        match self {
            Commands::Dispatch {
                code,
                profile,
                params,
                deadline_ms,
            } => {
                let params: serde_json::Value = serde_json::from_str(&params)
                    .map_err(|e| eyre::eyre!("--params is not valid JSON: {e}"))?;
                let identity = Identity::with_generated_request_id(profile);
                let deadline = deadline_ms
                    .map(Duration::from_millis)
                    .or_else(|| engine.config.dispatch_deadline());

                match engine
                    .dispatcher
                    .execute_with_deadline(code, &identity, params, deadline)
                    .await
                {
                    Ok(result) => {
                        println!("{}", serde_json::to_string_pretty(&result)?);
                        Ok(0)
                    }
                    Err(err) => {
                        // Only the client-safe form is printed; detail is in
                        // the logs and the audit record.
                        eprintln!("{}", err.client_message());
                        Ok(match err {
                            Error::Denied { .. } => EXIT_DENIED,
                            Error::RouteNotFound { .. } => EXIT_NOT_FOUND,
                            _ => 1,
                        })
                    }
                }
            }
            Commands::Grant {
                profile,
                resource,
                action,
            } => {
                if engine.permissions.grant(profile, &resource, &action).await? {
                    println!("granted {profile} -> {resource}.{action}");
                    Ok(0)
                } else {
                    eprintln!("refused: ({resource}, {action}) is not a registered action");
                    Ok(1)
                }
            }
            Commands::Revoke {
                profile,
                resource,
                action,
            } => {
                if engine.permissions.revoke(profile, &resource, &action).await? {
                    println!("revoked {profile} -> {resource}.{action}");
                    Ok(0)
                } else {
                    println!("no permission row matched");
                    Ok(0)
                }
            }
            Commands::Check {
                profile,
                resource,
                action,
            } => {
                if engine.permissions.check(profile, &resource, &action) {
                    println!("allowed");
                    Ok(0)
                } else {
                    println!("denied");
                    Ok(EXIT_DENIED)
                }
            }
            Commands::Routes => {
                for (code, route) in engine.routes.snapshot() {
                    println!("{code}\t{route}");
                }
                Ok(0)
            }
        }
    }
}
