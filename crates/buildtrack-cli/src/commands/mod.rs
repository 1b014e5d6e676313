//! CLI command implementations.

pub mod builds;
pub mod watch;

use anyhow::Result;
use buildtrack_config::parse_system_config;
use buildtrack_core::config::{CiTarget, WebhookAuth};

pub fn validate(path: &str) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    match parse_system_config(&content) {
        Ok(config) => {
            println!("Configuration is valid");
            println!("  listen:  {}", config.listen);
            println!("  store:   {:?}", config.store);
            match &config.ci {
                CiTarget::Configured(github) => {
                    println!("  ci:      github {} ({})", github.full_name(), github.event_type)
                }
                CiTarget::Unconfigured => println!("  ci:      unconfigured"),
            }
            match &config.webhook {
                WebhookAuth::SharedSecret(_) => println!("  webhook: shared secret"),
                WebhookAuth::Open => println!("  webhook: open"),
            }
            Ok(())
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}
