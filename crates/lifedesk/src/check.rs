// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lifedesk check` command implementation.

use colored::Colorize;
use lifedesk_config::LifedeskConfig;
use lifedesk_core::{HealthStatus, LifedeskError, Mode, PluginAdapter};
use lifedesk_engines::HttpEngine;

/// Prints the effective configuration and the health of the engine and usage backends.
pub async fn run_check(config: &LifedeskConfig) -> Result<(), LifedeskError> {
    println!("{} configuration is valid", "ok".green().bold());
    println!(
        "  quota: search={} secondary={}",
        config.quota.search_limit, config.quota.secondary_limit
    );
    println!(
        "  permissions: search={} secondary={}",
        config.permissions.search, config.permissions.secondary
    );
    for mode in Mode::ALL {
        let endpoint = config
            .engines
            .for_mode(mode)
            .endpoint
            .as_deref()
            .unwrap_or("(not configured)");
        println!("  engine {mode}: {endpoint}");
    }

    let engine = HttpEngine::from_config(&config.engines)?;
    print_health(engine.name(), engine.health_check().await?);

    let usage = lifedesk_engines::usage_service_from_config(config)?;
    print_health(usage.name(), usage.health_check().await?);
    Ok(())
}

fn print_health(name: &str, status: HealthStatus) {
    match status {
        HealthStatus::Healthy => println!("{} {name}", "healthy".green()),
        HealthStatus::Degraded(reason) => println!("{} {name}: {reason}", "degraded".yellow()),
        HealthStatus::Unhealthy(reason) => println!("{} {name}: {reason}", "unhealthy".red()),
    }
}
