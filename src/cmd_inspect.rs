//! `events` and `check-config` subcommand handlers.

use std::path::Path;

use tracing::{info, warn};

use cogbridge_config::{ConfigLoader, ConfigValidator};
use cogbridge_protocols::EventCategory;

/// List event names, optionally restricted to one family.
pub(crate) fn handle_events(family: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let families: Vec<EventCategory> = match family {
        Some(name) => {
            let found = EventCategory::ALL
                .iter()
                .copied()
                .find(|c| c.as_str() == name)
                .ok_or_else(|| format!("unknown event family '{}'", name))?;
            vec![found]
        }
        None => EventCategory::ALL.to_vec(),
    };

    println!("{:<12} {}", "FAMILY", "EVENT");
    println!("{}", "-".repeat(48));
    for category in families {
        for event in category.events() {
            println!("{:<12} {}", category.as_str(), event.as_str());
        }
    }
    Ok(())
}

/// Load and validate a configuration file.
pub(crate) fn handle_check_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load(path)?;
    let result = ConfigValidator::validate(&config);

    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }
    for warning in &result.warnings {
        warn!(path = %warning.path, "{}", warning.message);
        println!("warning: {}: {}", warning.path, warning.message);
    }

    let warnings = result.into_result()?;
    info!(path = %path.display(), warnings = warnings.len(), "Configuration valid");
    println!("{}: ok", path.display());
    Ok(())
}
