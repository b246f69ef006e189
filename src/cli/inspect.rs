use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use dropsort::file::extension_of;
use dropsort::output::lane_label;
use dropsort::{status_print, Config, Lane};

#[derive(Debug, Serialize)]
struct RouteLine<'a> {
    name: &'a str,
    extension: &'a str,
    lane: Lane,
}

/// Print the lane for each name without touching the filesystem
pub fn route(names: &[String], json: bool) -> Result<()> {
    let lines: Vec<RouteLine> = names
        .iter()
        .map(|name| {
            let base = Path::new(name)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(name);
            RouteLine {
                name,
                extension: extension_of(base),
                lane: Lane::from_name(base),
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
        return Ok(());
    }

    for line in &lines {
        println!("{:>5}  {}", lane_label(line.lane), line.name);
    }
    Ok(())
}

pub fn show_config(config: &Config, json: bool, save: Option<&Path>) -> Result<()> {
    if let Some(path) = save {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        config.save(path)?;
        status_print!("Wrote {}", path.display());
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}
