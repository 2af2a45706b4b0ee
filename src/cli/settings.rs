//! `chatlens config ...` handlers.

use std::error::Error;
use std::path::Path;

use crate::core::config::data::path_display;
use crate::core::config::Config;

/// Effective configuration as TOML, defaults filled in.
pub fn render_config(config: &Config) -> Result<String, toml::ser::Error> {
    let mut effective = config.clone();
    effective.api_base_url = Some(config.api_base_url().to_string());
    effective.timeout_secs = Some(config.timeout().as_secs());
    effective.poll_interval_secs = Some(config.poll_interval().as_secs());
    toml::to_string_pretty(&effective)
}

pub fn show(config: &Config, path: &Path) -> Result<(), Box<dyn Error>> {
    println!("# {}", path_display(path));
    print!("{}", render_config(config)?);
    if config.analysis_url.is_none() {
        println!("# analysis_url is not set; `words` is unavailable");
    }
    Ok(())
}

pub fn set(path: &Path, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load_from_path(path)?;
    config.set_value(key, value)?;
    config.save_to_path(path)?;
    println!("Set {key} = {}", value.trim());
    Ok(())
}

pub fn unset(path: &Path, key: &str) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load_from_path(path)?;
    config.unset_value(key)?;
    config.save_to_path(path)?;
    println!("Unset {key}");
    Ok(())
}
