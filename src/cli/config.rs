// src/cli/config.rs
use super::CliError;
use devicebatch::settings::{io, AppSettings};

pub fn run(settings: &AppSettings, save: bool) -> Result<(), CliError> {
    match io::get_config_path() {
        Ok(path) => println!("Settings file: {}", path.display()),
        Err(e) => println!("Settings file: unavailable ({})", e),
    }
    let rendered = serde_json::to_string_pretty(settings)
        .map_err(|e| CliError::Usage(format!("Could not render settings: {}", e)))?;
    println!("{}", rendered);

    if save {
        let path = io::save_settings_to_file(settings)?;
        println!("Saved to {}", path.display());
    }
    Ok(())
}
