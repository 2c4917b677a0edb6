use std::path::PathBuf;

use crate::config::{load_config, save_config, shellexpand_path};
use crate::db::{get_connection, init_db};
use crate::error::Result;

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut config = load_config();
    if let Some(dir) = data_dir {
        config.data_dir = shellexpand_path(&dir);
    }
    save_config(&config)?;

    let resolved = PathBuf::from(&config.data_dir);
    std::fs::create_dir_all(&resolved)?;
    std::fs::create_dir_all(resolved.join("exports"))?;

    let conn = get_connection(&resolved.join("fern.db"))?;
    init_db(&conn)?;

    println!("Initialized fern at {}", resolved.display());
    println!(
        "Add your access tokens, certificate paths, and API key to the config, then run `fern sync`."
    );
    Ok(())
}
