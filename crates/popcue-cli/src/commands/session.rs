use std::path::Path;

use popcue_core::storage::{clear_session, load_snapshot};
use popcue_core::{Config, SessionKeys};

use super::open_store;

pub fn status(db: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(db)?;
    let config = Config::load_or_default();
    let keys = SessionKeys::new(config.storage.key_prefix.clone());
    match load_snapshot(&store, &keys, config.urgency.countdown_secs)? {
        Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        None => println!("no stored session"),
    }
    Ok(())
}

pub fn clear(db: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store(db)?;
    let config = Config::load_or_default();
    let keys = SessionKeys::new(config.storage.key_prefix);
    clear_session(&mut store, &keys)?;
    println!("session cleared");
    Ok(())
}
