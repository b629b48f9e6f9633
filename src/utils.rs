use dirs::config_dir;
use once_cell::sync::Lazy;
use std::{fs, path::PathBuf};
use tracing::warn;

static CONFIG_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    let base = config_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let root = base.join("festival-front");
    if let Err(err) = fs::create_dir_all(&root) {
        warn!("failed to create config root {:?}: {err}", root);
    }
    root
});

pub fn config_root() -> PathBuf {
    CONFIG_ROOT.clone()
}

pub fn config_path() -> PathBuf {
    std::env::var_os("FESTIVAL_FRONT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| config_root().join("config.json"))
}
