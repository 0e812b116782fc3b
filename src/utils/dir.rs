use std::{
    env, io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

const APPLICATION_NAME: &str = "dayrecap";

pub fn home_dir() -> Result<PathBuf> {
    #[cfg(windows)]
    let home = env::var("USERPROFILE");
    #[cfg(not(windows))]
    let home = env::var("HOME");
    home.map(PathBuf::from)
        .context("Couldn't find the home directory")
}

/// Replaces a leading `~` with the home directory.
pub fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Directory for logs. Tries $XDG_STATE_HOME, then $HOME/.local/state.
pub fn create_application_default_path() -> Result<PathBuf> {
    let path = {
        #[cfg(windows)]
        {
            let mut path = PathBuf::from(env::var("APPDATA").context("APPDATA should be present on Windows")?);
            path.push(APPLICATION_NAME);
            path
        }
        #[cfg(not(windows))]
        {
            let mut path = env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .or_else(|_| home_dir().map(|home| home.join(".local/state")))?;
            path.push(APPLICATION_NAME);
            path
        }
    };

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

/// Location of `config.toml` when none is passed on the command line.
pub fn default_config_path() -> Result<PathBuf> {
    let base = match env::var("XDG_CONFIG_HOME") {
        Ok(v) => PathBuf::from(v),
        Err(_) => home_dir()?.join(".config"),
    };
    Ok(base.join(APPLICATION_NAME).join("config.toml"))
}
