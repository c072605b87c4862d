//! Per-user state directory.
//!
//! The CLI keeps its config file and rolling logs under one directory,
//! `~/.ingestor` unless `INGESTOR_HOME` points elsewhere. Nothing here
//! creates directories; whoever writes into them does.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Overrides the state directory.
pub const HOME_ENV: &str = "INGESTOR_HOME";

const HOME_DIR_NAME: &str = ".ingestor";

/// `$INGESTOR_HOME`, else `.ingestor` under the user's home, else under the
/// working directory.
pub fn ingestor_home() -> PathBuf {
    let user_home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from);
    resolve_home(std::env::var_os(HOME_ENV), user_home)
}

fn resolve_home(override_dir: Option<OsString>, user_home: Option<PathBuf>) -> PathBuf {
    match (override_dir.filter(|dir| !dir.is_empty()), user_home) {
        (Some(dir), _) => PathBuf::from(dir),
        (None, Some(home)) => home.join(HOME_DIR_NAME),
        (None, None) => Path::new(".").join(HOME_DIR_NAME),
    }
}

/// Config read when `--config` is not given.
pub fn default_config_path() -> PathBuf {
    ingestor_home().join("config.toml")
}

pub fn default_logs_dir() -> PathBuf {
    ingestor_home().join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        let home = resolve_home(Some("/srv/ingest".into()), Some(PathBuf::from("/home/u")));
        assert_eq!(home, PathBuf::from("/srv/ingest"));
    }

    #[test]
    fn test_blank_override_falls_back_to_user_home() {
        let home = resolve_home(Some(OsString::new()), Some(PathBuf::from("/home/u")));
        assert_eq!(home, PathBuf::from("/home/u/.ingestor"));
    }

    #[test]
    fn test_no_home_uses_working_directory() {
        assert_eq!(resolve_home(None, None), PathBuf::from("./.ingestor"));
    }
}
