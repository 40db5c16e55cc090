use std::path::PathBuf;
use std::sync::OnceLock;

static CLADETIME_HOME: OnceLock<PathBuf> = OnceLock::new();
static CLADETIME_CACHE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Get the Cladetime home directory
/// Checks CLADETIME_HOME environment variable, falls back to ${HOME}/cladetime
pub fn cladetime_home() -> PathBuf {
    CLADETIME_HOME
        .get_or_init(|| {
            if let Ok(path) = std::env::var("CLADETIME_HOME") {
                PathBuf::from(path)
            } else {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("cladetime")
            }
        })
        .clone()
}

/// Get the cache directory for staged sequence metadata
/// Checks CLADETIME_CACHE_DIR environment variable, falls back to CLADETIME_HOME/cache
pub fn cladetime_cache_dir() -> PathBuf {
    CLADETIME_CACHE_DIR
        .get_or_init(|| {
            if let Ok(path) = std::env::var("CLADETIME_CACHE_DIR") {
                PathBuf::from(path)
            } else {
                cladetime_home().join("cache")
            }
        })
        .clone()
}

/// Where classifier output lands when the caller does not pick a path
pub fn default_assignment_output() -> PathBuf {
    cladetime_home().join("clade_assignments.tsv")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_nest_under_home() {
        let home = cladetime_home();
        assert!(default_assignment_output().starts_with(&home));
        assert_eq!(
            default_assignment_output().file_name().and_then(|n| n.to_str()),
            Some("clade_assignments.tsv")
        );
        if std::env::var("CLADETIME_CACHE_DIR").is_err() {
            assert!(cladetime_cache_dir().starts_with(&home));
        }
    }
}
