use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Build the launch environment for the replacement server.
///
/// Copies the inherited environment, layers the configured extra
/// variables on top, then appends `dir` to `search_path_var` while
/// preserving any pre-existing value. The map is constructed once and
/// passed directly to the spawn call; the calling process's own
/// environment is never mutated.
pub fn build_launch_env<I>(
    inherited: I,
    extra: &HashMap<String, String>,
    search_path_var: &str,
    dir: &Path,
) -> Result<HashMap<String, String>>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut env: HashMap<String, String> = inherited.into_iter().collect();
    for (key, value) in extra {
        env.insert(key.clone(), value.clone());
    }

    let search_path = augment_search_path(env.get(search_path_var).map(String::as_str), dir)?;
    env.insert(search_path_var.to_string(), search_path);

    Ok(env)
}

/// Append `dir` to a path-list value, keeping the existing entries intact.
///
/// The directory is not appended twice if it is already on the list.
pub fn augment_search_path(existing: Option<&str>, dir: &Path) -> Result<String> {
    let mut parts: Vec<PathBuf> = match existing {
        Some(value) if !value.is_empty() => env::split_paths(value).collect(),
        _ => Vec::new(),
    };

    if !parts.iter().any(|p| p == dir) {
        parts.push(dir.to_path_buf());
    }

    let joined = env::join_paths(parts).context("search path entry contains a separator")?;
    joined
        .into_string()
        .map_err(|_| anyhow::anyhow!("search path is not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_existing_value() {
        let result = augment_search_path(Some("/a"), Path::new("/b")).unwrap();
        assert_eq!(result, "/a:/b");
    }

    #[test]
    fn test_absent_value_becomes_the_directory() {
        let result = augment_search_path(None, Path::new("/b")).unwrap();
        assert_eq!(result, "/b");

        let result = augment_search_path(Some(""), Path::new("/b")).unwrap();
        assert_eq!(result, "/b");
    }

    #[test]
    fn test_directory_is_not_duplicated() {
        let result = augment_search_path(Some("/a:/b"), Path::new("/b")).unwrap();
        assert_eq!(result, "/a:/b");
    }

    #[test]
    fn test_build_launch_env_layers_and_augments() {
        let inherited = vec![
            ("PATH".to_string(), "/usr/bin".to_string()),
            ("PYTHONPATH".to_string(), "/opt/lib".to_string()),
            ("LANG".to_string(), "C".to_string()),
        ];
        let mut extra = HashMap::new();
        extra.insert("APP_ENV".to_string(), "dev".to_string());
        extra.insert("LANG".to_string(), "en_US.UTF-8".to_string());

        let env =
            build_launch_env(inherited, &extra, "PYTHONPATH", Path::new("/srv/app")).unwrap();

        assert_eq!(env.get("PATH"), Some(&"/usr/bin".to_string()));
        assert_eq!(env.get("APP_ENV"), Some(&"dev".to_string()));
        // extras win over inherited values
        assert_eq!(env.get("LANG"), Some(&"en_US.UTF-8".to_string()));
        assert_eq!(env.get("PYTHONPATH"), Some(&"/opt/lib:/srv/app".to_string()));
    }

    #[test]
    fn test_build_launch_env_sets_var_when_missing() {
        let env = build_launch_env(
            Vec::new(),
            &HashMap::new(),
            "PYTHONPATH",
            Path::new("/srv/app"),
        )
        .unwrap();
        assert_eq!(env.get("PYTHONPATH"), Some(&"/srv/app".to_string()));
    }
}
