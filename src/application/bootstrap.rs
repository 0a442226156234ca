use crate::infrastructure::config::{AppConfig, ensure_default_configs, load_app_config};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::state_repository::initialize_database;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct BootstrapResult {
    pub workspace_root: PathBuf,
    pub database_path: PathBuf,
    pub config: AppConfig,
}

pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    let config_dir = workspace_root.join("config");
    let state_dir = workspace_root.join("state");
    let logs_dir = workspace_root.join("logs");
    let database_path = state_dir.join("takwim.sqlite");

    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(&state_dir)?;
    fs::create_dir_all(&logs_dir)?;

    ensure_default_configs(&config_dir)?;
    let config = load_app_config(&config_dir)?;
    initialize_database(&database_path)?;
    tracing::debug!(root = %workspace_root.display(), "workspace ready");

    Ok(BootstrapResult {
        workspace_root: workspace_root.to_path_buf(),
        database_path,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_creates_layout_and_is_repeatable() {
        let root = std::env::temp_dir().join(format!("takwim-bootstrap-tests-{}", std::process::id()));
        fs::create_dir_all(&root).expect("create root");

        let first = bootstrap_workspace(&root).expect("first bootstrap");
        assert!(root.join("config").join("app.json").is_file());
        assert!(root.join("logs").is_dir());
        assert!(first.database_path.is_file());
        assert_eq!(first.config, AppConfig::default());

        let second = bootstrap_workspace(&root).expect("second bootstrap");
        assert_eq!(second.database_path, first.database_path);

        let _ = fs::remove_dir_all(&root);
    }
}
