use std::path::{Path, PathBuf};
use std::{env, fs};

use gears_core::GearSystem;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::store::Store;

const CONFIG_FILE: &str = "config.toml";

/// Default base directory for all gears storage.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".gears")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Resolve the project name.
///
/// 1. Explicit `--project` name
/// 2. CWD basename
/// 3. `"unnamed"`
fn resolve_project_name(project_name: Option<&str>) -> String {
    if let Some(name) = project_name {
        let sanitized = sanitize_name(name);
        if !sanitized.is_empty() {
            return sanitized;
        }
    }

    env::current_dir()
        .ok()
        .and_then(|cwd| cwd.file_name().map(|n| sanitize_name(&n.to_string_lossy())))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "unnamed".to_string())
}

/// Sanitize a project name for use as a filename.
fn sanitize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Names of every project database under `base`, sorted.
pub fn list_projects(base: &Path) -> Result<Vec<String>> {
    let dir = base.join("projects");
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "db"))
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    Ok(names)
}

/// One named project on disk plus the data-directory config.
///
/// Layout:
/// ```text
/// ~/.gears/
/// ├── config.toml
/// └── projects/
///     ├── <name>.db
///     └── ...
/// ```
pub struct ProjectStore {
    store: Store,
    name: String,
    config: StoreConfig,
}

impl ProjectStore {
    /// Open a project store, creating directories as needed.
    /// `project_name`: explicit project name (overrides the CWD basename).
    /// `base_dir`: override the base directory.
    pub fn open(project_name: Option<&str>, base_dir: Option<&Path>) -> Result<Self> {
        let base = base_dir.map(PathBuf::from).unwrap_or_else(default_base_dir);
        let projects_dir = base.join("projects");

        fs::create_dir_all(&projects_dir).map_err(|e| {
            StoreError::InvalidData(format!("failed to create {}: {e}", projects_dir.display()))
        })?;

        let config = match StoreConfig::load(&base.join(CONFIG_FILE)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{e}; using built-in defaults");
                StoreConfig::default()
            }
        };

        let name = resolve_project_name(project_name);
        let store = Store::open(&projects_dir.join(format!("{name}.db")))?;
        tracing::debug!(project = %name, base = %base.display(), "project store opened");

        Ok(Self {
            store,
            name,
            config,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            store: Store::open_in_memory()?,
            name: "test".to_string(),
            config: StoreConfig::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Load the project, or start an empty one with the configured defaults.
    pub fn load_system(&self) -> Result<GearSystem> {
        if self.store.has_project()? {
            self.store.load_system()
        } else {
            Ok(GearSystem::with_settings(self.config.project_settings()))
        }
    }

    pub fn save_system(&self, system: &mut GearSystem) -> Result<()> {
        self.store.save_system(system)?;
        system.mark_clean();
        Ok(())
    }

    pub fn import_json_file(&self, path: &Path) -> Result<GearSystem> {
        self.store.import_json_file(path)
    }

    pub fn export_json_file(&self, path: &Path) -> Result<()> {
        self.store.export_json_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gears_core::SpinDirection;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use tempfile::TempDir;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    #[test]
    fn test_directory_creation() {
        let dir = TempDir::new().unwrap();
        let ps = ProjectStore::open(Some("test-project"), Some(dir.path())).unwrap();
        assert_eq!(ps.name(), "test-project");
        assert!(dir.path().join("projects/test-project.db").exists());
    }

    #[test]
    fn test_project_isolation() {
        let dir = TempDir::new().unwrap();
        let mut rng = rng();

        let a = ProjectStore::open(Some("a"), Some(dir.path())).unwrap();
        let mut sys = a.load_system().unwrap();
        sys.create_gear(0.0, 0.0, 12, None, &mut rng);
        a.save_system(&mut sys).unwrap();
        assert!(!sys.has_unsaved_changes());

        let b = ProjectStore::open(Some("b"), Some(dir.path())).unwrap();
        assert!(b.load_system().unwrap().gears().is_empty());

        let a_again = ProjectStore::open(Some("a"), Some(dir.path())).unwrap();
        assert_eq!(a_again.load_system().unwrap().gears().len(), 1);

        assert_eq!(list_projects(dir.path()).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_config_defaults_for_new_project() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "[defaults]\nspin_direction = \"counter_clockwise\"\ngrid_size = 10.0\n",
        )
        .unwrap();

        let ps = ProjectStore::open(Some("cfg"), Some(dir.path())).unwrap();
        let sys = ps.load_system().unwrap();
        assert_eq!(sys.settings().spin_direction, SpinDirection::CounterClockwise);
        assert_eq!(sys.settings().grid_size, 10.0);
    }

    #[test]
    fn test_bad_config_falls_back() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "this is = = not toml").unwrap();
        let ps = ProjectStore::open(Some("p"), Some(dir.path())).unwrap();
        assert!(ps.config().defaults.grid_snap.is_none());
    }

    #[test]
    fn test_project_name_sanitization() {
        assert_eq!(sanitize_name("hello world"), "hello_world");
        assert_eq!(sanitize_name("my/project"), "my_project");
        assert_eq!(sanitize_name("valid-name_123"), "valid-name_123");
        assert_eq!(sanitize_name("  padded "), "padded");
    }

    #[test]
    fn test_empty_name_falls_back() {
        let name = resolve_project_name(Some("   "));
        assert!(!name.is_empty());
    }

    #[test]
    fn test_list_projects_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert!(list_projects(&dir.path().join("nope")).unwrap().is_empty());
    }
}
