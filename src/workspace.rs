//! Workspace state and file-system helpers
//!
//! The workspace is the directory tree the client operates on. Its root
//! can be switched at runtime; the last selected directory is persisted
//! wholesale to a small JSON state file so a restart resumes where the
//! client left off. All paths arriving over HTTP are resolved through
//! [`Workspace::resolve`], which refuses anything escaping the root.

use crate::error::{NotescribeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use walkdir::WalkDir;

/// Persisted workspace state, rewritten whole on every change
#[derive(Debug, Default, Serialize, Deserialize)]
struct WorkspaceState {
    last_directory: Option<PathBuf>,
}

/// One node of the workspace file tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileNode {
    /// File or directory name
    pub name: String,
    /// Path relative to the workspace root
    pub path: String,
    /// `"file"` or `"directory"`
    pub kind: String,
    /// Child nodes, present for directories only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileNode>>,
}

/// Guarded workspace root plus its persistence
pub struct Workspace {
    state_file: PathBuf,
    root: Mutex<Option<PathBuf>>,
}

impl Workspace {
    /// Creates the workspace from configuration, preferring the
    /// persisted last directory over the configured root
    pub fn new(config: &crate::config::WorkspaceConfig) -> Result<Self> {
        let persisted = Self::read_state(&config.state_file);
        let root = persisted
            .last_directory
            .filter(|p| p.is_dir())
            .or_else(|| config.root.clone().filter(|p| p.is_dir()));

        if let Some(root) = &root {
            tracing::info!("Workspace root: {}", root.display());
        } else {
            tracing::warn!("No workspace root configured yet");
        }

        Ok(Self {
            state_file: config.state_file.clone(),
            root: Mutex::new(root),
        })
    }

    fn read_state(state_file: &Path) -> WorkspaceState {
        match std::fs::read_to_string(state_file) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => WorkspaceState::default(),
        }
    }

    fn write_state(&self, root: &Path) -> Result<()> {
        if let Some(parent) = self.state_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let state = WorkspaceState {
            last_directory: Some(root.to_path_buf()),
        };
        std::fs::write(&self.state_file, serde_json::to_string_pretty(&state)?)?;
        Ok(())
    }

    /// Current workspace root
    ///
    /// # Errors
    ///
    /// Returns a workspace error when no root has been selected yet
    pub fn root(&self) -> Result<PathBuf> {
        self.root
            .lock()
            .expect("workspace mutex poisoned")
            .clone()
            .ok_or_else(|| {
                NotescribeError::Workspace("no workspace directory selected".to_string()).into()
            })
    }

    /// The persisted last directory, if any
    pub fn last_directory(&self) -> Option<PathBuf> {
        self.root.lock().expect("workspace mutex poisoned").clone()
    }

    /// Switches the workspace root and persists the change
    pub fn set_root(&self, path: &Path) -> Result<()> {
        if !path.is_dir() {
            return Err(NotescribeError::InvalidInput(format!(
                "not a directory: {}",
                path.display()
            ))
            .into());
        }
        let canonical = path.canonicalize()?;
        self.write_state(&canonical)?;
        *self.root.lock().expect("workspace mutex poisoned") = Some(canonical.clone());
        tracing::info!("Workspace root changed to {}", canonical.display());
        Ok(())
    }

    /// Resolves a client-supplied relative path inside the root
    ///
    /// Rejects absolute paths, any `..` sequence that would climb above
    /// the workspace root, and inputs that name the root itself (an
    /// empty path here would let a delete request remove the whole
    /// workspace). The target itself need not exist.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let root = self.root()?;
        let mut resolved = PathBuf::new();

        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !resolved.pop() {
                        return Err(
                            NotescribeError::PathOutsideWorkspace(relative.to_string()).into()
                        );
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(NotescribeError::InvalidInput(format!(
                        "path must be relative: {}",
                        relative
                    ))
                    .into());
                }
            }
        }

        if resolved.as_os_str().is_empty() {
            return Err(
                NotescribeError::InvalidInput(format!("path is empty: {:?}", relative)).into(),
            );
        }

        Ok(root.join(resolved))
    }

    /// Lists the workspace as a file tree, skipping hidden entries
    pub fn list_tree(&self) -> Result<Vec<FileNode>> {
        let root = self.root()?;
        build_tree(&root, &root)
    }

    /// Directory holding uploaded image assets, created on demand
    pub fn uploads_dir(&self) -> Result<PathBuf> {
        let dir = self.root()?.join(".notescribe").join("uploads");
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

/// Recursively list one directory level, sorted by file name
fn build_tree(root: &Path, dir: &Path) -> Result<Vec<FileNode>> {
    let mut nodes = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            NotescribeError::Workspace(format!("failed to list {}: {}", dir.display(), e))
        })?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .to_string();

        if entry.file_type().is_dir() {
            nodes.push(FileNode {
                name,
                path: relative,
                kind: "directory".to_string(),
                children: Some(build_tree(root, entry.path())?),
            });
        } else {
            nodes.push(FileNode {
                name,
                path: relative,
                kind: "file".to_string(),
                children: None,
            });
        }
    }

    Ok(nodes)
}
