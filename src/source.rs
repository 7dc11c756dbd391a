//! Module source tree discovery
//!
//! This module provides:
//! - Recursive, sorted discovery of the files under a module directory
//! - Loading of script sources (`.ps1` / `.psm1`) for directive scanning
//! - Exported function names taken from `public/` script file names
//! - Copying the tree into the build output

use crate::error::IoError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Script file extensions
const SCRIPT_EXTENSIONS: &[&str] = &["ps1", "psm1"];

/// Directory whose scripts define exported functions
const PUBLIC_DIR: &str = "public";

/// One file of the module source tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the source root
    pub relative: PathBuf,
    /// Absolute (or root-joined) path
    pub path: PathBuf,
}

impl SourceFile {
    fn extension(&self) -> Option<String> {
        self.relative
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// True for `.ps1` and `.psm1` files
    pub fn is_script(&self) -> bool {
        self.extension()
            .is_some_and(|e| SCRIPT_EXTENSIONS.contains(&e.as_str()))
    }

    /// True for `.ps1` files inside a `public` directory
    pub fn is_public_function(&self) -> bool {
        self.extension().as_deref() == Some("ps1")
            && self.relative.parent().is_some_and(|parent| {
                parent.components().any(|c| {
                    c.as_os_str()
                        .to_str()
                        .is_some_and(|s| s.eq_ignore_ascii_case(PUBLIC_DIR))
                })
            })
    }

    /// Relative path with `/` separators, as written to `FileList`
    pub fn manifest_path(&self) -> String {
        self.relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// The files of one module source directory
#[derive(Debug, Clone, Default)]
pub struct ModuleSources {
    pub root: PathBuf,
    /// All files, sorted by relative path
    pub files: Vec<SourceFile>,
}

impl ModuleSources {
    /// Drop a file from the tree (e.g. a hand-written manifest)
    pub fn remove(&mut self, relative: &Path) -> Option<SourceFile> {
        let index = self.files.iter().position(|f| f.relative == relative)?;
        Some(self.files.remove(index))
    }

    pub fn contains(&self, relative: &Path) -> bool {
        self.files.iter().any(|f| f.relative == relative)
    }

    /// Read every script file
    pub fn read_scripts(&self) -> Result<Vec<(PathBuf, String)>, IoError> {
        self.files
            .iter()
            .filter(|f| f.is_script())
            .map(|f| {
                fs::read_to_string(&f.path)
                    .map(|content| (f.relative.clone(), content))
                    .map_err(|e| IoError::generic(&f.path, e))
            })
            .collect()
    }

    /// Exported function names, sorted
    pub fn public_functions(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .files
            .iter()
            .filter(|f| f.is_public_function())
            .filter_map(|f| f.relative.file_stem().and_then(|s| s.to_str()))
            .map(str::to_string)
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// `.ps1` files that a generated root module dot-sources
    pub fn dot_sourced_scripts(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| f.extension().as_deref() == Some("ps1"))
            .map(SourceFile::manifest_path)
            .collect()
    }

    /// Copy every file below `destination`, keeping the layout
    pub fn copy_to(&self, destination: &Path) -> Result<Vec<String>, IoError> {
        let mut copied = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let target = destination.join(&file.relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| IoError::generic(parent, e))?;
            }
            fs::copy(&file.path, &target).map_err(|e| IoError::generic(&file.path, e))?;
            copied.push(file.manifest_path());
        }
        debug!(count = copied.len(), destination = %destination.display(), "copied sources");
        Ok(copied)
    }
}

/// Collect the files under `root`, skipping hidden entries
pub fn collect_sources(root: &Path) -> Result<ModuleSources, IoError> {
    if !root.is_dir() {
        return Err(IoError::directory_not_found(root));
    }

    let mut files = Vec::new();
    walk(root, root, &mut files)?;
    files.sort_by(|a, b| a.relative.cmp(&b.relative));

    Ok(ModuleSources {
        root: root.to_path_buf(),
        files,
    })
}

fn walk(root: &Path, dir: &Path, files: &mut Vec<SourceFile>) -> Result<(), IoError> {
    let entries = fs::read_dir(dir).map_err(|e| IoError::generic(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| IoError::generic(dir, e))?;
        let path = entry.path();
        let hidden = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'));
        if hidden {
            continue;
        }

        let file_type = entry.file_type().map_err(|e| IoError::generic(&path, e))?;
        if file_type.is_dir() {
            walk(root, &path, files)?;
        } else if file_type.is_file() {
            let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            files.push(SourceFile { relative, path });
        }
    }
    Ok(())
}

/// Root module that dot-sources every script and exports the public functions
pub fn root_module_script(scripts: &[String], functions: &[String]) -> String {
    let mut out = String::new();
    for script in scripts {
        out.push_str(&format!(". \"$PSScriptRoot/{}\"\n", script));
    }
    if !functions.is_empty() {
        out.push_str(&format!(
            "Export-ModuleMember -Function {}\n",
            functions
                .iter()
                .map(|f| crate::pwsh::quote_arg(f))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn sample_tree() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "Public/Get-Thing.ps1", "function Get-Thing {}");
        write(root, "Public/Set-Thing.ps1", "function Set-Thing {}");
        write(root, "Private/helper.ps1", "#Requires -Modules Pester");
        write(root, "en-US/about_Thing.help.txt", "help");
        write(root, ".git/config", "ignored");
        temp_dir
    }

    #[test]
    fn test_collect_sources_sorted_and_skips_hidden() {
        let temp_dir = sample_tree();
        let sources = collect_sources(temp_dir.path()).unwrap();
        let paths: Vec<String> = sources.files.iter().map(SourceFile::manifest_path).collect();
        assert_eq!(
            paths,
            vec![
                "Private/helper.ps1",
                "Public/Get-Thing.ps1",
                "Public/Set-Thing.ps1",
                "en-US/about_Thing.help.txt",
            ]
        );
    }

    #[test]
    fn test_public_functions() {
        let temp_dir = sample_tree();
        let sources = collect_sources(temp_dir.path()).unwrap();
        assert_eq!(sources.public_functions(), vec!["Get-Thing", "Set-Thing"]);
    }

    #[test]
    fn test_read_scripts_only_scripts() {
        let temp_dir = sample_tree();
        let sources = collect_sources(temp_dir.path()).unwrap();
        let scripts = sources.read_scripts().unwrap();
        assert_eq!(scripts.len(), 3);
        assert!(scripts.iter().any(|(_, c)| c.contains("#Requires")));
    }

    #[test]
    fn test_copy_to_keeps_layout() {
        let temp_dir = sample_tree();
        let out = TempDir::new().unwrap();
        let sources = collect_sources(temp_dir.path()).unwrap();

        let copied = sources.copy_to(out.path()).unwrap();
        assert_eq!(copied.len(), 4);
        assert!(out.path().join("Public/Get-Thing.ps1").exists());
        assert!(!out.path().join(".git").exists());
    }

    #[test]
    fn test_remove_file() {
        let temp_dir = sample_tree();
        let mut sources = collect_sources(temp_dir.path()).unwrap();
        let removed = sources.remove(Path::new("Private/helper.ps1"));
        assert!(removed.is_some());
        assert!(!sources.contains(Path::new("Private/helper.ps1")));
    }

    #[test]
    fn test_missing_directory() {
        let result = collect_sources(Path::new("/nonexistent/module"));
        assert!(matches!(result, Err(IoError::DirectoryNotFound { .. })));
    }

    #[test]
    fn test_root_module_script() {
        let script = root_module_script(
            &["Private/helper.ps1".to_string(), "Public/Get-Thing.ps1".to_string()],
            &["Get-Thing".to_string()],
        );
        assert_eq!(
            script,
            ". \"$PSScriptRoot/Private/helper.ps1\"\n\
             . \"$PSScriptRoot/Public/Get-Thing.ps1\"\n\
             Export-ModuleMember -Function 'Get-Thing'\n"
        );
    }
}
