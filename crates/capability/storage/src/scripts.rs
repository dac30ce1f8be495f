//! 迁移脚本来源
//!
//! 目录布局：
//! - `idempotent/<序号>-<描述>.sql`：可重复执行的建表脚本
//! - `versions/<semver>/<序号>-<描述>.sql`：版本升级脚本
//!
//! 文件按序号数值排序；不符合命名规则的文件或目录被静默跳过。

use crate::error::StorageError;
use include_dir::{Dir, include_dir};
use semver::Version;
use std::path::{Path, PathBuf};

pub const IDEMPOTENT_DIR: &str = "idempotent";
pub const VERSIONS_DIR: &str = "versions";

static EMBEDDED_SQL: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/sql");

/// 一个待执行的 SQL 脚本。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub ordinal: u64,
    pub name: String,
    pub sql: String,
}

/// 一个版本目录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDir {
    pub version: Version,
    pub name: String,
}

/// 迁移脚本来源。
pub trait ScriptSource: Send + Sync {
    /// 幂等脚本（已按序号排序）。
    fn idempotent_scripts(&self) -> Result<Vec<Script>, StorageError>;

    /// 版本目录（已按语义化版本升序排序）。
    fn versions(&self) -> Result<Vec<VersionDir>, StorageError>;

    /// 指定版本目录下的脚本（已按序号排序）。
    fn version_scripts(&self, version: &VersionDir) -> Result<Vec<Script>, StorageError>;
}

/// 解析 `<序号>-<描述>.sql` 中的序号。
pub fn script_ordinal(file_name: &str) -> Option<u64> {
    let stem = file_name.strip_suffix(".sql")?;
    let (ordinal, description) = stem.split_once('-')?;
    if description.is_empty() || ordinal.is_empty() {
        return None;
    }
    if !ordinal.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    ordinal.parse().ok()
}

/// 过滤并排序脚本；序号相同时按文件名排序。
pub fn collect_scripts(files: impl IntoIterator<Item = (String, String)>) -> Vec<Script> {
    let mut scripts: Vec<Script> = files
        .into_iter()
        .filter_map(|(name, sql)| {
            script_ordinal(&name).map(|ordinal| Script { ordinal, name, sql })
        })
        .collect();
    scripts.sort_by(|a, b| a.ordinal.cmp(&b.ordinal).then_with(|| a.name.cmp(&b.name)));
    scripts
}

/// 过滤并排序版本目录名。
pub fn collect_versions(names: impl IntoIterator<Item = String>) -> Vec<VersionDir> {
    let mut versions: Vec<VersionDir> = names
        .into_iter()
        .filter_map(|name| {
            Version::parse(&name)
                .ok()
                .map(|version| VersionDir { version, name })
        })
        .collect();
    versions.sort_by(|a, b| a.version.cmp(&b.version));
    versions
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

/// 编译进二进制的脚本。
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedScripts {
    root: &'static Dir<'static>,
}

impl Default for EmbeddedScripts {
    fn default() -> Self {
        Self {
            root: &EMBEDDED_SQL,
        }
    }
}

impl EmbeddedScripts {
    pub fn new() -> Self {
        Self::default()
    }

    fn scripts_in(&self, path: &str) -> Result<Vec<Script>, StorageError> {
        let Some(dir) = self.root.get_dir(path) else {
            return Ok(Vec::new());
        };
        let mut files = Vec::new();
        for file in dir.files() {
            let Some(name) = file_name(file.path()) else {
                continue;
            };
            let sql = file.contents_utf8().ok_or_else(|| {
                StorageError::server(format!("script {name} is not valid UTF-8"))
            })?;
            files.push((name, sql.to_string()));
        }
        Ok(collect_scripts(files))
    }
}

impl ScriptSource for EmbeddedScripts {
    fn idempotent_scripts(&self) -> Result<Vec<Script>, StorageError> {
        self.scripts_in(IDEMPOTENT_DIR)
    }

    fn versions(&self) -> Result<Vec<VersionDir>, StorageError> {
        let Some(dir) = self.root.get_dir(VERSIONS_DIR) else {
            return Ok(Vec::new());
        };
        Ok(collect_versions(
            dir.dirs().filter_map(|child| file_name(child.path())),
        ))
    }

    fn version_scripts(&self, version: &VersionDir) -> Result<Vec<Script>, StorageError> {
        self.scripts_in(&format!("{VERSIONS_DIR}/{}", version.name))
    }
}

/// 文件系统目录中的脚本。
#[derive(Debug, Clone)]
pub struct FsScripts {
    root: PathBuf,
}

impl FsScripts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scripts_in(&self, dir: &Path) -> Result<Vec<Script>, StorageError> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(|err| io_error(dir, err))? {
            let path = entry.map_err(|err| io_error(dir, err))?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = file_name(&path) else {
                continue;
            };
            if script_ordinal(&name).is_none() {
                continue;
            }
            let sql = std::fs::read_to_string(&path).map_err(|err| io_error(&path, err))?;
            files.push((name, sql));
        }
        Ok(collect_scripts(files))
    }
}

fn io_error(path: &Path, err: std::io::Error) -> StorageError {
    StorageError::server(format!("failed to read {}: {err}", path.display())).with_source(err)
}

impl ScriptSource for FsScripts {
    fn idempotent_scripts(&self) -> Result<Vec<Script>, StorageError> {
        self.scripts_in(&self.root.join(IDEMPOTENT_DIR))
    }

    fn versions(&self) -> Result<Vec<VersionDir>, StorageError> {
        let dir = self.root.join(VERSIONS_DIR);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(|err| io_error(&dir, err))? {
            let path = entry.map_err(|err| io_error(&dir, err))?.path();
            if path.is_dir() {
                names.extend(file_name(&path));
            }
        }
        Ok(collect_versions(names))
    }

    fn version_scripts(&self, version: &VersionDir) -> Result<Vec<Script>, StorageError> {
        self.scripts_in(&self.root.join(VERSIONS_DIR).join(&version.name))
    }
}
