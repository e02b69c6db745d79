//! Client path sanitization and root-confined resolution.
//!
//! [`RelativePath::sanitize`] turns any client string into a normalized
//! segment list; [`PathResolver`] maps it onto the real filesystem and is the
//! single place that checks containment against the canonical root.

use std::fmt;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use tokio::fs;
use tracing::warn;

use webfm_core::error::{AppError, ErrorKind};
use webfm_core::result::AppResult;

/// A normalized, root-relative path.
///
/// Contains only non-empty segments, none of which is `.` or `..`. The empty
/// path denotes the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RelativePath {
    segments: Vec<String>,
}

impl RelativePath {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Normalize an untrusted client path.
    ///
    /// URL escapes are decoded (repeatedly, so double-encoded input cannot
    /// smuggle separators through), back-slashes become `/`, NUL bytes are
    /// dropped, empty and `.` segments vanish and `..` pops the previous
    /// segment. A leading `..` is neutralized instead of rejected.
    pub fn sanitize(raw: &str) -> Self {
        let unescaped = unescape(raw);
        let mut segments: Vec<String> = Vec::new();
        for segment in unescaped.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other.to_string()),
            }
        }
        Self { segments }
    }

    /// Path segments in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether this is the root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Final segment, if any.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Parent path; the root has no parent.
    pub fn parent(&self) -> Option<RelativePath> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Append one already-validated name.
    pub fn join(&self, name: &str) -> RelativePath {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// Append every segment of `other`.
    pub fn join_path(&self, other: &RelativePath) -> RelativePath {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Whether `self` lies strictly below `ancestor`.
    pub fn is_strictly_inside(&self, ancestor: &RelativePath) -> bool {
        self.segments.len() > ancestor.segments.len()
            && self.segments[..ancestor.segments.len()] == ancestor.segments[..]
    }

    /// Join onto an absolute base directory.
    fn to_path(&self, base: &Path) -> PathBuf {
        let mut path = base.to_path_buf();
        for segment in &self.segments {
            path.push(segment);
        }
        path
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// Decode escapes until the string stops changing.
///
/// Sanitized output must sanitize to itself, so no escape may survive. A
/// name that literally contains `%41` is therefore not addressable.
fn unescape(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let next = percent_decode_str(&current)
            .decode_utf8_lossy()
            .replace('\0', "")
            .replace('\\', "/");
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Check a single entry name supplied by a client.
pub fn validate_name(name: &str) -> AppResult<&str> {
    if name.is_empty() || name.trim().is_empty() {
        return Err(AppError::invalid_name("Name must not be empty"));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(AppError::invalid_name(format!(
            "Name '{name}' must not contain a path separator"
        )));
    }
    if name == "." || name == ".." {
        return Err(AppError::invalid_name(format!("Name '{name}' is reserved")));
    }
    Ok(name)
}

/// The canonical root directory and the system area inside it.
///
/// Established once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct RootContext {
    root: PathBuf,
    system_dir_name: String,
}

impl RootContext {
    /// Create (if needed) and canonicalize the root and its system area.
    pub async fn open(root_path: impl AsRef<Path>, system_dir_name: &str) -> AppResult<Self> {
        let root_path = root_path.as_ref();
        fs::create_dir_all(root_path).await.map_err(|e| {
            AppError::from_io(e, "create root directory", &root_path.display().to_string())
        })?;
        let root = fs::canonicalize(root_path).await.map_err(|e| {
            AppError::from_io(e, "canonicalize root", &root_path.display().to_string())
        })?;

        let ctx = Self {
            root,
            system_dir_name: system_dir_name.to_string(),
        };

        for dir in [ctx.quarantine_dir(), ctx.staging_dir()] {
            fs::create_dir_all(&dir).await.map_err(|e| {
                AppError::from_io(e, "create system directory", &dir.display().to_string())
            })?;
        }

        Ok(ctx)
    }

    /// The canonical root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name of the reserved top-level directory.
    pub fn system_dir_name(&self) -> &str {
        &self.system_dir_name
    }

    /// The reserved system area.
    pub fn system_dir(&self) -> PathBuf {
        self.root.join(&self.system_dir_name)
    }

    /// Where trashed entries are parked under their ids.
    pub fn quarantine_dir(&self) -> PathBuf {
        self.system_dir().join("trash")
    }

    /// The trash ledger document.
    pub fn ledger_path(&self) -> PathBuf {
        self.system_dir().join("trash.json")
    }

    /// Where upload chunks are staged.
    pub fn staging_dir(&self) -> PathBuf {
        self.system_dir().join("chunks")
    }
}

/// Maps [`RelativePath`]s to absolute paths confined to the root.
///
/// Every returned path has been checked against the real filesystem, so a
/// symlink inside the root that points elsewhere is caught here.
#[derive(Debug, Clone)]
pub struct PathResolver {
    ctx: RootContext,
}

impl PathResolver {
    /// Create a resolver over `ctx`.
    pub fn new(ctx: RootContext) -> Self {
        Self { ctx }
    }

    /// The root context.
    pub fn context(&self) -> &RootContext {
        &self.ctx
    }

    /// The canonical root.
    pub fn root(&self) -> &Path {
        self.ctx.root()
    }

    /// Resolve an existing path, following symlinks.
    ///
    /// Fails with `NotFound` if it does not exist and `PathEscape` if the
    /// real location is outside the root or inside the system area.
    pub async fn resolve(&self, rel: &RelativePath) -> AppResult<PathBuf> {
        self.reject_reserved(rel)?;
        let lexical = rel.to_path(self.root());
        let canonical = fs::canonicalize(&lexical)
            .await
            .map_err(|e| AppError::from_io(e, "resolve", &rel.to_string()))?;
        self.check_contained(&canonical, rel)?;
        Ok(canonical)
    }

    /// Resolve an existing entry without following a final symlink.
    ///
    /// Used for operations on the entry itself (rename, move, trash): the
    /// parent is canonicalized and checked, the name is appended verbatim.
    /// The root itself is never a valid entry.
    pub async fn resolve_entry(&self, rel: &RelativePath) -> AppResult<PathBuf> {
        let path = self.resolve_new(rel).await?;
        match fs::symlink_metadata(&path).await {
            Ok(_) => Ok(path),
            Err(e) => Err(AppError::from_io(e, "find", &rel.to_string())),
        }
    }

    /// Resolve a path whose parent must exist but which itself may not.
    ///
    /// Fails with `ParentMissing` if the parent directory does not exist.
    pub async fn resolve_new(&self, rel: &RelativePath) -> AppResult<PathBuf> {
        let (parent, name) = match (rel.parent(), rel.name()) {
            (Some(parent), Some(name)) => (parent, name),
            _ => return Err(AppError::invalid_name("The root directory cannot be modified")),
        };
        self.reject_reserved(rel)?;

        let parent_abs = match self.resolve(&parent).await {
            Ok(path) => path,
            Err(e) if e.kind == ErrorKind::NotFound => {
                return Err(AppError::parent_missing(format!(
                    "Parent directory of '{rel}' does not exist"
                )));
            }
            Err(e) => return Err(e),
        };

        let meta = fs::metadata(&parent_abs)
            .await
            .map_err(|e| AppError::from_io(e, "stat", &parent.to_string()))?;
        if !meta.is_dir() {
            return Err(AppError::parent_missing(format!(
                "Parent of '{rel}' is not a directory"
            )));
        }

        Ok(parent_abs.join(name))
    }

    /// Create every missing directory along `rel`, checking containment at
    /// each step, and return the canonical directory.
    pub async fn ensure_dir(&self, rel: &RelativePath) -> AppResult<PathBuf> {
        self.reject_reserved(rel)?;
        let mut current = RelativePath::root();
        let mut abs = self.root().to_path_buf();
        for segment in rel.segments() {
            current = current.join(segment);
            let candidate = abs.join(segment);
            match fs::create_dir(&candidate).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => {
                    return Err(AppError::from_io(e, "create directory", &current.to_string()));
                }
            }
            abs = self.resolve(&current).await?;
            let meta = fs::metadata(&abs)
                .await
                .map_err(|e| AppError::from_io(e, "stat", &current.to_string()))?;
            if !meta.is_dir() {
                return Err(AppError::parent_missing(format!(
                    "'{current}' exists and is not a directory"
                )));
            }
        }
        Ok(abs)
    }

    fn reject_reserved(&self, rel: &RelativePath) -> AppResult<()> {
        if rel.segments().first().map(String::as_str) == Some(self.ctx.system_dir_name()) {
            warn!(path = %rel, "Rejected access to the system area");
            return Err(AppError::path_escape(format!("Access to '{rel}' is not allowed")));
        }
        Ok(())
    }

    fn check_contained(&self, canonical: &Path, rel: &RelativePath) -> AppResult<()> {
        // Path::starts_with compares whole components, so `/srv/root2`
        // is not inside `/srv/root`.
        if !canonical.starts_with(self.root()) {
            warn!(path = %rel, "Resolved path escapes the root");
            return Err(AppError::path_escape(format!(
                "Path '{rel}' resolves outside the root directory"
            )));
        }
        if canonical.starts_with(self.ctx.system_dir()) {
            warn!(path = %rel, "Resolved path points into the system area");
            return Err(AppError::path_escape(format!("Access to '{rel}' is not allowed")));
        }
        Ok(())
    }
}
