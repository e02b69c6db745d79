//! Directory listings for display.

use std::cmp::Ordering;

use serde::Serialize;
use tokio::fs;

use webfm_core::error::AppError;
use webfm_core::result::AppResult;
use webfm_core::types::FileSystemEntry;

use crate::fs::atomic::TEMP_PREFIX;
use crate::path::{PathResolver, RelativePath};

/// Label of the first breadcrumb.
pub const ROOT_LABEL: &str = "Root";

/// One step of the breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    /// Segment name, or [`ROOT_LABEL`].
    pub name: String,
    /// Cumulative path up to this segment.
    pub path: String,
}

/// Contents of one directory.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    /// The listed directory.
    pub path: String,
    /// Root first, then one crumb per segment.
    pub breadcrumbs: Vec<Breadcrumb>,
    /// Folders first, then files, each in natural name order.
    pub entries: Vec<FileSystemEntry>,
}

/// Enumerates directories. Always reads the filesystem; nothing is cached.
#[derive(Debug, Clone)]
pub struct DirectoryLister {
    resolver: PathResolver,
}

impl DirectoryLister {
    pub fn new(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    pub async fn list(&self, rel: &RelativePath) -> AppResult<Listing> {
        let abs = self.resolver.resolve(rel).await?;
        let mut dir = fs::read_dir(&abs).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotADirectory => {
                AppError::validation(format!("'{rel}' is not a folder"))
            }
            _ => AppError::from_io(e, "list", &rel.to_string()),
        })?;

        let system_dir = self.resolver.context().system_dir_name();
        let mut entries = Vec::new();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| AppError::from_io(e, "list", &rel.to_string()))?
        {
            let name = item.file_name().to_string_lossy().into_owned();
            if (rel.is_root() && name == system_dir) || name.starts_with(TEMP_PREFIX) {
                continue;
            }
            let path = item.path();
            // Follow symlinks for display; a dangling link shows as itself.
            let meta = match fs::metadata(&path).await {
                Ok(meta) => meta,
                Err(_) => match fs::symlink_metadata(&path).await {
                    Ok(meta) => meta,
                    // Vanished between readdir and stat.
                    Err(_) => continue,
                },
            };
            let child = rel.join(&name);
            entries.push(FileSystemEntry::from_metadata(name, child.to_string(), &meta));
        }

        entries.sort_by(|a, b| {
            b.kind
                .is_folder()
                .cmp(&a.kind.is_folder())
                .then_with(|| natural_cmp(&a.name, &b.name))
        });

        Ok(Listing {
            path: rel.to_string(),
            breadcrumbs: breadcrumbs(rel),
            entries,
        })
    }
}

/// Root crumb plus one crumb per segment with its cumulative path.
pub fn breadcrumbs(rel: &RelativePath) -> Vec<Breadcrumb> {
    let mut crumbs = vec![Breadcrumb {
        name: ROOT_LABEL.to_string(),
        path: String::new(),
    }];
    let mut current = RelativePath::root();
    for segment in rel.segments() {
        current = current.join(segment);
        crumbs.push(Breadcrumb {
            name: segment.clone(),
            path: current.to_string(),
        });
    }
    crumbs
}

/// Case-insensitive comparison treating digit runs as numbers, so
/// `file2` sorts before `file10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();
    let mut left = a_lower.chars().peekable();
    let mut right = b_lower.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_run = take_digits(&mut left);
                let r_run = take_digits(&mut right);
                let l_trim = l_run.trim_start_matches('0');
                let r_trim = r_run.trim_start_matches('0');
                let ord = l_trim
                    .len()
                    .cmp(&r_trim.len())
                    .then_with(|| l_trim.cmp(r_trim))
                    .then_with(|| l_run.len().cmp(&r_run.len()));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                if l != r {
                    return l.cmp(&r);
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        run.push(c);
        chars.next();
    }
    run
}
