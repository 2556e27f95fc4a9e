use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::codec::sidecar::write_atomic;
use crate::foundation::error::{AnimstreamError, AnimstreamResult};

/// File holding the persisted order inside a workspace folder.
pub const ORDER_FILE_NAME: &str = "workspace.order.json";

/// File extensions treated as workspace members.
pub const WORKSPACE_EXTENSIONS: &[&str] = &["gif"];

/// Persisted order and original designation of a saved workspace.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceOrder {
    pub ordered_names: Vec<String>,
    #[serde(default)]
    pub original_name: Option<String>,
}

impl WorkspaceOrder {
    pub fn path_in(workspace: &Path) -> PathBuf {
        workspace.join(ORDER_FILE_NAME)
    }

    pub fn persist(&self, workspace: &Path) -> AnimstreamResult<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| AnimstreamError::serde(format!("serialize workspace order: {e}")))?;
        write_atomic(&Self::path_in(workspace), &json)
    }

    /// `Ok(None)` when the workspace has no order file.
    pub fn load(workspace: &Path) -> AnimstreamResult<Option<Self>> {
        let path = Self::path_in(workspace);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AnimstreamError::io(&path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| AnimstreamError::config_parse(format!("parse '{}': {e}", path.display())))
    }
}

/// Order resolved against the files actually present.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedOrder {
    pub names: Vec<String>,
    /// Index into `names`.
    pub original: Option<usize>,
}

/// Lowercase ASCII alphanumerics only; used as the last-resort name match.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Resolve `order` against `files`.
///
/// Each ordered name matches an unclaimed file exactly, then case-insensitively, then by
/// [`sanitize_name`]. Names with no match are skipped. Unclaimed files follow in alphabetical order.
/// The original resolves the same way and defaults to the first entry.
pub fn resolve_order(order: Option<&WorkspaceOrder>, files: &[String]) -> ResolvedOrder {
    let mut remaining: BTreeSet<&str> = files.iter().map(String::as_str).collect();
    let mut names = Vec::with_capacity(files.len());

    if let Some(order) = order {
        for wanted in &order.ordered_names {
            match match_name(wanted, &remaining) {
                Some(found) => {
                    remaining.remove(found);
                    names.push(found.to_owned());
                }
                None => tracing::debug!(name = %wanted, "ordered file missing from workspace"),
            }
        }
    }
    names.extend(remaining.into_iter().map(str::to_owned));

    let original = order
        .and_then(|o| o.original_name.as_deref())
        .and_then(|wanted| {
            let all: BTreeSet<&str> = names.iter().map(String::as_str).collect();
            let found = match_name(wanted, &all)?;
            names.iter().position(|n| n == found)
        })
        .or(if names.is_empty() { None } else { Some(0) });

    ResolvedOrder { names, original }
}

fn match_name<'a>(wanted: &str, candidates: &BTreeSet<&'a str>) -> Option<&'a str> {
    if let Some(&exact) = candidates.get(wanted) {
        return Some(exact);
    }
    if let Some(&ci) = candidates.iter().find(|c| c.eq_ignore_ascii_case(wanted)) {
        return Some(ci);
    }
    let key = sanitize_name(wanted);
    if key.is_empty() {
        return None;
    }
    candidates.iter().find(|c| sanitize_name(c) == key).copied()
}

/// Workspace member files, alphabetical.
pub fn list_workspace_files(workspace: &Path) -> AnimstreamResult<Vec<String>> {
    let entries = std::fs::read_dir(workspace).map_err(|e| AnimstreamError::io(workspace, e))?;
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AnimstreamError::io(workspace, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_member = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                WORKSPACE_EXTENSIONS
                    .iter()
                    .any(|w| w.eq_ignore_ascii_case(ext))
            });
        if is_member && let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            out.push(name.to_owned());
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/workspace/order.rs"]
mod tests;
