//! Repository contents domain types and operations.
//!
//! Covers the Contents API (single files and directory listings) and the Git
//! Data API (recursive trees and blobs) used for scanning repository content.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{encode_query_value, Error, GitHubClient};

#[cfg(test)]
#[path = "contents_tests.rs"]
mod tests;

/// A single entry in a GitHub repository directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Entry name (e.g., "ci.yml")
    pub name: String,

    /// Full path within repository (e.g., ".github/workflows/ci.yml")
    pub path: String,

    /// Entry type (file, directory, symlink, submodule)
    #[serde(rename = "type")]
    pub entry_type: EntryType,

    /// Git SHA of the entry
    pub sha: String,

    /// Size in bytes (0 for directories)
    #[serde(default)]
    pub size: u64,
}

/// Type of entry in a repository directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Dir,
    Symlink,
    Submodule,
}

/// A file read through the Contents API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileContent {
    pub name: String,
    pub path: String,
    /// Blob SHA; required when updating the file
    pub sha: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

impl FileContent {
    /// Decodes the base64 content GitHub returns (with embedded newlines).
    pub fn decoded(&self) -> Result<String, Error> {
        let raw = self.content.as_deref().unwrap_or_default();
        decode_base64_text(raw)
    }
}

/// Body of `PUT /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Clone, Serialize)]
pub struct FileUpdate {
    pub message: String,
    /// Base64 encoded file content
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// SHA of the blob being replaced; omit when creating the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

impl FileUpdate {
    /// Builds an update from plain text content.
    pub fn new(
        message: impl Into<String>,
        text: &str,
        branch: Option<String>,
        sha: Option<String>,
    ) -> Self {
        Self {
            message: message.into(),
            content: STANDARD.encode(text.as_bytes()),
            branch,
            sha,
        }
    }
}

/// A recursive git tree.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitTree {
    pub sha: String,
    #[serde(default)]
    pub tree: Vec<GitTreeEntry>,
    /// GitHub caps recursive trees; `true` means entries are missing
    #[serde(default)]
    pub truncated: bool,
}

/// An entry of a git tree.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GitTreeEntry {
    pub path: String,
    #[serde(default)]
    pub mode: String,
    /// `blob`, `tree` or `commit`
    #[serde(rename = "type")]
    pub entry_type: String,
    pub sha: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl GitTreeEntry {
    pub fn is_blob(&self) -> bool {
        self.entry_type == "blob"
    }
}

#[derive(Deserialize)]
struct Blob {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

fn decode_base64_text(raw: &str) -> Result<String, Error> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(cleaned).map_err(|e| {
        warn!(error = %e, "Content is not valid base64");
        Error::InvalidResponse
    })?;
    String::from_utf8(bytes).map_err(|_| Error::InvalidResponse)
}

impl GitHubClient {
    /// Reads a single file. Returns `None` when the path does not exist.
    ///
    /// `git_ref` selects a branch, tag or SHA; `None` reads the default branch.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, path = %file_path))]
    pub async fn get_file(
        &self,
        owner: &str,
        repo: &str,
        file_path: &str,
        git_ref: Option<&str>,
    ) -> Result<Option<FileContent>, Error> {
        let mut uri = format!("/repos/{owner}/{repo}/contents/{file_path}");
        if let Some(r) = git_ref {
            uri.push_str(&format!("?ref={}", encode_query_value(r)));
        }
        self.get_optional(&uri).await
    }

    /// Creates or replaces a file and commits the change.
    #[instrument(skip(self, update), fields(owner = %owner, repo = %repo, path = %file_path))]
    pub async fn put_file(
        &self,
        owner: &str,
        repo: &str,
        file_path: &str,
        update: &FileUpdate,
    ) -> Result<(), Error> {
        self.put(&format!("/repos/{owner}/{repo}/contents/{file_path}"), update)
            .await?;
        debug!(path = file_path, "Committed file through the contents API");
        Ok(())
    }

    /// Lists a directory. Returns `None` when the directory does not exist.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, path = %dir_path))]
    pub async fn list_directory(
        &self,
        owner: &str,
        repo: &str,
        dir_path: &str,
    ) -> Result<Option<Vec<TreeEntry>>, Error> {
        self.get_optional(&format!("/repos/{owner}/{repo}/contents/{dir_path}"))
            .await
    }

    /// Reads the full tree of `git_ref` recursively.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    pub async fn get_tree_recursive(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> Result<GitTree, Error> {
        let tree: GitTree = self
            .get_json(&format!(
                "/repos/{owner}/{repo}/git/trees/{}?recursive=1",
                encode_query_value(git_ref)
            ))
            .await?;
        if tree.truncated {
            warn!(repo = repo, "Git tree was truncated by GitHub");
        }
        Ok(tree)
    }

    /// Reads a blob as UTF-8 text. Returns `None` for binary content.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    pub async fn get_blob_text(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Option<String>, Error> {
        let blob: Blob = self
            .get_json(&format!("/repos/{owner}/{repo}/git/blobs/{sha}"))
            .await?;
        if blob.encoding != "base64" {
            return Ok(Some(blob.content));
        }
        match decode_base64_text(&blob.content) {
            Ok(text) => Ok(Some(text)),
            Err(_) => Ok(None),
        }
    }
}
