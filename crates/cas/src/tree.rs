//! Materializing output directory trees

use crate::client::CasClient;
use futures::stream::{self, TryStreamExt};
use prost::Name;
use remex_core::{Digest, Directory, Error, InstanceNameDigest, Result, Tree};
use remex_utils::{create_dir_all, set_mode, validate_entry_name};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing::debug;

#[derive(Debug)]
struct PlannedFile {
    path: PathBuf,
    digest: Digest,
    mode: u32,
}

#[derive(Debug, Default)]
struct Plan {
    directories: Vec<PathBuf>,
    files: Vec<PlannedFile>,
}

impl CasClient {
    /// Download the `Tree` stored under `digest` and expand it into `dest`
    pub async fn expand_directory_tree(&self, digest: &InstanceNameDigest, dest: &Path) -> Result<()> {
        let tree: Tree = self.download_message(digest).await?;
        self.expand_tree(digest.instance_name(), &tree, dest).await
    }

    /// Recreate `tree` under `dest`
    ///
    /// The whole tree is resolved before anything is written, so a malformed
    /// tree leaves the destination untouched. File contents are then fetched
    /// with bounded concurrency.
    pub async fn expand_tree(&self, instance_name: &str, tree: &Tree, dest: &Path) -> Result<()> {
        let plan = self.plan(tree, dest)?;
        debug!(
            dest = %dest.display(),
            directories = plan.directories.len(),
            files = plan.files.len(),
            "Expanding output tree"
        );

        let directory_mode = self.config().directory_mode;
        for dir in &plan.directories {
            create_dir_all(dir).await?;
            set_mode(dir, directory_mode).await?;
        }

        let concurrency = self.config().download_concurrency.max(1);
        stream::iter(plan.files.into_iter().map(Ok::<_, Error>))
            .try_for_each_concurrent(concurrency, |file| async move {
                let scoped = InstanceNameDigest::new(file.digest, instance_name);
                self.download_to_file(&scoped, &file.path, file.mode).await?;
                self.stats.files_materialized.fetch_add(1, Ordering::Relaxed);
                Ok(())
            })
            .await
    }

    fn plan(&self, tree: &Tree, dest: &Path) -> Result<Plan> {
        let root = tree
            .root
            .as_ref()
            .ok_or_else(|| Error::missing_field(Tree::full_name(), "root"))?;
        let index = tree.child_index(self.digest_function());
        let mut plan = Plan {
            directories: vec![dest.to_path_buf()],
            files: Vec::new(),
        };
        let mut pending: Vec<(&Directory, PathBuf)> = vec![(root, dest.to_path_buf())];

        while let Some((dir, path)) = pending.pop() {
            if let Some(link) = dir.symlinks.first() {
                return Err(Error::unsupported(
                    "symlink outputs",
                    format!("'{}' in {}", link.name, path.display()),
                ));
            }

            for file in &dir.files {
                validate_entry_name(&file.name)?;
                let digest = file
                    .digest
                    .clone()
                    .ok_or_else(|| Error::missing_field(Tree::full_name(), "FileNode.digest"))?;
                let mode = file
                    .node_properties
                    .as_ref()
                    .and_then(|props| props.unix_mode)
                    .map(|mode| mode & 0o7777)
                    .unwrap_or_else(|| self.config().mode_for(file.is_executable));
                plan.files.push(PlannedFile {
                    path: path.join(&file.name),
                    digest,
                    mode,
                });
            }

            for node in &dir.directories {
                validate_entry_name(&node.name)?;
                let node_digest = node
                    .digest
                    .as_ref()
                    .ok_or_else(|| Error::missing_field(Tree::full_name(), "DirectoryNode.digest"))?;
                let child = index.get(&node_digest.hash).ok_or_else(|| {
                    Error::decode(
                        Tree::full_name(),
                        format!(
                            "directory {node_digest} for '{}' is missing from the tree",
                            node.name
                        ),
                    )
                })?;
                let child_path = path.join(&node.name);
                plan.directories.push(child_path.clone());
                pending.push((*child, child_path));
            }
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryByteStore;
    use remex_core::{DirectoryNode, ErrorKind, FileNode, SymlinkNode};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_symlinks_are_rejected_before_writing() {
        let cas = CasClient::new(Arc::new(MemoryByteStore::new()));
        let tree = Tree {
            root: Some(Directory {
                files: vec![FileNode {
                    name: "a.txt".to_string(),
                    digest: Some(Digest::of(b"")),
                    ..Default::default()
                }],
                symlinks: vec![SymlinkNode {
                    name: "link".to_string(),
                    target: "a.txt".to_string(),
                }],
                ..Default::default()
            }),
            children: vec![],
        };

        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out");
        let err = cas.expand_tree("", &tree, &dest).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_missing_child_directory_is_a_decode_failure() {
        let cas = CasClient::new(Arc::new(MemoryByteStore::new()));
        let tree = Tree {
            root: Some(Directory {
                directories: vec![DirectoryNode {
                    name: "sub".to_string(),
                    digest: Some(Digest::of(b"not a directory")),
                }],
                ..Default::default()
            }),
            children: vec![],
        };

        let tmp = TempDir::new().unwrap();
        let err = cas.expand_tree("", &tree, tmp.path()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeFailure);
    }

    #[tokio::test]
    async fn test_entry_names_cannot_escape_destination() {
        let cas = CasClient::new(Arc::new(MemoryByteStore::new()));
        let tree = Tree {
            root: Some(Directory {
                files: vec![FileNode {
                    name: "../escape".to_string(),
                    digest: Some(Digest::of(b"")),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            children: vec![],
        };

        let tmp = TempDir::new().unwrap();
        let err = cas.expand_tree("", &tree, tmp.path()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPath);
    }

    #[tokio::test]
    async fn test_tree_without_root_is_a_decode_failure() {
        let cas = CasClient::new(Arc::new(MemoryByteStore::new()));
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out");

        let err = cas
            .expand_tree("", &Tree::default(), &dest)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeFailure);
        assert!(!dest.exists());
    }
}
