use bytes::Bytes;
use remex_cas::{CasClient, MemoryByteStore};
use remex_config::ClientConfig;
use remex_core::{
    Digest, Directory, DirectoryNode, FileNode, InstanceNameDigest, NodeProperties, ProtoMessage, Tree,
};
use std::sync::Arc;
use tempfile::TempDir;

const INSTANCE: &str = "main";

async fn file_node(cas: &CasClient, name: &str, contents: &'static [u8], is_executable: bool) -> FileNode {
    let digest = cas
        .upload_blob(INSTANCE, Bytes::from_static(contents), name)
        .await
        .unwrap();
    FileNode {
        name: name.to_string(),
        digest: Some(digest),
        is_executable,
        node_properties: None,
    }
}

fn dir_node(name: &str, dir: &Directory) -> DirectoryNode {
    DirectoryNode {
        name: name.to_string(),
        digest: Some(Digest::of(&dir.to_bytes())),
    }
}

fn client() -> CasClient {
    let store = MemoryByteStore::new().with_chunk_size(3);
    CasClient::with_config(
        Arc::new(store),
        ClientConfig {
            download_concurrency: 2,
            ..ClientConfig::default()
        },
    )
}

#[tokio::test]
async fn test_expand_tree_recreates_layout() {
    let cas = client();

    let a = Directory {
        files: vec![file_node(&cas, "b.txt", b"0123456789", false).await],
        ..Default::default()
    };
    let tree = Tree {
        root: Some(Directory {
            files: vec![file_node(&cas, "c.txt", b"", false).await],
            directories: vec![dir_node("a", &a)],
            ..Default::default()
        }),
        children: vec![a],
    };

    let tmp = TempDir::new().unwrap();
    let dest = tmp.path().join("out");
    cas.expand_tree(INSTANCE, &tree, &dest).await.unwrap();

    assert_eq!(std::fs::read(dest.join("a/b.txt")).unwrap(), b"0123456789");
    assert_eq!(std::fs::metadata(dest.join("c.txt")).unwrap().len(), 0);
    assert_eq!(cas.stats().files_materialized, 2);
}

#[tokio::test]
async fn test_expand_tree_handles_deep_nesting() {
    let cas = client();

    let mut current = Directory {
        files: vec![file_node(&cas, "leaf.txt", b"deep", false).await],
        ..Default::default()
    };
    let mut children = Vec::new();
    for level in (0..12).rev() {
        let parent = Directory {
            directories: vec![dir_node(&format!("d{level}"), &current)],
            ..Default::default()
        };
        children.push(current);
        current = parent;
    }
    let tree = Tree {
        root: Some(current),
        children,
    };

    let tmp = TempDir::new().unwrap();
    cas.expand_tree(INSTANCE, &tree, tmp.path()).await.unwrap();

    let mut leaf = tmp.path().to_path_buf();
    for level in 0..12 {
        leaf.push(format!("d{level}"));
    }
    leaf.push("leaf.txt");
    assert_eq!(std::fs::read(leaf).unwrap(), b"deep");
}

#[tokio::test]
async fn test_expand_directory_tree_downloads_tree_message() {
    let cas = client();

    let tree = Tree {
        root: Some(Directory {
            files: vec![file_node(&cas, "report.txt", b"all green", false).await],
            ..Default::default()
        }),
        children: vec![],
    };
    let tree_digest = cas.upload_message(INSTANCE, &tree).await.unwrap();

    let tmp = TempDir::new().unwrap();
    cas.expand_directory_tree(&InstanceNameDigest::new(tree_digest, INSTANCE), tmp.path())
        .await
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(tmp.path().join("report.txt")).unwrap(),
        "all green"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_expand_tree_applies_file_modes() {
    use std::os::unix::fs::PermissionsExt;

    let cas = client();

    let mut custom = file_node(&cas, "custom.sh", b"#!/bin/sh\n", false).await;
    custom.node_properties = Some(NodeProperties {
        unix_mode: Some(0o700),
    });
    let tree = Tree {
        root: Some(Directory {
            files: vec![
                file_node(&cas, "run", b"#!/bin/sh\nexit 0\n", true).await,
                file_node(&cas, "data", b"plain", false).await,
                custom,
            ],
            ..Default::default()
        }),
        children: vec![],
    };

    let tmp = TempDir::new().unwrap();
    cas.expand_tree(INSTANCE, &tree, tmp.path()).await.unwrap();

    let mode = |name: &str| {
        std::fs::metadata(tmp.path().join(name))
            .unwrap()
            .permissions()
            .mode()
            & 0o777
    };
    assert_eq!(mode("run"), 0o755);
    assert_eq!(mode("data"), 0o644);
    assert_eq!(mode("custom.sh"), 0o700);
}
