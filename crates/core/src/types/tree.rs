//! Merkle-tree encoding of directories

use super::digest::Digest;
use super::message::{proto_name, ProtoMessage, REAPI_PACKAGE};
use crate::hashing::DigestFunction;
use std::collections::HashMap;

#[derive(Clone, PartialEq, prost::Message)]
pub struct NodeProperties {
    #[prost(message, optional, tag = "3")]
    pub unix_mode: Option<u32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FileNode {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    pub digest: Option<Digest>,
    #[prost(bool, tag = "4")]
    pub is_executable: bool,
    #[prost(message, optional, tag = "6")]
    pub node_properties: Option<NodeProperties>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DirectoryNode {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    pub digest: Option<Digest>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SymlinkNode {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub target: String,
}

/// One level of a directory; children are referenced by digest
#[derive(Clone, PartialEq, prost::Message)]
pub struct Directory {
    #[prost(message, repeated, tag = "1")]
    pub files: Vec<FileNode>,
    #[prost(message, repeated, tag = "2")]
    pub directories: Vec<DirectoryNode>,
    #[prost(message, repeated, tag = "3")]
    pub symlinks: Vec<SymlinkNode>,
}

/// A root directory together with every descendant directory
#[derive(Clone, PartialEq, prost::Message)]
pub struct Tree {
    #[prost(message, optional, tag = "1")]
    pub root: Option<Directory>,
    #[prost(message, repeated, tag = "2")]
    pub children: Vec<Directory>,
}

proto_name!(REAPI_PACKAGE => NodeProperties, Directory, Tree);

impl Tree {
    /// Index the child directories by the hash of their encoded form
    pub fn child_index(&self, function: DigestFunction) -> HashMap<String, &Directory> {
        self.children
            .iter()
            .map(|child| (function.hash(&child.to_bytes()), child))
            .collect()
    }
}
