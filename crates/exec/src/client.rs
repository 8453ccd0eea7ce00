//! Remote execution client: prepares commands and materializes their results

use crate::command::Command;
use crate::result::CommandResult;
use crate::service::ExecutionService;
use remex_cas::CasClient;
use prost::Name;
use remex_core::{Action, ActionResult, Digest, Error, InstanceNameDigest, Result};
use remex_utils::{create_dir_all, join_relative, set_mode};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Entry point for running actions remotely
#[derive(Clone)]
pub struct Client {
    cas: CasClient,
    service: Arc<dyn ExecutionService>,
}

impl Client {
    /// Settings such as modes and cache lookup come from the CAS client's config
    pub fn new(cas: CasClient, service: Arc<dyn ExecutionService>) -> Self {
        Self { cas, service }
    }

    pub fn cas(&self) -> &CasClient {
        &self.cas
    }

    /// Upload `command` and an Action referencing it, returning a handle ready to start
    pub async fn prepare_command(
        &self,
        instance_name: &str,
        name: &str,
        input_root_digest: Digest,
        command: &remex_core::Command,
    ) -> Result<Command> {
        let command_digest = self.cas.upload_message(instance_name, command).await?;

        let action = Action {
            command_digest: Some(command_digest),
            input_root_digest: Some(input_root_digest),
            ..Default::default()
        };
        let action_digest = self.cas.upload_message(instance_name, &action).await?;

        debug!(
            command = %name,
            action_digest = %action_digest,
            "Prepared command"
        );

        Ok(Command::new(
            name,
            InstanceNameDigest::new(action_digest, instance_name),
            self.cas.config().skip_cache_lookup,
            Arc::clone(&self.service),
        ))
    }

    /// Fetch the captured stdout and stderr of a finished command
    ///
    /// Contents are returned exactly as stored. A stream without a digest is
    /// returned as empty.
    pub async fn get_stdout_and_stderr(&self, result: &CommandResult) -> Result<(Vec<u8>, Vec<u8>)> {
        let Some(action_result) = result.action_result.as_ref() else {
            return Ok((Vec::new(), Vec::new()));
        };

        let stdout = self
            .fetch_stream(&result.instance_name, action_result.stdout_digest.as_ref())
            .await?;
        let stderr = self
            .fetch_stream(&result.instance_name, action_result.stderr_digest.as_ref())
            .await?;
        Ok((stdout, stderr))
    }

    async fn fetch_stream(&self, instance_name: &str, digest: Option<&Digest>) -> Result<Vec<u8>> {
        let Some(digest) = digest else {
            return Ok(Vec::new());
        };
        let scoped = InstanceNameDigest::new(digest.clone(), instance_name);
        self.cas.download_bytes(&scoped).await
    }

    /// Write the declared output files and directories of `result` under `root`
    ///
    /// Stops at the first failure; whatever was already written stays on disk.
    pub async fn download_action_outputs(&self, result: &CommandResult, root: &Path) -> Result<()> {
        let Some(action_result) = result.action_result.as_ref() else {
            return Ok(());
        };

        if let Some(link) = action_result.output_symlinks.first() {
            return Err(Error::unsupported(
                "symlink outputs",
                format!("'{}' -> '{}'", link.path, link.target),
            ));
        }

        let files = action_result
            .output_files
            .iter()
            .map(|file| -> Result<_> {
                let digest = required(file.digest.as_ref(), "OutputFile.digest")?;
                Ok((join_relative(root, &file.path)?, digest, file.is_executable))
            })
            .collect::<Result<Vec<_>>>()?;
        let directories = action_result
            .output_directories
            .iter()
            .map(|dir| -> Result<_> {
                let digest = required(dir.tree_digest.as_ref(), "OutputDirectory.tree_digest")?;
                Ok((join_relative(root, &dir.path)?, digest))
            })
            .collect::<Result<Vec<_>>>()?;

        let config = self.cas.config();
        for (path, digest, is_executable) in files {
            let scoped = InstanceNameDigest::new(digest.clone(), &result.instance_name);
            self.cas
                .download_to_file(&scoped, &path, config.mode_for(is_executable))
                .await?;
        }

        for (path, digest) in directories {
            create_dir_all(&path).await?;
            set_mode(&path, config.directory_mode).await?;
            let scoped = InstanceNameDigest::new(digest.clone(), &result.instance_name);
            self.cas.expand_directory_tree(&scoped, &path).await?;
        }

        debug!(
            root = %root.display(),
            files = action_result.output_files.len(),
            directories = action_result.output_directories.len(),
            "Downloaded action outputs"
        );
        Ok(())
    }
}

fn required<'a>(digest: Option<&'a Digest>, field: &str) -> Result<&'a Digest> {
    digest.ok_or_else(|| Error::missing_field(ActionResult::full_name(), field))
}
