mod common;

use bytes::Bytes;
use common::{Harness, INSTANCE};
use remex_core::{
    Action, ActionResult, Code, Command as CommandMessage, Digest, Directory, ErrorKind,
    FileNode, InstanceNameDigest, OutputDirectory, OutputFile, OutputSymlink, Tree,
};
use remex_exec::testing::Script;
use remex_exec::CommandResult;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn finished(action_result: ActionResult) -> CommandResult {
    CommandResult {
        instance_name: INSTANCE.to_string(),
        stage: remex_core::ExecutionStage::Completed,
        action_result: Some(action_result),
        ..Default::default()
    }
}

async fn upload(harness: &Harness, contents: &'static [u8]) -> Digest {
    harness
        .client
        .cas()
        .upload_blob(INSTANCE, Bytes::from_static(contents), "blob")
        .await
        .unwrap()
}

#[tokio::test]
async fn test_prepare_command_uploads_command_and_action() {
    let harness = Harness::new();
    let message = CommandMessage::new(["cargo", "build"]).with_output_directory("target");
    let input_root = Digest::of(b"input root");

    let command = harness
        .client
        .prepare_command(INSTANCE, "build", input_root.clone(), &message)
        .await
        .unwrap();
    assert_eq!(command.name(), "build");
    assert_eq!(command.action_digest().instance_name(), INSTANCE);

    let cas = harness.client.cas();
    let action: Action = cas.download_message(command.action_digest()).await.unwrap();
    assert_eq!(action.input_root_digest, Some(input_root));
    assert_eq!(
        command.action_digest().digest,
        Digest::of(&prost::Message::encode_to_vec(&action))
    );

    let command_digest = action.command_digest.unwrap();
    assert_eq!(
        command_digest,
        Digest::of(&prost::Message::encode_to_vec(&message))
    );
    let stored: CommandMessage = cas
        .download_message(&InstanceNameDigest::new(command_digest, INSTANCE))
        .await
        .unwrap();
    assert_eq!(stored, message);
}

#[tokio::test]
async fn test_prepare_command_fails_when_store_is_unavailable() {
    let harness = Harness::new();
    harness.store.set_unavailable(true);

    let err = harness
        .client
        .prepare_command(INSTANCE, "build", Digest::of(b""), &CommandMessage::new(["make"]))
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::UploadFailed);
    assert_eq!(err.code(), Some(Code::Unavailable));
}

#[tokio::test]
async fn test_stdout_and_stderr_default_to_empty() {
    let harness = Harness::new();
    let stdout = upload(&harness, b"hello from the worker\n").await;

    let result = finished(ActionResult {
        stdout_digest: Some(stdout),
        stderr_digest: None,
        ..Default::default()
    });
    let (out, err) = harness.client.get_stdout_and_stderr(&result).await.unwrap();
    assert_eq!(out, b"hello from the worker\n");
    assert!(err.is_empty());
}

#[tokio::test]
async fn test_stdout_bytes_are_returned_unchanged() {
    let harness = Harness::new();
    let raw: &'static [u8] = b"caf\xe9 \xff\xfe\x00binary";
    let stderr = upload(&harness, raw).await;

    let result = finished(ActionResult {
        stderr_digest: Some(stderr),
        ..Default::default()
    });
    let (out, err) = harness.client.get_stdout_and_stderr(&result).await.unwrap();
    assert!(out.is_empty());
    assert_eq!(err, raw);
}

#[tokio::test]
async fn test_absent_stdout_with_huge_declared_size_is_not_found() {
    let harness = Harness::new();
    let result = finished(ActionResult {
        stdout_digest: Some(Digest::new("ab".repeat(32), 1 << 50)),
        ..Default::default()
    });

    let err = harness
        .client
        .get_stdout_and_stderr(&result)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DownloadFailed);
    assert_eq!(err.code(), Some(Code::NotFound));
}

#[tokio::test]
async fn test_missing_stdout_blob_is_a_download_failure() {
    let harness = Harness::new();
    let result = finished(ActionResult {
        stdout_digest: Some(Digest::of(b"evicted")),
        ..Default::default()
    });

    let err = harness
        .client
        .get_stdout_and_stderr(&result)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DownloadFailed);
    assert_eq!(err.code(), Some(Code::NotFound));
}

#[tokio::test]
async fn test_download_action_outputs_writes_files_and_trees() {
    let harness = Harness::new();
    let binary = upload(&harness, b"\x7fELF").await;
    let log = upload(&harness, b"build ok").await;
    let report = upload(&harness, b"<testsuite/>").await;

    let tree = Tree {
        root: Some(Directory {
            files: vec![FileNode {
                name: "junit.xml".to_string(),
                digest: Some(report),
                ..Default::default()
            }],
            ..Default::default()
        }),
        children: vec![],
    };
    let tree_digest = harness
        .client
        .cas()
        .upload_message(INSTANCE, &tree)
        .await
        .unwrap();

    let result = finished(ActionResult {
        output_files: vec![
            OutputFile {
                path: "bin/app".to_string(),
                digest: Some(binary),
                is_executable: true,
            },
            OutputFile {
                path: "logs/build.log".to_string(),
                digest: Some(log),
                is_executable: false,
            },
        ],
        output_directories: vec![OutputDirectory {
            path: "reports".to_string(),
            tree_digest: Some(tree_digest),
        }],
        ..Default::default()
    });

    let tmp = TempDir::new().unwrap();
    harness
        .client
        .download_action_outputs(&result, tmp.path())
        .await
        .unwrap();

    assert_eq!(std::fs::read(tmp.path().join("bin/app")).unwrap(), b"\x7fELF");
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("logs/build.log")).unwrap(),
        "build ok"
    );
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("reports/junit.xml")).unwrap(),
        "<testsuite/>"
    );

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(tmp.path().join("bin/app"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[tokio::test]
async fn test_escaping_output_path_writes_nothing() {
    let harness = Harness::new();
    let data = upload(&harness, b"data").await;

    let result = finished(ActionResult {
        output_files: vec![
            OutputFile {
                path: "ok.txt".to_string(),
                digest: Some(data.clone()),
                is_executable: false,
            },
            OutputFile {
                path: "../outside.txt".to_string(),
                digest: Some(data),
                is_executable: false,
            },
        ],
        ..Default::default()
    });

    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("root");
    let err = harness
        .client
        .download_action_outputs(&result, &root)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPath);
    assert!(!root.join("ok.txt").exists());
    assert!(!tmp.path().join("outside.txt").exists());
}

#[tokio::test]
async fn test_output_file_without_digest_is_a_decode_failure() {
    let harness = Harness::new();
    let result = finished(ActionResult {
        output_files: vec![OutputFile {
            path: "a.out".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    });

    let tmp = TempDir::new().unwrap();
    let err = harness
        .client
        .download_action_outputs(&result, tmp.path())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecodeFailure);
    assert!(!tmp.path().join("a.out").exists());
}

#[tokio::test]
async fn test_output_symlinks_are_unsupported() {
    let harness = Harness::new();
    let result = finished(ActionResult {
        output_symlinks: vec![OutputSymlink {
            path: "current".to_string(),
            target: "v2".to_string(),
        }],
        ..Default::default()
    });

    let tmp = TempDir::new().unwrap();
    let err = harness
        .client
        .download_action_outputs(&result, tmp.path())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[tokio::test]
async fn test_end_to_end_execution_and_materialization() {
    let harness = Harness::new();
    let output = upload(&harness, b"42\n").await;
    let stdout = upload(&harness, b"computed answer\n").await;

    harness.service.push_execute(Script::successful(
        "op-e2e",
        ActionResult {
            output_files: vec![OutputFile {
                path: "answer.txt".to_string(),
                digest: Some(output),
                is_executable: false,
            }],
            stdout_digest: Some(stdout),
            ..Default::default()
        },
    ));

    let mut command = harness
        .client
        .prepare_command(
            INSTANCE,
            "answer",
            Digest::of(b""),
            &CommandMessage::new(["./answer"]).with_output_file("answer.txt"),
        )
        .await
        .unwrap();
    let subscription = command.start(&CancellationToken::new()).await.unwrap();
    let result = subscription.wait_for_completion().await.unwrap();
    assert!(result.is_success(), "{result}");

    let tmp = TempDir::new().unwrap();
    harness
        .client
        .download_action_outputs(&result, tmp.path())
        .await
        .unwrap();
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("answer.txt")).unwrap(),
        "42\n"
    );

    let (out, err) = harness.client.get_stdout_and_stderr(&result).await.unwrap();
    assert_eq!(out, b"computed answer\n");
    assert!(err.is_empty());
}
