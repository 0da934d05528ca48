use std::time::Duration;

use process::{Command, Error};

#[test_log::test(tokio::test)]
async fn test_command() {
    let out = Command::new("echo")
        .args(["hello,", "world!"])
        .run()
        .await
        .unwrap();
    assert!(out.is_success());
    assert_eq!(out.to_string_lossy(), "hello, world!\n");

    // arguments are never interpreted by a shell
    let out = Command::new("echo")
        .arg("$(whoami); `id`")
        .run()
        .await
        .unwrap();
    assert_eq!(out.to_string_lossy(), "$(whoami); `id`\n");
}

#[test_log::test(tokio::test)]
async fn test_command_with_input() {
    let out = Command::new("cat").run_with(b"piped").await.unwrap();
    assert_eq!(out.to_string_lossy(), "piped");

    // bigger than a pipe buffer
    let input = vec![b'a'; 1024 * 1024];
    let out = Command::new("cat").run_with(&input).await.unwrap();
    assert_eq!(out.stdout.len(), input.len());
}

#[test_log::test(tokio::test)]
async fn test_command_non_zero() {
    let out = Command::new("sh")
        .args(["-c", "echo oops >&2; exit 3"])
        .run()
        .await
        .unwrap();
    assert_eq!(out.code, 3);
    assert_eq!(out.stderr_lossy(), "oops\n");

    match out.ensure_success("sh").unwrap_err() {
        Error::GetExitStatusCodeNonZeroError(cmd, status, err) => {
            assert_eq!(cmd, "sh");
            assert_eq!(status, 3);
            assert_eq!(err, "oops\n");
        }
        err => panic!("unexpected error: {err:?}"),
    }
}

#[test_log::test(tokio::test)]
async fn test_command_not_found() {
    let err = Command::new("this-program-does-not-exist")
        .run()
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {err:?}");
}

#[test_log::test(tokio::test)]
async fn test_command_timeout() {
    let err = Command::new("sleep")
        .arg("5")
        .with_timeout(Some(Duration::from_millis(100)))
        .run()
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "unexpected error: {err:?}");
}
