#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tapectl_config::SessionConfig;
    use tapectl_core::TapeError;
    use tapectl_session::*;
    use tokio_util::sync::CancellationToken;

    /// Engine double: records every script and writes the files a real
    /// engine would.
    struct MockEngine {
        scripts: Mutex<Vec<String>>,
        fail_with: Option<RunStatus>,
        write_screenshots: bool,
        frames: String,
    }

    impl MockEngine {
        fn ok(frames: &str) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(Vec::new()),
                fail_with: None,
                write_screenshots: true,
                frames: frames.to_string(),
            })
        }

        fn failing(status: RunStatus) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(Vec::new()),
                fail_with: Some(status),
                write_screenshots: false,
                frames: String::new(),
            })
        }

        fn without_screenshots() -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(Vec::new()),
                fail_with: None,
                write_screenshots: false,
                frames: "frame".into(),
            })
        }

        fn runs(&self) -> Vec<String> {
            self.scripts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TapeEngine for MockEngine {
        async fn run(
            &self,
            script: &str,
            workspace: &Path,
            _cancel: Option<&CancellationToken>,
        ) -> EngineRun {
            self.scripts.lock().unwrap().push(script.to_string());
            if let Some(status) = &self.fail_with {
                return EngineRun {
                    status: status.clone(),
                    text_output_path: None,
                };
            }
            std::fs::write(workspace.join("output.txt"), &self.frames).unwrap();
            if self.write_screenshots {
                for line in script.lines() {
                    if let Some(file) = line.strip_prefix("Screenshot ") {
                        std::fs::write(workspace.join(file), b"PNG").unwrap();
                    }
                }
            }
            EngineRun {
                status: RunStatus::Succeeded,
                text_output_path: Some(workspace.join("output.txt")),
            }
        }
    }

    fn controller(base: &Path, engine: Arc<MockEngine>) -> TapeController {
        let settings = SessionConfig {
            base_dir: base.to_path_buf(),
            ..SessionConfig::default()
        };
        TapeController::new(settings, engine)
    }

    fn lines(c: &TapeController) -> Vec<String> {
        c.session().unwrap().script().lines().to_vec()
    }

    // ── start ──────────────────────────────────────────────────

    #[tokio::test]
    async fn test_start_initializes_script_and_workspace() {
        let base = tempfile::tempdir().unwrap();
        let mut c = controller(base.path(), MockEngine::ok(""));
        assert_eq!(c.state(), SessionState::Idle);

        let session = c.start("htop").await.unwrap();
        assert!(session.workspace_dir().is_dir());
        assert!(session.workspace_dir().starts_with(base.path()));
        assert_eq!(session.capture_count(), 0);
        assert_eq!(c.state(), SessionState::Active);
        assert_eq!(lines(&c), vec!["Type \"htop\"", "Enter", "Sleep 500ms"]);
    }

    #[tokio::test]
    async fn test_start_escapes_quotes_in_command() {
        let base = tempfile::tempdir().unwrap();
        let mut c = controller(base.path(), MockEngine::ok(""));
        c.start(r#"echo "hi""#).await.unwrap();
        assert_eq!(lines(&c)[0], r#"Type "echo \"hi\"""#);
    }

    #[tokio::test]
    async fn test_start_multiline_command_types_one_line_each() {
        let base = tempfile::tempdir().unwrap();
        let mut c = controller(base.path(), MockEngine::ok(""));
        c.start("echo a\necho b").await.unwrap();
        assert_eq!(
            lines(&c)[..4],
            [
                "Type \"echo a\"",
                "Enter",
                "Type \"echo b\"",
                "Enter",
            ]
        );
        let rendered = c.script().unwrap();
        assert!(rendered.lines().all(|l| !l.starts_with("Type") || l.ends_with('"')));
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected_without_mutation() {
        let base = tempfile::tempdir().unwrap();
        let mut c = controller(base.path(), MockEngine::ok(""));
        c.start("vim").await.unwrap();
        c.send(SendInput {
            text: Some("ihello".into()),
            ..Default::default()
        })
        .unwrap();
        let before = lines(&c);
        let dir = c.session().unwrap().workspace_dir().to_path_buf();

        let err = c.start("nano").await.unwrap_err();
        assert!(matches!(err, TapeError::AlreadyActive { ref command } if command == "vim"));
        assert_eq!(lines(&c), before);
        assert_eq!(c.session().unwrap().command(), "vim");
        assert_eq!(c.session().unwrap().workspace_dir(), dir);
        assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_start_requires_command() {
        let base = tempfile::tempdir().unwrap();
        let mut c = controller(base.path(), MockEngine::ok(""));
        let err = c.start("  ").await.unwrap_err();
        assert_eq!(err.kind(), "MissingArgument");
        assert_eq!(c.state(), SessionState::Idle);
    }

    // ── inactive session ───────────────────────────────────────

    #[tokio::test]
    async fn test_actions_without_session_fail() {
        let base = tempfile::tempdir().unwrap();
        let engine = MockEngine::ok("");
        let mut c = controller(base.path(), engine.clone());

        let send = c.send(SendInput {
            text: Some("x".into()),
            ..Default::default()
        });
        assert!(matches!(send, Err(TapeError::NoActiveSession)));
        assert!(matches!(c.capture(None, None).await, Err(TapeError::NoActiveSession)));
        assert!(matches!(c.capture(Some("a/b"), None).await, Err(TapeError::NoActiveSession)));
        assert!(matches!(c.exit(None).await, Err(TapeError::NoActiveSession)));
        assert!(engine.runs().is_empty());
    }

    // ── send ───────────────────────────────────────────────────

    #[tokio::test]
    async fn test_send_requires_some_input() {
        let base = tempfile::tempdir().unwrap();
        let mut c = controller(base.path(), MockEngine::ok(""));
        c.start("less README").await.unwrap();
        let err = c
            .send(SendInput {
                text: Some(String::new()),
                keys: Some(vec![]),
                sleep_ms: None,
            })
            .unwrap_err();
        assert!(matches!(err, TapeError::NoOperation));
        assert_eq!(lines(&c).len(), 3);
    }

    #[tokio::test]
    async fn test_send_orders_text_keys_sleep() {
        let base = tempfile::tempdir().unwrap();
        let mut c = controller(base.path(), MockEngine::ok(""));
        c.start("fzf").await.unwrap();

        let appended = c
            .send(SendInput {
                text: Some("say \"x\"".into()),
                keys: Some(vec!["Down".into(), "ctrl-c".into(), "q".into()]),
                sleep_ms: Some(250),
            })
            .unwrap();
        c.send(SendInput {
            keys: Some(vec!["Enter".into()]),
            ..Default::default()
        })
        .unwrap();
        c.send(SendInput {
            sleep_ms: Some(1500),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(appended, 8);
        assert_eq!(
            lines(&c)[3..],
            [
                "Type \"say \\\"x\\\"\"",
                "Down",
                "Sleep 100ms",
                "Ctrl+C",
                "Sleep 100ms",
                "Type \"q\"",
                "Sleep 100ms",
                "Sleep 250ms",
                "Enter",
                "Sleep 100ms",
                "Sleep 1500ms",
            ]
        );
    }

    #[tokio::test]
    async fn test_send_unknown_key_appends_nothing() {
        let base = tempfile::tempdir().unwrap();
        let mut c = controller(base.path(), MockEngine::ok(""));
        c.start("top").await.unwrap();
        let before = lines(&c).len();

        let err = c
            .send(SendInput {
                text: Some("abc".into()),
                keys: Some(vec!["Enter".into(), "Unknown_Multi_Key".into()]),
                sleep_ms: Some(10),
            })
            .unwrap_err();
        assert_eq!(err.kind(), "UnknownKey");
        assert!(err.to_string().contains("Ctrl+C"));
        assert_eq!(lines(&c).len(), before);
    }

    // ── capture ────────────────────────────────────────────────

    #[tokio::test]
    async fn test_capture_returns_last_frame_and_screenshot() {
        let base = tempfile::tempdir().unwrap();
        let sep = "-".repeat(40);
        let engine = MockEngine::ok(&format!("old frame\n{sep}\n$ echo hi\nhi\n{sep}\n"));
        let mut c = controller(base.path(), engine.clone());
        c.start("echo hi").await.unwrap();

        let capture = c.capture(None, None).await.unwrap();
        assert_eq!(capture.text, "$ echo hi\nhi");
        assert!(capture.screenshot_path.ends_with("screenshot_1.png"));
        assert!(capture.screenshot_path.exists());
        assert_eq!(c.session().unwrap().capture_count(), 1);

        let script = &engine.runs()[0];
        assert!(script.starts_with("Output output.txt\nSet TypingSpeed 50ms\nSet Shell \"bash\"\n"));
        assert!(script.ends_with("Sleep 1000ms\nScreenshot screenshot_1.png\n"));
    }

    #[tokio::test]
    async fn test_capture_replays_full_script_each_time() {
        let base = tempfile::tempdir().unwrap();
        let engine = MockEngine::ok("frame");
        let mut c = controller(base.path(), engine.clone());
        c.start("python3").await.unwrap();
        c.capture(Some("^>>> "), None).await.unwrap();
        c.send(SendInput {
            text: Some("1+1".into()),
            keys: Some(vec!["Enter".into()]),
            ..Default::default()
        })
        .unwrap();
        let second = c.capture(None, None).await.unwrap();

        let runs = engine.runs();
        assert_eq!(runs.len(), 2);
        assert!(runs[1].starts_with(runs[0].trim_end()));
        assert!(runs[0].contains("Wait /^>>> /\nScreenshot screenshot_1.png"));
        assert!(runs[1].contains("Type \"1+1\"\nEnter"));
        assert!(second.screenshot_path.ends_with("screenshot_2.png"));
    }

    #[tokio::test]
    async fn test_capture_rejects_bad_wait_pattern() {
        let base = tempfile::tempdir().unwrap();
        let engine = MockEngine::ok("");
        let mut c = controller(base.path(), engine.clone());
        c.start("ls").await.unwrap();
        let before = lines(&c);

        for pattern in ["(unclosed", "a/b", "line\nbreak"] {
            let err = c.capture(Some(pattern), None).await.unwrap_err();
            assert_eq!(err.kind(), "InvalidArgument", "pattern {pattern:?}");
        }
        assert_eq!(lines(&c), before);
        assert_eq!(c.session().unwrap().capture_count(), 0);
        assert!(engine.runs().is_empty());
    }

    #[tokio::test]
    async fn test_capture_engine_failure_maps_errors() {
        let base = tempfile::tempdir().unwrap();
        let cases = [
            (
                RunStatus::Exited {
                    code: Some(1),
                    detail: "parse error".into(),
                },
                "EngineFailure",
            ),
            (RunStatus::Aborted, "Aborted"),
            (RunStatus::SpawnFailed("no such file".into()), "SpawnFailure"),
        ];
        for (status, kind) in cases {
            let mut c = controller(base.path(), MockEngine::failing(status));
            c.start("ls").await.unwrap();
            let err = c.capture(None, None).await.unwrap_err();
            assert_eq!(err.kind(), kind);
            assert_eq!(c.state(), SessionState::Active);
            c.shutdown().await;
        }
    }

    #[tokio::test]
    async fn test_capture_engine_failure_message_has_exit_code() {
        let base = tempfile::tempdir().unwrap();
        let mut c = controller(
            base.path(),
            MockEngine::failing(RunStatus::Exited {
                code: Some(2),
                detail: "bad tape".into(),
            }),
        );
        c.start("ls").await.unwrap();
        let err = c.capture(None, None).await.unwrap_err();
        assert!(err.to_string().contains("exit code 2: bad tape"));
        // The attempt still consumed a screenshot number.
        assert_eq!(c.session().unwrap().capture_count(), 1);
    }

    #[tokio::test]
    async fn test_capture_missing_screenshot() {
        let base = tempfile::tempdir().unwrap();
        let mut c = controller(base.path(), MockEngine::without_screenshots());
        c.start("ls").await.unwrap();
        let err = c.capture(None, None).await.unwrap_err();
        assert!(matches!(err, TapeError::MissingOutput(_)));
    }

    // ── exit / shutdown ────────────────────────────────────────

    #[tokio::test]
    async fn test_exit_interrupts_and_cleans_up() {
        let base = tempfile::tempdir().unwrap();
        let engine = MockEngine::ok("frame");
        let mut c = controller(base.path(), engine.clone());
        c.start("watch date").await.unwrap();
        c.capture(None, None).await.unwrap();
        let dir = c.session().unwrap().workspace_dir().to_path_buf();

        let summary = c.exit(None).await.unwrap();
        assert_eq!(summary.command, "watch date");
        assert_eq!(summary.capture_count, 1);
        assert_eq!(summary.workspace_dir, dir);
        assert!(summary.engine_error.is_none());
        assert!(!dir.exists());
        assert_eq!(c.state(), SessionState::Idle);
        assert!(engine.runs()[1].ends_with("Ctrl+C\nSleep 200ms\n"));
    }

    #[tokio::test]
    async fn test_exit_resets_even_when_engine_fails() {
        let base = tempfile::tempdir().unwrap();
        let mut c = controller(
            base.path(),
            MockEngine::failing(RunStatus::Exited {
                code: Some(1),
                detail: "boom".into(),
            }),
        );
        c.start("ls").await.unwrap();
        let dir = c.session().unwrap().workspace_dir().to_path_buf();

        let summary = c.exit(None).await.unwrap();
        assert_eq!(summary.engine_error.as_deref(), Some("exit code 1: boom"));
        assert!(!dir.exists());
        assert_eq!(c.state(), SessionState::Idle);

        // A new session can be started afterwards.
        c.start("ls").await.unwrap();
    }

    #[tokio::test]
    async fn test_exit_summary_serializes_camel_case() {
        let base = tempfile::tempdir().unwrap();
        let mut c = controller(base.path(), MockEngine::ok(""));
        c.start("ls").await.unwrap();
        let summary = c.exit(None).await.unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["captureCount"], 0);
        assert!(json["workspaceDir"].is_string());
        assert!(json.get("engineError").is_none());
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let base = tempfile::tempdir().unwrap();
        let engine = MockEngine::ok("");
        let mut c = controller(base.path(), engine.clone());
        c.shutdown().await;

        c.start("ls").await.unwrap();
        let dir = c.session().unwrap().workspace_dir().to_path_buf();
        c.shutdown().await;
        c.shutdown().await;
        assert!(!dir.exists());
        assert_eq!(c.state(), SessionState::Idle);
        assert!(engine.runs().is_empty());
    }

    #[tokio::test]
    async fn test_rendered_script_matches_header_and_lines() {
        let base = tempfile::tempdir().unwrap();
        let settings = SessionConfig {
            base_dir: base.path().to_path_buf(),
            shell: "zsh".into(),
            typing_speed_ms: 10,
            height: Some(600),
            ..SessionConfig::default()
        };
        let mut c = TapeController::new(settings, MockEngine::ok(""));
        assert!(c.script().is_none());
        c.start("ls").await.unwrap();
        assert_eq!(
            c.script().unwrap(),
            "Output output.txt\nSet TypingSpeed 10ms\nSet Shell \"zsh\"\nSet Height 600\n\
             Type \"ls\"\nEnter\nSleep 500ms\n"
        );
    }
}
