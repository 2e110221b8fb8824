use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use pveoff_core::config::PveshConfig;
use pveoff_core::error::PveoffError;
use pveoff_core::types::{GuestKind, RunState, ShutdownRequest};
use pveoff_core::GuestBackend;
use pveoff_pvesh::{CommandExecutor, CommandOutput, PveshBackend};
use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;
use test_case::test_case;

/// Replays canned pvesh responses keyed by resource path
#[derive(Default)]
struct ScriptedPvesh {
    responses: HashMap<String, (i32, String)>,
    invocations: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedPvesh {
    fn respond(mut self, path: &str, stdout: &str) -> Self {
        self.responses.insert(path.to_string(), (0, stdout.to_string()));
        self
    }

    fn fail(mut self, path: &str) -> Self {
        self.responses.insert(path.to_string(), (255, String::new()));
        self
    }
}

#[async_trait::async_trait]
impl CommandExecutor for ScriptedPvesh {
    async fn execute(&self, _program: &str, args: &[String]) -> Result<CommandOutput, std::io::Error> {
        self.invocations.lock().push(args.to_vec());
        let (code, stdout) = self
            .responses
            .get(&args[1])
            .cloned()
            .unwrap_or((1, String::new()));
        Ok(CommandOutput {
            code: Some(code),
            stdout: stdout.into_bytes(),
            stderr: b"scripted failure".to_vec(),
        })
    }
}

fn backend(script: ScriptedPvesh) -> (PveshBackend, Arc<Mutex<Vec<Vec<String>>>>) {
    let invocations = script.invocations.clone();
    (
        PveshBackend::with_executor(&PveshConfig::default(), Box::new(script)),
        invocations,
    )
}

#[tokio::test]
async fn lists_guests_in_returned_order() {
    let (backend, _) = backend(ScriptedPvesh::default().respond(
        "/nodes/pve1/qemu",
        r#"[{"vmid":105,"name":"db","status":"running"},{"vmid":101,"name":"web","status":"stopped"}]"#,
    ));

    let guests = backend.list_guests("pve1", GuestKind::Qemu).await.unwrap();

    let vmids: Vec<u32> = guests.iter().map(|g| g.vmid).collect();
    assert_eq!(vmids, vec![105, 101]);
    assert_eq!(guests[0].name.as_deref(), Some("db"));
}

#[tokio::test]
async fn reads_policy_fields_from_config() {
    let (backend, _) = backend(ScriptedPvesh::default().respond(
        "/nodes/pve1/lxc/200/config",
        r#"{"hostname":"dns","tags":"infra;off-method_stop","startup":"order=5,down=90","memory":512}"#,
    ));

    let config = backend.guest_config("pve1", GuestKind::Lxc, 200).await.unwrap();

    assert_eq!(config.tags.as_deref(), Some("infra;off-method_stop"));
    assert_eq!(config.startup.as_deref(), Some("order=5,down=90"));
    assert_eq!(config.display_name(), Some("dns"));
}

#[test_case("running", RunState::Running)]
#[test_case("stopped", RunState::Stopped)]
#[test_case("paused", RunState::Other("paused".to_string()))]
#[tokio::test]
async fn maps_current_status(status: &str, expected: RunState) {
    let (backend, _) = backend(ScriptedPvesh::default().respond(
        "/nodes/pve1/qemu/100/status/current",
        &format!(r#"{{"status":"{}","qmpstatus":"{}"}}"#, status, status),
    ));

    assert_eq!(
        backend.guest_status("pve1", GuestKind::Qemu, 100).await.unwrap(),
        expected
    );
}

#[tokio::test]
async fn shutdown_with_force_stop() {
    let (backend, invocations) = backend(
        ScriptedPvesh::default().respond("/nodes/pve1/qemu/100/status/shutdown", r#""UPID:pve1:1""#),
    );

    backend
        .shutdown(
            "pve1",
            GuestKind::Qemu,
            100,
            ShutdownRequest {
                timeout_secs: NonZeroU64::new(60).unwrap(),
                force_stop: true,
            },
        )
        .await
        .unwrap();

    assert_eq!(
        invocations.lock()[0],
        vec![
            "create",
            "/nodes/pve1/qemu/100/status/shutdown",
            "-timeout=60",
            "-forceStop=1",
            "--output-format=json",
        ]
    );
}

#[tokio::test]
async fn shutdown_without_force_stop_omits_flag() {
    let (backend, invocations) = backend(
        ScriptedPvesh::default().respond("/nodes/pve1/lxc/200/status/shutdown", r#""UPID:pve1:2""#),
    );

    backend
        .shutdown(
            "pve1",
            GuestKind::Lxc,
            200,
            ShutdownRequest {
                timeout_secs: NonZeroU64::new(30).unwrap(),
                force_stop: false,
            },
        )
        .await
        .unwrap();

    assert_eq!(
        invocations.lock()[0],
        vec![
            "create",
            "/nodes/pve1/lxc/200/status/shutdown",
            "-timeout=30",
            "--output-format=json",
        ]
    );
}

#[tokio::test]
async fn stop_and_suspend_paths() {
    let (backend, invocations) = backend(
        ScriptedPvesh::default()
            .respond("/nodes/pve1/lxc/201/status/stop", r#""UPID:pve1:3""#)
            .respond("/nodes/pve1/qemu/102/status/suspend", r#""UPID:pve1:4""#),
    );

    backend.stop("pve1", GuestKind::Lxc, 201).await.unwrap();
    backend.suspend_to_disk("pve1", 102).await.unwrap();

    let invocations = invocations.lock();
    assert_eq!(
        invocations[0],
        vec!["create", "/nodes/pve1/lxc/201/status/stop", "--output-format=json"]
    );
    assert_eq!(
        invocations[1],
        vec![
            "create",
            "/nodes/pve1/qemu/102/status/suspend",
            "-todisk=1",
            "--output-format=json",
        ]
    );
}

#[tokio::test]
async fn failed_command_surfaces_exit_code() {
    let (backend, _) = backend(ScriptedPvesh::default().fail("/nodes/pve1/qemu/100/status/stop"));

    match backend.stop("pve1", GuestKind::Qemu, 100).await {
        Err(PveoffError::CommandFailed { code, stderr, .. }) => {
            assert_eq!(code, Some(255));
            assert_eq!(stderr, "scripted failure");
        }
        other => panic!("expected CommandFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn plain_text_listing_is_rejected() {
    let (backend, _) = backend(ScriptedPvesh::default().respond("/nodes/pve1/lxc", "no containers\n"));

    assert!(matches!(
        backend.list_guests("pve1", GuestKind::Lxc).await,
        Err(PveoffError::UnexpectedResponse { .. })
    ));
}

#[tokio::test]
async fn status_without_status_field_is_rejected() {
    let (backend, _) = backend(
        ScriptedPvesh::default().respond("/nodes/pve1/qemu/100/status/current", r#"{"uptime":12}"#),
    );

    assert!(matches!(
        backend.guest_status("pve1", GuestKind::Qemu, 100).await,
        Err(PveoffError::UnexpectedResponse { .. })
    ));
}
