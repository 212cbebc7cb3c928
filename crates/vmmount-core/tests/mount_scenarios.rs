//! End-to-end mount construction against a simulated guest.
//!
//! These tests pin the exact command sequence sent to the guest.

use vmmount_core::testing::{FakeGuest, RecordingServer};
use vmmount_core::{IdentityMaps, MountError, MountState, RemoteProcess, SshfsMount};

fn mount(guest: &FakeGuest, target: &str) -> Result<SshfsMount<RecordingServer>, MountError> {
    SshfsMount::new(guest.session(), "/host/project", target, IdentityMaps::default())
}

#[test]
fn test_relative_target_under_home() {
    let guest = FakeGuest::new();
    let mut mount = mount(&guest, "work").unwrap();

    assert_eq!(
        guest.commands(),
        vec![
            "which sshfs",
            "bash -c 'echo ${HOME}'",
            "/bin/bash -c 'P=\"/home/ubuntu/work\"; while [ ! -d \"$P/\" ]; do P=${P%/*}; done; echo $P/'",
            "cd \"/home/ubuntu/\" && sudo mkdir -p \"work\"",
            "id -nu",
            "id -ng",
            "sudo chown ubuntu:ubuntu \"/home/ubuntu/work\"",
            "sudo chown ubuntu:ubuntu \"/home/ubuntu/\"",
            "id -u",
            "id -g",
        ]
    );
    assert_eq!(guest.owner_of("/home/ubuntu/work"), Some("ubuntu:ubuntu".into()));
    assert_eq!(mount.target(), "/home/ubuntu/work");

    mount.stop();
    assert_eq!(mount.state(), MountState::Stopped);
}

#[test]
fn test_deep_target_chowns_every_level() {
    let guest = FakeGuest::new();
    let _mount = mount(&guest, "/srv/shares/team/docs").unwrap();

    assert_eq!(
        guest.commands_starting_with("cd "),
        vec!["cd \"/\" && sudo mkdir -p \"srv/shares/team/docs\""]
    );
    assert_eq!(
        guest.commands_starting_with("sudo chown"),
        vec![
            "sudo chown ubuntu:ubuntu \"/srv/shares/team/docs\"",
            "sudo chown ubuntu:ubuntu \"/srv/shares/team\"",
            "sudo chown ubuntu:ubuntu \"/srv/shares\"",
            "sudo chown ubuntu:ubuntu \"/srv\"",
            "sudo chown ubuntu:ubuntu \"/\"",
        ]
    );
}

#[test]
fn test_existing_target_skips_mkdir_but_chowns_root() {
    let guest = FakeGuest::new().with_dir("/home/ubuntu/work");
    let _mount = mount(&guest, "work").unwrap();

    assert!(guest.commands_starting_with("cd ").is_empty());
    assert_eq!(
        guest.commands_starting_with("sudo chown"),
        vec!["sudo chown ubuntu:ubuntu \"/home/ubuntu/work/\""]
    );
}

#[test]
fn test_remount_after_unmount_is_idempotent() {
    let guest = FakeGuest::new();
    drop(mount(&guest, "work").unwrap());
    drop(mount(&guest, "work").unwrap());

    assert_eq!(guest.commands_starting_with("cd ").len(), 1);
    assert_eq!(guest.stop_signals(), 2);
    assert_eq!(guest.run_exits(), 2);
}

#[test]
fn test_missing_sshfs_creates_nothing() {
    let guest = FakeGuest::new().without_sshfs();

    let err = mount(&guest, "work").unwrap_err();
    assert!(matches!(err, MountError::MissingDependency { .. }));
    assert_eq!(guest.commands(), vec!["which sshfs"]);
    assert!(!guest.has_dir("/home/ubuntu/work"));
    assert!(guest.served().is_none());
}

#[test]
fn test_non_numeric_uid_stops_before_server() {
    let guest = FakeGuest::new().with_ids("ubuntu\n", "1000\n");

    let err = mount(&guest, "work").unwrap_err();
    assert!(matches!(err, MountError::MalformedResponse { .. }));
    assert!(guest.served().is_none());
    assert_eq!(guest.stop_signals(), 0);
    // Provisioning already happened and is left in place.
    assert!(guest.has_dir("/home/ubuntu/work"));
}

#[test]
fn test_home_lookup_failure() {
    let guest = FakeGuest::new().respond(
        "bash -c 'echo ${HOME}'",
        RemoteProcess::new(1, "", "bash: not found"),
    );

    match mount(&guest, "work").unwrap_err() {
        MountError::RemoteCommandFailed { command, stderr } => {
            assert_eq!(command, "bash -c 'echo ${HOME}'");
            assert_eq!(stderr, "bash: not found");
        }
        other => panic!("expected RemoteCommandFailed, got {other:?}"),
    }
}

#[test]
fn test_mount_from_worker_thread() {
    let guest = FakeGuest::new();
    let handle = {
        let guest = guest.clone();
        std::thread::spawn(move || {
            let mut mount = mount(&guest, "work").unwrap();
            assert!(mount.is_serving());
            mount.stop();
        })
    };
    handle.join().unwrap();

    assert_eq!(guest.stop_signals(), 1);
    assert_eq!(guest.run_exits(), 1);
}
