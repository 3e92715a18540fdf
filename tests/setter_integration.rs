//! Cross-module integration tests exercising the setter against a real
//! filesystem (`tempfile::tempdir()`), rather than `MemoryFs` — the add/
//! set/remove round trip and atomic-commit rollback both depend on real
//! rename/symlink semantics `MemoryFs` only approximates.

use device_shell::fs::RealFs;
use device_shell::setter::atomic::{commit_files, FileKind, PlannedFile};
use device_shell::setter::validators::{Pair, ValueType};
use device_shell::setter::{run_add, run_remove, run_set, InputValue};
use device_shell::userdb::FakeUserDb;

fn pairs() -> Vec<Pair> {
    vec![
        Pair { key: "name".to_string(), suffix: String::new(), type_tag: ValueType::Index, optional: false, is_index: true },
        Pair { key: "port".to_string(), suffix: String::new(), type_tag: ValueType::Port, optional: false, is_index: false },
    ]
}

#[test]
fn add_set_remove_round_trip_against_a_real_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let sysconf_root = dir.path().join("sysconf").join("show");
    std::fs::create_dir_all(&sysconf_root).unwrap();
    let sysconf_root = sysconf_root.to_str().unwrap();

    let fs = RealFs::new();
    let userdb = FakeUserDb::new();
    let pairs = pairs();

    let add_values = vec![
        InputValue { key: "name".to_string(), raw_value: "7".to_string() },
        InputValue { key: "port".to_string(), raw_value: "443".to_string() },
    ];
    let row_id = run_add(&fs, &userdb, sysconf_root, &pairs, &add_values, 0o022).unwrap();

    let row_dir = format!("{sysconf_root}/{row_id}");
    assert_eq!(std::fs::read_to_string(format!("{row_dir}/name")).unwrap(), "7");
    assert_eq!(std::fs::read_to_string(format!("{row_dir}/port")).unwrap(), "443");
    assert!(std::path::Path::new(&format!("{row_dir}/added")).exists());
    let link_target = std::fs::read_link(format!("{sysconf_root}/7")).unwrap();
    assert_eq!(link_target.to_str().unwrap(), row_id);

    let set_values = vec![
        InputValue { key: "name".to_string(), raw_value: "7".to_string() },
        InputValue { key: "port".to_string(), raw_value: "8443".to_string() },
    ];
    run_set(&fs, &userdb, sysconf_root, "7", &pairs, &set_values, 0o022).unwrap();
    assert_eq!(std::fs::read_to_string(format!("{row_dir}/port")).unwrap(), "8443");
    assert!(std::path::Path::new(&format!("{row_dir}/updated")).exists());

    run_remove(&fs, sysconf_root, "7", &["name".to_string(), "port".to_string(), "added".to_string(), "updated".to_string()]).unwrap();
    assert!(!std::path::Path::new(&row_dir).exists());
    assert!(!std::path::Path::new(&format!("{sysconf_root}/7")).exists());
}

#[test]
fn add_rolls_back_the_row_directory_when_validation_fails() {
    let dir = tempfile::tempdir().unwrap();
    let sysconf_root = dir.path().join("sysconf").join("show");
    std::fs::create_dir_all(&sysconf_root).unwrap();
    let sysconf_root = sysconf_root.to_str().unwrap();

    let fs = RealFs::new();
    let userdb = FakeUserDb::new();
    let pairs = pairs();

    let bad_values = vec![
        InputValue { key: "name".to_string(), raw_value: "7".to_string() },
        InputValue { key: "port".to_string(), raw_value: "not-a-port".to_string() },
    ];
    let err = run_add(&fs, &userdb, sysconf_root, &pairs, &bad_values, 0o022);
    assert!(err.is_err());

    let remaining: Vec<_> = std::fs::read_dir(sysconf_root).unwrap().collect();
    assert!(remaining.is_empty(), "row directory should have been rolled back entirely");
}

#[test]
fn atomic_commit_restores_backup_on_real_filesystem_when_a_later_file_fails_to_stage() {
    let dir = tempfile::tempdir().unwrap();
    let existing = dir.path().join("name");
    std::fs::write(&existing, "old").unwrap();

    let missing_subdir_destination = dir.path().join("missing_subdir").join("port");

    let files = vec![
        PlannedFile {
            key: "name".to_string(),
            destination_path: existing.to_str().unwrap().to_string(),
            value: "new".to_string(),
            kind: FileKind::Regular,
            is_index: false,
        },
        PlannedFile {
            key: "port".to_string(),
            destination_path: missing_subdir_destination.to_str().unwrap().to_string(),
            value: "443".to_string(),
            kind: FileKind::Regular,
            is_index: false,
        },
    ];

    let fs = RealFs::new();
    let err = commit_files(&fs, &files, 0o022);
    assert!(err.is_err(), "staging into a nonexistent directory should fail");

    assert_eq!(std::fs::read_to_string(&existing).unwrap(), "old", "first file's backup should have been restored");
    assert!(!existing.with_extension("backup").exists());
}
