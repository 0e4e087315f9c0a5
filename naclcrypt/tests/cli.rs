use assert_cmd::Command;
use predicates::prelude::*;

fn cmd(db: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("naclcrypt").unwrap();
    cmd.arg("--db").arg(db);
    cmd
}

#[test]
fn generate_defaults_to_public_half_only() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("keyring.db");

    // Neither -p nor -P given: -p is implied (spec.md's "key operations" rule).
    cmd(&db).args(["generate", "alice"]).assert().success();

    cmd(&db)
        .args(["export", "alice", "-P"])
        .assert()
        .failure()
        .code(1);
    cmd(&db)
        .args(["export", "alice", "-p"])
        .assert()
        .success();
}

#[test]
fn generate_with_both_flags_stores_a_full_pair_and_list_shows_it() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("keyring.db");

    cmd(&db)
        .args(["generate", "alice", "-p", "-P"])
        .assert()
        .success();

    // Without -p/-P, list prints only the name.
    cmd(&db).arg("list").assert().success().stdout("alice\n");

    // With -p -P, each column carries 64 hex characters (32-byte keys).
    let output = cmd(&db)
        .args(["list", "-p", "-P"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let line = String::from_utf8(output).unwrap();
    let mut cols = line.trim_end().split('\t');
    assert_eq!(cols.next(), Some("alice"));
    assert_eq!(cols.next().unwrap().len(), 64);
    assert_eq!(cols.next().unwrap().len(), 64);
    assert_eq!(cols.next(), None);
}

#[test]
fn delete_public_then_private_removes_the_entry() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("keyring.db");

    cmd(&db)
        .args(["generate", "alice", "-p", "-P"])
        .assert()
        .success();
    cmd(&db)
        .args(["delete", "alice", "-p"])
        .assert()
        .success();
    cmd(&db)
        .args(["list", "-p", "-P"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "alice\t{}\t",
            "_".repeat(64)
        )));

    cmd(&db)
        .args(["delete", "alice", "-P"])
        .assert()
        .success();
    cmd(&db)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn generate_without_force_rejects_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("keyring.db");

    cmd(&db).args(["generate", "alice"]).assert().success();
    cmd(&db)
        .args(["generate", "alice"])
        .assert()
        .failure()
        .code(65);

    cmd(&db)
        .args(["generate", "alice", "-f"])
        .assert()
        .success();
}

#[test]
fn delete_missing_entry_without_force_fails_with_exit_code_one() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("keyring.db");

    cmd(&db).arg("generate").arg("nothing-here").assert().success();
    cmd(&db)
        .args(["delete", "ghost"])
        .assert()
        .failure()
        .code(1);

    cmd(&db)
        .args(["delete", "ghost", "-f"])
        .assert()
        .success();
}

#[test]
fn encrypt_decrypt_round_trip_recovers_plaintext() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("keyring.db");

    cmd(&db)
        .args(["generate", "alice", "-p", "-P"])
        .assert()
        .success();
    cmd(&db)
        .args(["generate", "bob", "-p", "-P"])
        .assert()
        .success();

    let ciphertext = cmd(&db)
        .args(["encrypt", "-s", "alice", "-t", "bob"])
        .write_stdin("hello")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    // 72-byte header + one 16-byte MAC-only final chunk covering "hello".
    assert_eq!(ciphertext.len(), 72 + 16 + 5);

    cmd(&db)
        .args(["decrypt", "-s", "alice", "-t", "bob"])
        .write_stdin(ciphertext)
        .assert()
        .success()
        .stdout("hello");
}

#[test]
fn tampered_ciphertext_fails_decryption_and_emits_no_plaintext() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("keyring.db");

    cmd(&db)
        .args(["generate", "alice", "-p", "-P"])
        .assert()
        .success();
    cmd(&db)
        .args(["generate", "bob", "-p", "-P"])
        .assert()
        .success();

    let mut ciphertext = cmd(&db)
        .args(["encrypt", "-s", "alice", "-t", "bob"])
        .write_stdin("hello")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let last = ciphertext.len() - 1;
    ciphertext[last] ^= 0xff;

    cmd(&db)
        .args(["decrypt", "-s", "alice", "-t", "bob"])
        .write_stdin(ciphertext)
        .assert()
        .failure()
        .code(76)
        .stdout(predicate::str::is_empty());
}

#[test]
fn export_emits_lowercase_p_tag_for_public_and_uppercase_p_tag_for_private() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("keyring.db");

    cmd(&db)
        .args(["generate", "alice", "-p", "-P"])
        .assert()
        .success();

    let output = cmd(&db)
        .args(["export", "alice", "-p", "-P"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    let mut lines = text.lines();
    let public_line = lines.next().unwrap();
    let private_line = lines.next().unwrap();

    assert!(public_line.starts_with("p:"));
    assert_eq!(public_line.len(), 2 + 64);
    assert!(private_line.starts_with("P:"));
    assert_eq!(private_line.len(), 2 + 64);
}

#[test]
fn import_round_trips_an_exported_pair_into_a_fresh_name() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("keyring.db");

    cmd(&db)
        .args(["generate", "alice", "-p", "-P"])
        .assert()
        .success();
    let exported = cmd(&db)
        .args(["export", "alice", "-p", "-P"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    cmd(&db)
        .args(["import", "bob", "-p", "-P"])
        .write_stdin(exported.clone())
        .assert()
        .success();

    let reexported = cmd(&db)
        .args(["export", "bob", "-p", "-P"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(exported, reexported);
}

#[test]
fn import_rejects_a_line_with_the_wrong_tag_case_as_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("keyring.db");

    // Lowercase-only hex with an unrecognized tag letter.
    cmd(&db)
        .args(["import", "alice", "-p"])
        .write_stdin("x:deadbeef\n")
        .assert()
        .failure()
        .code(66);
}
