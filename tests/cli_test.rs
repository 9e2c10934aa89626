use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::prelude::*;
use predicates::prelude::*;

/// Run cipherpost against an isolated home directory.
fn cipherpost(home: &assert_fs::TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("cipherpost");
    cmd.arg("--home")
        .arg(home.path())
        .env("NO_COLOR", "1")
        .env_remove("CIPHERPOST_LOG")
        .env_remove("CIPHERPOST_HOME");
    cmd
}

fn init(home: &assert_fs::TempDir) {
    cipherpost(home).arg("init").assert().success();
}

fn generate(home: &assert_fs::TempDir, user_id: &str) {
    cipherpost(home)
        .args(["keys", "generate", user_id, "--no-passphrase"])
        .assert()
        .success();
}

/// Long ID of the first listed key with this user ID.
fn key_id(home: &assert_fs::TempDir, user_id: &str) -> String {
    let out = cipherpost(home).args(["keys", "list"]).output().unwrap();
    let listing = String::from_utf8(out.stdout).unwrap();
    listing
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>())
        .find(|cols| cols.get(2) == Some(&user_id))
        .map(|cols| cols[1].to_string())
        .unwrap()
}

/// Armored secret key protected by `passphrase`.
fn locked_secret_key(user_id: &str, passphrase: &str) -> String {
    use sequoia_openpgp::cert::CertBuilder;
    use sequoia_openpgp::serialize::SerializeInto;

    let (cert, _) = CertBuilder::general_purpose(None, Some(user_id))
        .set_password(Some(passphrase.into()))
        .generate()
        .unwrap();
    String::from_utf8(cert.as_tsk().armored().to_vec().unwrap()).unwrap()
}

fn encrypt(home: &assert_fs::TempDir, args: &[&str], plaintext: &str) -> String {
    let out = cipherpost(home)
        .arg("encrypt")
        .args(args)
        .write_stdin(plaintext)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    String::from_utf8(out.stdout).unwrap()
}

// ─── Init ───────────────────────────────────────────────────────

#[test]
fn init_creates_config_and_keyring() {
    let home = assert_fs::TempDir::new().unwrap();

    cipherpost(&home)
        .arg("init")
        .assert()
        .success()
        .stderr(predicate::str::contains("Generated config.toml"));

    home.child("config.toml").assert(predicate::path::exists());
    home.child("keyring.json")
        .assert(predicate::str::contains("\"version\": 1"));
}

#[test]
fn init_twice_fails() {
    let home = assert_fs::TempDir::new().unwrap();
    init(&home);

    cipherpost(&home)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn commands_need_init() {
    let home = assert_fs::TempDir::new().unwrap();

    cipherpost(&home)
        .arg("decrypt")
        .write_stdin("whatever")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cipherpost init"));
}

// ─── Keys ───────────────────────────────────────────────────────

#[test]
fn generated_key_is_listed() {
    let home = assert_fs::TempDir::new().unwrap();
    init(&home);
    generate(&home, "alice");

    cipherpost(&home)
        .args(["keys", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sec").and(predicate::str::contains("alice")))
        .stdout(predicate::str::contains("[locked]").not());
}

#[test]
fn empty_keyring_warns() {
    let home = assert_fs::TempDir::new().unwrap();
    init(&home);

    cipherpost(&home)
        .args(["keys", "list"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Keyring is empty"));
}

#[test]
fn remove_unknown_key_fails() {
    let home = assert_fs::TempDir::new().unwrap();
    init(&home);

    cipherpost(&home)
        .args(["keys", "remove", "DEADBEEFDEADBEEF"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn exported_public_key_imports_elsewhere() {
    let alice_home = assert_fs::TempDir::new().unwrap();
    let bob_home = assert_fs::TempDir::new().unwrap();
    init(&alice_home);
    init(&bob_home);
    generate(&alice_home, "alice");

    let out = cipherpost(&alice_home)
        .args(["keys", "export", "alice"])
        .output()
        .unwrap();
    let public = String::from_utf8(out.stdout).unwrap();
    assert!(public.contains("BEGIN PGP PUBLIC KEY BLOCK"));

    let file = bob_home.child("alice.asc");
    file.write_str(&public).unwrap();

    cipherpost(&bob_home)
        .args(["keys", "import"])
        .arg(file.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Imported public key"));

    cipherpost(&bob_home)
        .args(["keys", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pub").and(predicate::str::contains("alice")));
}

// ─── Encrypt / decrypt ──────────────────────────────────────────

#[test]
fn signed_message_round_trip() {
    let home = assert_fs::TempDir::new().unwrap();
    init(&home);
    generate(&home, "alice");
    generate(&home, "bob");

    let armored = encrypt(&home, &["--to", "bob", "--sign-with", "alice"], "meet at noon");
    assert!(armored.contains("BEGIN PGP MESSAGE"));

    cipherpost(&home)
        .arg("decrypt")
        .write_stdin(armored)
        .assert()
        .success()
        .stdout(predicate::str::contains("meet at noon"))
        .stderr(predicate::str::contains("valid signature"));
}

#[test]
fn json_output_reports_status() {
    let home = assert_fs::TempDir::new().unwrap();
    init(&home);
    generate(&home, "alice");

    let armored = encrypt(&home, &["--to", "alice", "--sign-with", "alice"], "hi");

    cipherpost(&home)
        .args(["decrypt", "--json"])
        .write_stdin(armored)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"valid\""))
        .stdout(predicate::str::contains("\"message\": \"hi\""))
        .stdout(predicate::str::contains("PRIVATE KEY").not());
}

#[test]
fn unsigned_message_has_no_signature() {
    let home = assert_fs::TempDir::new().unwrap();
    init(&home);
    generate(&home, "bob");

    let armored = encrypt(&home, &["--to", "bob"], "plain news");

    cipherpost(&home)
        .args(["decrypt", "--json"])
        .write_stdin(armored)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"no_signature\""));
}

#[test]
fn hidden_recipient_round_trip() {
    let home = assert_fs::TempDir::new().unwrap();
    init(&home);
    generate(&home, "bob");

    let armored = encrypt(&home, &["--hidden-to", "bob"], "nobody sees who");

    cipherpost(&home)
        .arg("decrypt")
        .write_stdin(armored)
        .assert()
        .success()
        .stdout(predicate::str::contains("nobody sees who"));
}

#[test]
fn message_for_someone_else_cannot_be_decrypted() {
    let sender = assert_fs::TempDir::new().unwrap();
    let outsider = assert_fs::TempDir::new().unwrap();
    init(&sender);
    init(&outsider);
    generate(&sender, "bob");
    generate(&outsider, "eve");

    let armored = encrypt(&sender, &["--to", "bob"], "not for eve");

    cipherpost(&outsider)
        .arg("decrypt")
        .write_stdin(armored)
        .assert()
        .failure()
        .stdout(predicate::str::contains("not for eve").not());
}

#[test]
fn encrypt_to_unknown_key_fails() {
    let home = assert_fs::TempDir::new().unwrap();
    init(&home);

    cipherpost(&home)
        .args(["encrypt", "--to", "nobody"])
        .write_stdin("hi")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn encrypt_without_recipients_fails() {
    let home = assert_fs::TempDir::new().unwrap();
    init(&home);

    cipherpost(&home)
        .arg("encrypt")
        .write_stdin("hi")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no recipients"));
}

#[test]
fn decrypt_several_files() {
    let home = assert_fs::TempDir::new().unwrap();
    init(&home);
    generate(&home, "bob");

    let first = home.child("first.asc");
    let second = home.child("second.asc");
    first
        .write_str(&encrypt(&home, &["--to", "bob"], "one"))
        .unwrap();
    second
        .write_str(&encrypt(&home, &["--to", "bob"], "two"))
        .unwrap();

    cipherpost(&home)
        .arg("decrypt")
        .arg(first.path())
        .arg(second.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("one").and(predicate::str::contains("two")));
}

#[test]
fn one_bad_file_fails_the_batch() {
    let home = assert_fs::TempDir::new().unwrap();
    init(&home);
    generate(&home, "bob");

    let good = home.child("good.asc");
    let bad = home.child("bad.txt");
    good.write_str(&encrypt(&home, &["--to", "bob"], "fine"))
        .unwrap();
    bad.write_str("just some text").unwrap();

    cipherpost(&home)
        .arg("decrypt")
        .arg(good.path())
        .arg(bad.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("fine"))
        .stderr(predicate::str::contains("1 of 2 messages"));
}

#[test]
fn locked_key_opens_with_env_passphrase() {
    let home = assert_fs::TempDir::new().unwrap();
    init(&home);

    let key = home.child("carol.asc");
    key.write_str(&locked_secret_key("carol", "s3cret")).unwrap();
    cipherpost(&home)
        .args(["keys", "import"])
        .arg(key.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Imported secret key"));

    cipherpost(&home)
        .args(["keys", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[locked]"));

    let id = key_id(&home, "carol");
    let armored = encrypt(&home, &["--to", "carol"], "behind a lock");

    cipherpost(&home)
        .arg("decrypt")
        .write_stdin(armored.clone())
        .assert()
        .failure();

    cipherpost(&home)
        .arg("decrypt")
        .env(format!("CIPHERPOST_PASSPHRASE_{id}"), "s3cret")
        .write_stdin(armored)
        .assert()
        .success()
        .stdout(predicate::str::contains("behind a lock"));
}

// ─── Sign / check ───────────────────────────────────────────────

#[test]
fn cleartext_signature_verifies() {
    let home = assert_fs::TempDir::new().unwrap();
    init(&home);
    generate(&home, "alice");

    let out = cipherpost(&home)
        .args(["sign", "--with", "alice"])
        .write_stdin("signed words")
        .output()
        .unwrap();
    assert!(out.status.success());
    let signed = String::from_utf8(out.stdout).unwrap();
    assert!(signed.contains("BEGIN PGP SIGNED MESSAGE"));

    cipherpost(&home)
        .arg("decrypt")
        .write_stdin(signed)
        .assert()
        .success()
        .stdout(predicate::str::contains("signed words"))
        .stderr(predicate::str::contains("valid signature"));
}

#[test]
fn check_rejects_plain_text() {
    let home = assert_fs::TempDir::new().unwrap();

    cipherpost(&home)
        .arg("check")
        .write_stdin("hello there")
        .assert()
        .failure();
}

#[test]
fn check_accepts_encrypted_message() {
    let home = assert_fs::TempDir::new().unwrap();
    init(&home);
    generate(&home, "bob");
    let armored = encrypt(&home, &["--to", "bob"], "hi");

    cipherpost(&home)
        .arg("check")
        .write_stdin(armored)
        .assert()
        .success()
        .stdout(predicate::str::contains("encrypted"));
}

#[test]
fn check_accepts_cleartext_signed_file() {
    let home = assert_fs::TempDir::new().unwrap();
    init(&home);
    generate(&home, "alice");

    let out = cipherpost(&home)
        .args(["sign", "--with", "alice"])
        .write_stdin("signed words")
        .output()
        .unwrap();
    let file = home.child("note.asc");
    file.write_str(&String::from_utf8(out.stdout).unwrap())
        .unwrap();

    cipherpost(&home)
        .arg("check")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("cleartext-signed message"));
}
