#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// イメージインデックスと空の設定ファイルを置いた作業ディレクトリ
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("RHEL8mapping.json"),
        r#"{"eu-west-1": {"AMI": "ami-rhel8"}, "us-east-1": {"AMI": "ami-rhel8-us"}}"#,
    )
    .unwrap();
    fs::write(dir.path().join("fleetstack.yaml"), "").unwrap();
    dir
}

fn dry_run(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("fleetstack").unwrap();
    cmd.current_dir(dir)
        .env_remove("FLEETSTACK_CONFIG")
        .arg("create")
        .arg("--dry-run")
        .arg("--config")
        .arg(dir.join("fleetstack.yaml"))
        .arg("--image-dir")
        .arg(dir)
        .arg("--key-pair-name")
        .arg("jdoe-eu");
    cmd
}

/// ヘルプが表示されることを確認
#[test]
fn test_help() {
    Command::cargo_bin("fleetstack")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("validate"));
}

/// バージョン情報が表示されることを確認
#[test]
fn test_version() {
    Command::cargo_bin("fleetstack")
        .unwrap()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fleetstack"));
}

#[test]
fn test_create_help_lists_flags() {
    Command::cargo_bin("fleetstack")
        .unwrap()
        .args(["create", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--cli-arch"))
        .stdout(predicate::str::contains("--ami-override"));
}

/// 正常な inventory の検証
#[test]
fn test_validate_good_inventory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hosts.cfg");
    fs::write(
        &path,
        "[RHUA]\nrhua.example.com\n\n[CDS]\ncds.example.com\n\n[HAPROXY]\nhap.example.com\n",
    )
    .unwrap();

    Command::cargo_bin("fleetstack")
        .unwrap()
        .arg("validate")
        .arg(&path)
        .assert()
        .success();
}

/// ホスト名が欠けた行は終了コード 2
#[test]
fn test_validate_bad_inventory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hosts.cfg");
    fs::write(
        &path,
        "[RHUA]\nrhua.example.com\n\n[CDS]\n ansible_ssh_private_key_file=/x\n",
    )
    .unwrap();

    Command::cargo_bin("fleetstack")
        .unwrap()
        .arg("validate")
        .arg(&path)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Missing hostname on line 5!"));
}

#[test]
fn test_validate_missing_file() {
    Command::cargo_bin("fleetstack")
        .unwrap()
        .args(["validate", "/nonexistent/hosts.cfg"])
        .assert()
        .failure();
}

/// dry-run はテンプレートを表示するだけでクラウドを呼ばない
#[test]
fn test_create_dry_run_prints_template() {
    let dir = workspace();

    dry_run(dir.path())
        .args(["--cds", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"AWSTemplateFormatVersion\""))
        .stdout(predicate::str::contains("\"RHUIsecuritygroup\""))
        .stdout(predicate::str::contains("jdoe_nfs_rhui_cds2"))
        .stdout(predicate::str::contains("RHUI with 2 CDS and 1 HAProxy nodes"));

    assert!(!dir.path().join("hosts_nfs_rhui.cfg").exists());
}

#[test]
fn test_create_dry_run_subnet_adds_elastic_ips() {
    let dir = workspace();

    dry_run(dir.path())
        .args(["--vpc-id", "vpc-1", "--subnet-id", "subnet-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"rhuaEIP\""))
        .stdout(predicate::str::contains("\"SubnetId\""));
}

/// 設定エラーはクラウド呼び出し前に失敗する
#[test]
fn test_create_rejects_mismatched_network() {
    let dir = workspace();

    dry_run(dir.path())
        .args(["--vpc-id", "vpc-1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("subnet_id"));
}

#[test]
fn test_create_rejects_arm_clients_without_subnet() {
    let dir = workspace();

    dry_run(dir.path())
        .args(["--no-vpc", "--cli", "9=1", "--cli-arch", "9=arm64"])
        .assert()
        .code(1);
}

#[test]
fn test_create_missing_image_index() {
    let dir = workspace();

    dry_run(dir.path())
        .args(["--cli", "9=1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("RHEL9mapping.json"));
}

#[test]
fn test_create_ami_override_skips_index() {
    let dir = workspace();

    dry_run(dir.path())
        .args(["--cli", "9=1", "--ami-override", "9=ami-rhel9-custom"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ami-rhel9-custom"))
        .stdout(predicate::str::contains("jdoe_nfs_rhui_rhel9cli"));
}
