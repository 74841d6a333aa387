//! Inventory 出力
//!
//! 解決済みホストをロールごとのセクションにまとめた INI 形式の文書を生成し、
//! 書き出した後に読み直して欠損行がないか検証する。

use crate::error::{FleetError, Result};
use crate::model::{FileSystemMode, HostRecord, Role, Topology};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// セクション構成を決めるトポロジー情報
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventoryLayout {
    pub fs_mode: FileSystemMode,
    /// 専用の名前解決ノードがあるか
    pub dedicated_dns: bool,
    /// クライアントを要求したか
    pub clients: bool,
    /// テストノードを要求したか
    pub test: bool,
}

impl InventoryLayout {
    pub fn from_topology(topology: &Topology) -> Self {
        Self {
            fs_mode: topology.fs_mode,
            dedicated_dns: topology.has_role(Role::Dns),
            clients: topology.has_role(Role::Cli),
            test: topology.has_role(Role::Test),
        }
    }
}

/// 各ホスト行に付ける接続情報
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostDecorations {
    pub private_key_path: Option<String>,
    pub ssh_extra_args: Option<String>,
}

/// 書き出し後の検証結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryValidation {
    /// ホスト名が欠けた行（1始まり）
    pub bad_lines: Vec<usize>,
}

impl InventoryValidation {
    pub fn is_ok(&self) -> bool {
        self.bad_lines.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct InventoryReport {
    pub path: PathBuf,
    pub document: String,
    pub validation: InventoryValidation,
}

/// セクション名と対象ロール（先頭が優先）
fn sections(layout: &InventoryLayout) -> Vec<(&'static str, Role)> {
    let mut sections = vec![("RHUA", Role::Rhua)];
    match layout.fs_mode {
        FileSystemMode::Rhua => sections.push(("NFS", Role::Rhua)),
        FileSystemMode::Dedicated => sections.push(("NFS", Role::Nfs)),
        FileSystemMode::None => {}
    }
    sections.push((Role::Cds.section(), Role::Cds));
    if layout.dedicated_dns {
        sections.push(("DNS", Role::Dns));
    } else {
        sections.push(("DNS", Role::Rhua));
    }
    if layout.clients {
        sections.push((Role::Cli.section(), Role::Cli));
    }
    if layout.test {
        sections.push((Role::Test.section(), Role::Test));
    }
    sections.push((Role::HaProxy.section(), Role::HaProxy));
    sections
}

fn host_line(record: &HostRecord, decorations: &HostDecorations) -> String {
    let mut line = String::new();
    let os = record.rhel_version();

    if record.role == Some(Role::Cli) && os.is_some_and(|v| v.is_legacy()) {
        line.push('#');
    }
    line.push_str(&record.public_hostname);
    if record.role == Some(Role::Cli) && os.is_some_and(|v| v.requires_root_login()) {
        line.push_str(" ansible_ssh_user=root");
    }
    if let Some(key) = &decorations.private_key_path {
        line.push_str(&format!(" ansible_ssh_private_key_file={}", key));
    }
    if let Some(args) = &decorations.ssh_extra_args {
        line.push_str(&format!(" ansible_ssh_extra_args=\"{}\"", args));
    }
    line
}

/// 末尾の連番を数値として比較する並び順キー（cds2 < cds10）
fn sort_key(record: &HostRecord) -> (Option<(&str, Option<u64>)>, &str) {
    let name = record.name_tag().map(|name| {
        let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
        (stem, name[stem.len()..].parse().ok())
    });
    (name, record.instance_id.as_str())
}

/// Inventory 文書を生成
///
/// セクション内は Name タグ、インスタンス ID の順に並べる。
pub fn render(
    records: &[HostRecord],
    layout: &InventoryLayout,
    decorations: &HostDecorations,
) -> String {
    let mut sorted: Vec<&HostRecord> = records.iter().collect();
    sorted.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    let mut document = String::new();
    for (index, (section, role)) in sections(layout).into_iter().enumerate() {
        if index > 0 {
            document.push('\n');
        }
        document.push_str(&format!("[{}]\n", section));
        for record in sorted.iter().filter(|r| r.role == Some(role)) {
            document.push_str(&host_line(record, decorations));
            document.push('\n');
        }
    }
    document
}

/// 先頭が空白の行（ホスト名が欠けた行）を検出
pub fn validate(document: &str) -> InventoryValidation {
    let bad_lines = document
        .lines()
        .enumerate()
        .filter(|(_, line)| line.starts_with(char::is_whitespace))
        .map(|(index, _)| index + 1)
        .collect();
    InventoryValidation { bad_lines }
}

/// 生成・書き出し・読み直し検証
///
/// 検証に失敗してもファイルは残す（手動修正のため）。
#[tracing::instrument(skip(records, layout, decorations), fields(hosts = records.len()))]
pub fn emit(
    records: &[HostRecord],
    layout: &InventoryLayout,
    decorations: &HostDecorations,
    path: &Path,
) -> Result<InventoryReport> {
    let io_error = |e: std::io::Error| FleetError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let document = render(records, layout, decorations);
    std::fs::write(path, &document).map_err(io_error)?;

    let written = std::fs::read_to_string(path).map_err(io_error)?;
    let validation = validate(&written);

    if validation.is_ok() {
        info!(path = %path.display(), "Inventory written");
    } else {
        warn!(
            path = %path.display(),
            bad_lines = ?validation.bad_lines,
            "Inventory has entries without hostname"
        );
    }

    Ok(InventoryReport {
        path: path.to_path_buf(),
        document: written,
        validation,
    })
}
