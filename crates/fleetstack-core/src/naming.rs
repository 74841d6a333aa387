//! リソース名・ファイル名の生成

use crate::error::{FleetError, Result};
use crate::model::FileSystemMode;

/// キーペア名から識別子の断片を取り出す（先頭の英字の並び）
///
/// 例: "jdoe-eu-west" → "jdoe"
pub fn identity_fragment(key_pair_name: &str) -> Result<String> {
    let fragment: String = key_pair_name
        .chars()
        .skip_while(|c| !c.is_ascii_alphabetic())
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();

    if fragment.is_empty() {
        return Err(FleetError::InvalidConfig(format!(
            "キーペア名 '{}' に英字が含まれていません",
            key_pair_name
        )));
    }
    Ok(fragment)
}

fn join_parts(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// `Name` タグの値
pub fn resource_name(
    identity: &str,
    fs_mode: FileSystemMode,
    stack_name: &str,
    logical_name: &str,
) -> String {
    join_parts(&[identity, fs_mode.fragment(), stack_name, logical_name])
}

/// デフォルトの inventory ファイル名
pub fn inventory_file_name(fs_mode: FileSystemMode, stack_name: &str) -> String {
    format!("{}.cfg", join_parts(&["hosts", fs_mode.fragment(), stack_name]))
}

/// スタック識別子
pub fn stack_id(identity: &str, stack_name: &str, suffix: &str) -> String {
    format!("STACK-{}-{}-{}", identity, stack_name, suffix)
}
