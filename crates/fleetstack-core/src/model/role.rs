//! ノードロール

use serde::{Deserialize, Serialize};
use std::fmt;

/// フリート内のノードロール
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// プライマリノード
    #[serde(rename = "RHUA")]
    Rhua,
    /// コンテンツ配信ノード
    #[serde(rename = "CDS")]
    Cds,
    /// ロードバランサ
    #[serde(rename = "HAProxy")]
    HaProxy,
    /// クライアント
    #[serde(rename = "CLI")]
    Cli,
    /// 共有ファイルシステム専用ノード
    #[serde(rename = "NFS")]
    Nfs,
    /// 名前解決ノード
    #[serde(rename = "DNS")]
    Dns,
    /// テストノード
    #[serde(rename = "TEST")]
    Test,
}

impl Role {
    /// `Role` タグの値
    pub fn tag(&self) -> &'static str {
        match self {
            Role::Rhua => "RHUA",
            Role::Cds => "CDS",
            Role::HaProxy => "HAProxy",
            Role::Cli => "CLI",
            Role::Nfs => "NFS",
            Role::Dns => "DNS",
            Role::Test => "TEST",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "RHUA" => Some(Role::Rhua),
            "CDS" => Some(Role::Cds),
            "HAProxy" => Some(Role::HaProxy),
            "CLI" => Some(Role::Cli),
            "NFS" => Some(Role::Nfs),
            "DNS" => Some(Role::Dns),
            "TEST" => Some(Role::Test),
            _ => None,
        }
    }

    /// inventory のセクション名
    pub fn section(&self) -> &'static str {
        match self {
            Role::HaProxy => "HAPROXY",
            other => other.tag(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
