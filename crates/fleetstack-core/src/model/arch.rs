//! アーキテクチャとインスタンスサイズ

use crate::error::{FleetError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// インスタンスのCPUアーキテクチャ
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Architecture {
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "arm64")]
    Arm64,
}

impl Architecture {
    /// プライマリアーキテクチャ（リージョン別マッピングで AMI を引く）
    pub const PRIMARY: Architecture = Architecture::X86_64;

    /// 既知のアーキテクチャ（「アーキテクチャごとに1台」の展開順）
    pub const ALL: [Architecture; 2] = [Architecture::Arm64, Architecture::X86_64];

    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::X86_64 => "x86_64",
            Architecture::Arm64 => "arm64",
        }
    }

    pub fn is_primary(&self) -> bool {
        *self == Self::PRIMARY
    }

    /// カンマ区切りのアーキテクチャリストをパース
    ///
    /// 空要素は `None`（プライマリにフォールバック）として残す。
    pub fn parse_list(list: &str) -> Result<Vec<Option<Architecture>>> {
        list.split(',')
            .map(|item| {
                let item = item.trim();
                if item.is_empty() {
                    Ok(None)
                } else {
                    item.parse().map(Some)
                }
            })
            .collect()
    }
}

impl FromStr for Architecture {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "x86_64" => Ok(Architecture::X86_64),
            "arm64" => Ok(Architecture::Arm64),
            other => Err(FleetError::UnknownArchitecture(other.to_string())),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
