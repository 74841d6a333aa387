//! RHEL メジャーバージョン

use crate::error::{FleetError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// OSタグの切り詰め幅（既存の inventory 利用側との互換のため）
const TRUNCATED_TAG_LEN: usize = 5;

/// OSタグの表記スタイル
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsTagStyle {
    /// 先頭5文字に切り詰める（RHEL10 → RHEL1）
    #[default]
    Truncated,
    /// ラベルをそのまま使う
    Full,
}

/// RHEL メジャーバージョン（5〜10）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RhelVersion(u8);

impl RhelVersion {
    pub const MIN: u8 = 5;
    pub const MAX: u8 = 10;

    /// 管理ノード（RHUA/CDS/HAProxy 等）で使うバージョン
    pub const SERVER: RhelVersion = RhelVersion(8);

    pub fn new(major: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&major) {
            Ok(Self(major))
        } else {
            Err(FleetError::UnsupportedRhelVersion(major.to_string()))
        }
    }

    /// サポートしている全バージョン
    pub fn all() -> impl Iterator<Item = RhelVersion> {
        (Self::MIN..=Self::MAX).map(RhelVersion)
    }

    pub fn major(&self) -> u8 {
        self.0
    }

    /// マッピング名・タグに使うラベル（例: "RHEL8"）
    pub fn label(&self) -> String {
        format!("RHEL{}", self.0)
    }

    /// OSタグ値
    pub fn tag(&self, style: OsTagStyle) -> String {
        let label = self.label();
        match style {
            OsTagStyle::Truncated => label.chars().take(TRUNCATED_TAG_LEN).collect(),
            OsTagStyle::Full => label,
        }
    }

    /// OSタグ値からバージョンを復元
    ///
    /// 切り詰められた "RHEL1" は RHEL10 として扱う。
    pub fn from_tag(tag: &str) -> Option<Self> {
        let digits = tag.strip_prefix("RHEL")?;
        match digits.parse::<u8>().ok()? {
            1 => Some(Self(10)),
            major => Self::new(major).ok(),
        }
    }

    /// 現行の ansible で構成できない旧バージョン
    pub fn is_legacy(&self) -> bool {
        self.0 <= 6
    }

    /// root 以外のログインユーザーを持たないバージョン
    pub fn requires_root_login(&self) -> bool {
        self.0 == 5
    }
}

impl TryFrom<u8> for RhelVersion {
    type Error = FleetError;

    fn try_from(major: u8) -> Result<Self> {
        Self::new(major)
    }
}

impl From<RhelVersion> for u8 {
    fn from(version: RhelVersion) -> u8 {
        version.0
    }
}

impl FromStr for RhelVersion {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.trim().trim_start_matches("RHEL");
        let major = digits
            .parse::<u8>()
            .map_err(|_| FleetError::UnsupportedRhelVersion(s.to_string()))?;
        Self::new(major)
    }
}

impl fmt::Display for RhelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RHEL{}", self.0)
    }
}
