pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 設定ファイルのパスを直接指定する環境変数
pub const CONFIG_ENV: &str = "FLEETSTACK_CONFIG";

/// システム全体の設定ファイル（既存環境との互換）
pub const SYSTEM_CONFIG: &str = "/etc/rhui_ec2.yaml";

/// リージョンごとのキーペア `[名前, 秘密鍵のパス]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct KeyPair {
    pub name: String,
    pub private_key_path: String,
}

impl From<(String, String)> for KeyPair {
    fn from((name, private_key_path): (String, String)) -> Self {
        Self {
            name,
            private_key_path,
        }
    }
}

impl From<KeyPair> for (String, String) {
    fn from(key: KeyPair) -> Self {
        (key.name, key.private_key_path)
    }
}

/// リージョンごとのネットワーク `[VPC ID, サブネット ID]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct SubnetPair {
    pub vpc_id: String,
    pub subnet_id: String,
}

impl From<(String, String)> for SubnetPair {
    fn from((vpc_id, subnet_id): (String, String)) -> Self {
        Self { vpc_id, subnet_id }
    }
}

impl From<SubnetPair> for (String, String) {
    fn from(pair: SubnetPair) -> Self {
        (pair.vpc_id, pair.subnet_id)
    }
}

/// 設定ファイルの内容
///
/// 認証情報はここでは扱わない（AWS SDK の標準の解決順に任せる）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub ssh: BTreeMap<String, KeyPair>,

    #[serde(default)]
    pub vpc: BTreeMap<String, SubnetPair>,

    /// イメージインデックス（RHEL*mapping*.json）のディレクトリ
    #[serde(default)]
    pub image_dir: Option<PathBuf>,

    /// 読み込み元（ファイルが無い場合は None）
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Settings {
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self> {
        // 空ファイルは null として解釈されるため既定値にする
        if content.trim().is_empty() {
            return Ok(Self {
                source: Some(path.to_path_buf()),
                ..Default::default()
            });
        }
        let mut settings: Settings =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        settings.source = Some(path.to_path_buf());
        Ok(settings)
    }

    pub fn key_pair(&self, region: &str) -> Option<&KeyPair> {
        self.ssh.get(region)
    }

    pub fn subnet(&self, region: &str) -> Option<&SubnetPair> {
        self.vpc.get(region)
    }
}

/// ユーザー単位の設定ファイル（~/.config/fleetstack/config.yaml）
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("fleetstack").join("config.yaml"))
}

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 引数で指定されたパス（存在しなければエラー）
/// 2. 環境変数 FLEETSTACK_CONFIG（存在しなければエラー）
/// 3. カレントディレクトリの fleetstack.yaml
/// 4. ~/.config/fleetstack/config.yaml
/// 5. /etc/rhui_ec2.yaml
///
/// どれも無ければ `Ok(None)`。
pub fn find_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(ConfigError::ConfigFileNotFound(path.to_path_buf()));
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::ConfigFileNotFound(path));
    }

    let local = std::env::current_dir()?.join("fleetstack.yaml");
    if local.exists() {
        return Ok(Some(local));
    }

    if let Some(user) = user_config_path().filter(|path| path.exists()) {
        return Ok(Some(user));
    }

    let system = PathBuf::from(SYSTEM_CONFIG);
    if system.exists() {
        return Ok(Some(system));
    }

    Ok(None)
}

/// 設定を読み込む（ファイルが無ければ既定値）
pub fn load(explicit: Option<&Path>) -> Result<Settings> {
    match find_config_file(explicit)? {
        Some(path) => {
            debug!(path = %path.display(), "Loading settings");
            let content = std::fs::read_to_string(&path)?;
            Settings::from_yaml(&content, &path)
        }
        None => {
            debug!("No settings file found, using defaults");
            Ok(Settings::default())
        }
    }
}
