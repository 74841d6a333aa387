//! トポロジーモデル
//!
//! 起動するロール・台数・アーキテクチャ・ネットワーク配置を表す。

use super::arch::Architecture;
use super::os::RhelVersion;
use super::role::Role;
use crate::error::{FleetError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// ロールごとの台数指定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Count {
    /// 固定台数
    Fixed(u32),
    /// 既知のアーキテクチャごとに1台
    PerArchitecture,
}

impl Count {
    pub fn is_zero(&self) -> bool {
        matches!(self, Count::Fixed(0))
    }
}

impl Default for Count {
    fn default() -> Self {
        Count::Fixed(0)
    }
}

/// 追加データボリューム
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataVolume {
    pub device: String,
    pub size_gb: u32,
}

impl DataVolume {
    /// 共有ファイルシステムの元ノードに付けるリポジトリ用ボリューム
    pub fn repository() -> Self {
        Self {
            device: "/dev/sdb".to_string(),
            size_gb: 100,
        }
    }
}

/// 1ロール分の起動指定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    pub role: Role,

    /// 論理名のステム（例: "cds" → cds1, cds2）
    pub stem: String,

    pub count: Count,

    pub os: RhelVersion,

    /// インスタンスごとのアーキテクチャ（空要素はプライマリ）
    pub architectures: Vec<Option<Architecture>>,

    /// 指定時はイメージ解決を行わずこの AMI を使う
    pub ami_override: Option<String>,

    pub data_volume: Option<DataVolume>,
}

impl RoleSpec {
    pub fn new(role: Role, stem: impl Into<String>, count: Count, os: RhelVersion) -> Self {
        Self {
            role,
            stem: stem.into(),
            count,
            os,
            architectures: Vec::new(),
            ami_override: None,
            data_volume: None,
        }
    }

    /// クライアントロール（ステム: `rhel<v>cli`）
    pub fn client(os: RhelVersion, count: Count) -> Self {
        Self::new(Role::Cli, format!("rhel{}cli", os.major()), count, os)
    }

    pub fn with_architectures(mut self, architectures: Vec<Option<Architecture>>) -> Self {
        self.architectures = architectures;
        self
    }

    pub fn with_ami_override(mut self, ami: impl Into<String>) -> Self {
        self.ami_override = Some(ami.into());
        self
    }

    pub fn with_data_volume(mut self, volume: DataVolume) -> Self {
        self.data_volume = Some(volume);
        self
    }

    /// index 番目（0始まり）のインスタンスのアーキテクチャ
    ///
    /// リストが台数より短い場合は先頭から循環する。
    pub fn architecture_at(&self, index: usize) -> Architecture {
        if self.architectures.is_empty() {
            return Architecture::PRIMARY;
        }
        self.architectures[index % self.architectures.len()].unwrap_or(Architecture::PRIMARY)
    }

    /// 起動する各インスタンスのアーキテクチャ
    pub fn instance_architectures(&self) -> Vec<Architecture> {
        match self.count {
            Count::Fixed(n) => (0..n as usize).map(|i| self.architecture_at(i)).collect(),
            Count::PerArchitecture => Architecture::ALL.to_vec(),
        }
    }

    pub fn instance_count(&self) -> usize {
        match self.count {
            Count::Fixed(n) => n as usize,
            Count::PerArchitecture => Architecture::ALL.len(),
        }
    }

    /// 論理名（台数が2以上なら1始まりの連番を付ける）
    pub fn logical_name(&self, index: usize) -> String {
        if self.instance_count() > 1 {
            format!("{}{}", self.stem, index + 1)
        } else {
            self.stem.clone()
        }
    }

    pub fn logical_names(&self) -> Vec<String> {
        (0..self.instance_count())
            .map(|i| self.logical_name(i))
            .collect()
    }
}

/// ネットワーク配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkMode {
    /// サブネット指定なし（公開範囲はプラットフォームのデフォルト）
    #[default]
    Flat,
    /// 全インスタンスをサブネットに配置し、Elastic IP を割り当てる
    Subnet { vpc_id: String, subnet_id: String },
}

impl NetworkMode {
    /// VPC ID とサブネット ID の組から構築
    ///
    /// 片方だけの指定は設定エラー。どちらも無い場合は `None`。
    pub fn from_ids(vpc_id: Option<String>, subnet_id: Option<String>) -> Result<Option<Self>> {
        match (vpc_id, subnet_id) {
            (Some(vpc_id), Some(subnet_id)) => Ok(Some(NetworkMode::Subnet { vpc_id, subnet_id })),
            (None, None) => Ok(None),
            _ => Err(FleetError::MismatchedNetwork),
        }
    }

    pub fn is_subnet_scoped(&self) -> bool {
        matches!(self, NetworkMode::Subnet { .. })
    }

    pub fn vpc_id(&self) -> Option<&str> {
        match self {
            NetworkMode::Subnet { vpc_id, .. } => Some(vpc_id),
            NetworkMode::Flat => None,
        }
    }

    pub fn subnet_id(&self) -> Option<&str> {
        match self {
            NetworkMode::Subnet { subnet_id, .. } => Some(subnet_id),
            NetworkMode::Flat => None,
        }
    }
}

/// 共有ファイルシステムの配置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSystemMode {
    /// RHUA が共有ファイルシステムを兼ねる
    #[default]
    Rhua,
    /// 専用の NFS ノード
    Dedicated,
    /// クライアントのみ（共有ファイルシステムなし）
    None,
}

impl FileSystemMode {
    /// リソース名・ファイル名に使う断片
    pub fn fragment(&self) -> &'static str {
        match self {
            FileSystemMode::Rhua | FileSystemMode::Dedicated => "nfs",
            FileSystemMode::None => "",
        }
    }
}

/// フリート全体の定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    /// スタック名の断片
    pub name: String,

    pub region: String,

    pub network: NetworkMode,

    pub fs_mode: FileSystemMode,

    pub roles: Vec<RoleSpec>,
}

impl Topology {
    /// 起動前の設定検証
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FleetError::InvalidConfig(
                "スタック名が空です".to_string(),
            ));
        }
        if self.region.trim().is_empty() {
            return Err(FleetError::InvalidConfig("リージョンが空です".to_string()));
        }

        if !self.network.is_subnet_scoped() {
            for spec in &self.roles {
                if let Some(arch) = spec
                    .instance_architectures()
                    .into_iter()
                    .find(|arch| !arch.is_primary())
                {
                    return Err(FleetError::SecondaryArchitectureRequiresSubnet {
                        role: spec.stem.clone(),
                        arch: arch.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// 指定ロールの合計台数
    pub fn count_of(&self, role: Role) -> usize {
        self.roles
            .iter()
            .filter(|spec| spec.role == role)
            .map(RoleSpec::instance_count)
            .sum()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.count_of(role) > 0
    }

    pub fn is_client_only(&self) -> bool {
        self.fs_mode == FileSystemMode::None
    }

    /// 使用する (RHEL, アーキテクチャ) の組（重複なし）
    pub fn image_keys(&self) -> Vec<(RhelVersion, Architecture)> {
        let mut keys: Vec<_> = self
            .roles
            .iter()
            .filter(|spec| spec.ami_override.is_none())
            .flat_map(|spec| {
                spec.instance_architectures()
                    .into_iter()
                    .map(move |arch| (spec.os, arch))
            })
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// テンプレートの Description
    pub fn description(&self) -> String {
        let mut description = if self.is_client_only() {
            "Client-only stack".to_string()
        } else {
            format!(
                "RHUI with {} CDS and {} HAProxy nodes",
                self.count_of(Role::Cds),
                self.count_of(Role::HaProxy)
            )
        };

        for spec in self.roles.iter().filter(|spec| spec.role == Role::Cli) {
            let count = spec.instance_count();
            if count > 0 {
                let plural = if count > 1 { "s" } else { "" };
                description.push_str(&format!(", {} {} client{}", count, spec.os, plural));
            }
        }
        if self.has_role(Role::Test) {
            description.push_str(", TEST machine");
        }
        if self.has_role(Role::Dns) {
            description.push_str(", DNS");
        }
        if self.has_role(Role::Nfs) {
            description.push_str(", NFS");
        }

        description
    }
}

/// クライアントの起動指定
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRequest {
    pub count: Count,
    pub architectures: Vec<Option<Architecture>>,
}

/// トポロジーを組み立てるための入力
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyRequest {
    pub name: String,
    pub region: String,
    pub network: NetworkMode,
    pub cds: u32,
    pub haproxy: u32,
    pub clients: BTreeMap<RhelVersion, ClientRequest>,
    /// RHEL6 以降の全バージョンでクライアントを起動
    pub cli_all: bool,
    /// クライアントのみ起動
    pub cli_only: bool,
    pub dns: bool,
    pub nfs: bool,
    pub test: bool,
}

impl Default for TopologyRequest {
    fn default() -> Self {
        Self {
            name: "rhui".to_string(),
            region: "eu-west-1".to_string(),
            network: NetworkMode::Flat,
            cds: 1,
            haproxy: 1,
            clients: BTreeMap::new(),
            cli_all: false,
            cli_only: false,
            dns: false,
            nfs: false,
            test: false,
        }
    }
}

impl TopologyRequest {
    /// ロールの並び順: RHUA, CDS, クライアント, NFS, DNS, TEST, HAProxy
    pub fn into_topology(self) -> Topology {
        let client_only = self.cli_only || (self.cds == 0 && self.haproxy == 0);
        let (cds, haproxy) = if client_only {
            (0, 0)
        } else {
            (self.cds, self.haproxy)
        };
        let fs_mode = if client_only {
            FileSystemMode::None
        } else if self.nfs {
            FileSystemMode::Dedicated
        } else {
            FileSystemMode::Rhua
        };

        let mut clients = self.clients;
        if self.cli_all {
            for major in 6..=9 {
                let Ok(version) = RhelVersion::new(major) else {
                    continue;
                };
                let entry = clients.entry(version).or_default();
                if entry.count.is_zero() {
                    entry.count = if major == 6 {
                        Count::Fixed(1)
                    } else {
                        Count::PerArchitecture
                    };
                }
            }
        }

        let server = RhelVersion::SERVER;
        let mut roles = Vec::new();

        match fs_mode {
            FileSystemMode::Rhua => roles.push(
                RoleSpec::new(Role::Rhua, "rhua", Count::Fixed(1), server)
                    .with_data_volume(DataVolume::repository()),
            ),
            FileSystemMode::Dedicated => {
                roles.push(RoleSpec::new(Role::Rhua, "rhua", Count::Fixed(1), server))
            }
            FileSystemMode::None => {}
        }

        if cds > 0 {
            roles.push(RoleSpec::new(Role::Cds, "cds", Count::Fixed(cds), server));
        }

        for (version, request) in clients {
            if request.count.is_zero() {
                continue;
            }
            roles.push(
                RoleSpec::client(version, request.count).with_architectures(request.architectures),
            );
        }

        if fs_mode == FileSystemMode::Dedicated {
            roles.push(
                RoleSpec::new(Role::Nfs, "nfs", Count::Fixed(1), server)
                    .with_data_volume(DataVolume::repository()),
            );
        }
        if self.dns {
            roles.push(RoleSpec::new(Role::Dns, "dns", Count::Fixed(1), server));
        }
        if self.test {
            roles.push(RoleSpec::new(Role::Test, "test", Count::Fixed(1), server));
        }
        if haproxy > 0 {
            roles.push(RoleSpec::new(
                Role::HaProxy,
                "haproxy",
                Count::Fixed(haproxy),
                server,
            ));
        }

        Topology {
            name: self.name,
            region: self.region,
            network: self.network,
            fs_mode,
            roles,
        }
    }
}
