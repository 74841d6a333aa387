//! リソースグラフ
//!
//! トポロジーから組み立てた、論理名をキーとするクラウドリソースの集合。
//! テンプレートへのシリアライズ前の形。

mod builder;

pub use builder::{BuildOptions, build, instance_type};

use crate::error::{FleetError, Result};
use crate::image::RegionTable;
use crate::model::{DataVolume, RhelVersion, Role};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// アクセス制御グループの論理名
pub const SECURITY_GROUP: &str = "RHUIsecuritygroup";

/// Elastic IP ノードの論理名サフィックス
pub const ELASTIC_IP_SUFFIX: &str = "EIP";

/// リソースの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Instance,
    SecurityGroup,
    ElasticIp,
}

impl ResourceKind {
    /// テンプレート上の型名
    pub fn type_name(&self) -> &'static str {
        match self {
            ResourceKind::Instance => "AWS::EC2::Instance",
            ResourceKind::SecurityGroup => "AWS::EC2::SecurityGroup",
            ResourceKind::ElasticIp => "AWS::EC2::EIP",
        }
    }

    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "AWS::EC2::Instance" => Some(ResourceKind::Instance),
            "AWS::EC2::SecurityGroup" => Some(ResourceKind::SecurityGroup),
            "AWS::EC2::EIP" => Some(ResourceKind::ElasticIp),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// イメージ参照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageRef {
    /// リージョン別マッピング表から引く
    Mapping(RhelVersion),
    /// AMI ID を直接指定
    Literal(String),
}

/// インスタンスの配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    /// プラットフォームのデフォルト
    Default,
    Subnet(String),
}

/// インスタンスのタグ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceTags {
    pub name: String,
    pub role: Role,
    pub os: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceNode {
    pub image: ImageRef,
    pub instance_type: String,
    pub placement: Placement,
    /// 所属するアクセス制御グループの論理名
    pub security_group: String,
    pub data_volume: Option<DataVolume>,
    pub tags: InstanceTags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

/// 受信許可ルール
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub protocol: Protocol,
    pub port: u16,
    pub cidr: String,
}

impl IngressRule {
    fn open(protocol: Protocol, port: u16) -> Self {
        Self {
            protocol,
            port,
            cidr: "0.0.0.0/0".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupNode {
    pub description: String,
    pub ingress: Vec<IngressRule>,
    pub vpc_id: Option<String>,
}

impl SecurityGroupNode {
    /// SSH, HTTPS, NFS, HTTP, プロキシ, DNS (tcp/udp)
    pub fn standard(vpc_id: Option<String>) -> Self {
        Self {
            description: "RHUI security group".to_string(),
            ingress: vec![
                IngressRule::open(Protocol::Tcp, 22),
                IngressRule::open(Protocol::Tcp, 443),
                IngressRule::open(Protocol::Tcp, 2049),
                IngressRule::open(Protocol::Tcp, 80),
                IngressRule::open(Protocol::Tcp, 3128),
                IngressRule::open(Protocol::Tcp, 53),
                IngressRule::open(Protocol::Udp, 53),
            ],
            vpc_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElasticIpNode {
    /// 割り当て先インスタンスの論理名
    pub instance: String,
}

/// グラフのノード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceNode {
    Instance(InstanceNode),
    SecurityGroup(SecurityGroupNode),
    ElasticIp(ElasticIpNode),
}

/// ノード間（およびノードから外部リソース）への辺
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge<'a> {
    /// アクセス制御グループへの所属
    MemberOf(&'a str),
    /// サブネットへの配置（外部リソース）
    PlacedIn(&'a str),
    /// Elastic IP のインスタンスへの割り当て
    BindsTo(&'a str),
}

impl ResourceNode {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceNode::Instance(_) => ResourceKind::Instance,
            ResourceNode::SecurityGroup(_) => ResourceKind::SecurityGroup,
            ResourceNode::ElasticIp(_) => ResourceKind::ElasticIp,
        }
    }

    pub fn edges(&self) -> Vec<Edge<'_>> {
        match self {
            ResourceNode::Instance(instance) => {
                let mut edges = vec![Edge::MemberOf(instance.security_group.as_str())];
                if let Placement::Subnet(subnet_id) = &instance.placement {
                    edges.push(Edge::PlacedIn(subnet_id.as_str()));
                }
                edges
            }
            ResourceNode::SecurityGroup(_) => Vec::new(),
            ResourceNode::ElasticIp(eip) => vec![Edge::BindsTo(eip.instance.as_str())],
        }
    }
}

/// リソースグラフ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGraph {
    pub description: String,

    /// テンプレートの Mappings に載せるプライマリアーキテクチャの表
    pub mappings: BTreeMap<RhelVersion, RegionTable>,

    /// 論理名 → ノード
    pub nodes: BTreeMap<String, ResourceNode>,

    /// サブネット配置かどうか
    pub subnet_scoped: bool,
}

impl ResourceGraph {
    pub fn get(&self, logical_name: &str) -> Option<&ResourceNode> {
        self.nodes.get(logical_name)
    }

    pub fn instances(&self) -> impl Iterator<Item = (&String, &InstanceNode)> {
        self.nodes.iter().filter_map(|(name, node)| match node {
            ResourceNode::Instance(instance) => Some((name, instance)),
            _ => None,
        })
    }

    pub fn elastic_ips(&self) -> impl Iterator<Item = (&String, &ElasticIpNode)> {
        self.nodes.iter().filter_map(|(name, node)| match node {
            ResourceNode::ElasticIp(eip) => Some((name, eip)),
            _ => None,
        })
    }

    pub fn count_of(&self, kind: ResourceKind) -> usize {
        self.nodes.values().filter(|node| node.kind() == kind).count()
    }

    /// 送信前のローカル検証
    ///
    /// - 全インスタンスに Name/Role タグがある
    /// - グループ参照・Elastic IP の割り当て先が存在する
    /// - Elastic IP はサブネット配置時のみ、インスタンスと1対1
    pub fn validate(&self) -> Result<()> {
        for (name, node) in &self.nodes {
            if let ResourceNode::Instance(instance) = node {
                if instance.tags.name.is_empty() {
                    return Err(FleetError::InvalidTemplate(format!(
                        "{} に Name タグがありません",
                        name
                    )));
                }
                if instance.placement != Placement::Default && !self.subnet_scoped {
                    return Err(FleetError::InvalidTemplate(format!(
                        "{} はサブネットに配置されていますがネットワークはフラットです",
                        name
                    )));
                }
            }

            for edge in node.edges() {
                match edge {
                    Edge::MemberOf(group) => match self.nodes.get(group) {
                        Some(ResourceNode::SecurityGroup(_)) => {}
                        _ => {
                            return Err(FleetError::InvalidTemplate(format!(
                                "{} の参照先グループ {} が存在しません",
                                name, group
                            )));
                        }
                    },
                    Edge::BindsTo(target) => match self.nodes.get(target) {
                        Some(ResourceNode::Instance(_)) => {}
                        _ => {
                            return Err(FleetError::InvalidTemplate(format!(
                                "{} の割り当て先インスタンス {} が存在しません",
                                name, target
                            )));
                        }
                    },
                    Edge::PlacedIn(_) => {}
                }
            }
        }

        let instances = self.count_of(ResourceKind::Instance);
        let eips = self.count_of(ResourceKind::ElasticIp);
        let expected = if self.subnet_scoped { instances } else { 0 };
        if eips != expected {
            return Err(FleetError::InvalidTemplate(format!(
                "Elastic IP の数 ({}) が期待値 ({}) と一致しません",
                eips, expected
            )));
        }
        if self.subnet_scoped {
            for (name, _) in self.instances() {
                let eip = format!("{}{}", name, ELASTIC_IP_SUFFIX);
                if !matches!(self.nodes.get(&eip), Some(ResourceNode::ElasticIp(e)) if &e.instance == name)
                {
                    return Err(FleetError::InvalidTemplate(format!(
                        "{} に対応する Elastic IP がありません",
                        name
                    )));
                }
            }
        }

        Ok(())
    }
}
