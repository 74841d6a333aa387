//! イメージカタログ
//!
//! `RHEL<v>mapping.json`（プライマリアーキテクチャ、リージョン → AMI の表）と
//! `RHEL<v>mapping_<arch>.json`（セカンダリアーキテクチャ）を読み込み、
//! グラフ構築で使う形に揃える。ファイル I/O はここで完結させ、
//! グラフ構築自体は純粋関数に保つ。

use crate::error::{FleetError, Result};
use crate::model::{Architecture, RhelVersion, Topology};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

const AMI_KEY: &str = "AMI";

/// リージョン → { "AMI": <image id> }
pub type RegionTable = BTreeMap<String, BTreeMap<String, String>>;

/// (RHEL, アーキテクチャ) ごとの AMI 上書き
pub type ImageOverrides = BTreeMap<(RhelVersion, Architecture), String>;

/// 解決済みのイメージ情報
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageCatalog {
    /// プライマリアーキテクチャのマッピング表
    mappings: BTreeMap<RhelVersion, RegionTable>,
    /// セカンダリアーキテクチャの対象リージョンでの AMI
    secondary: BTreeMap<(RhelVersion, Architecture), String>,
}

impl ImageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mapping(mut self, os: RhelVersion, table: RegionTable) -> Self {
        self.mappings.insert(os, table);
        self
    }

    pub fn with_secondary(
        mut self,
        os: RhelVersion,
        arch: Architecture,
        ami: impl Into<String>,
    ) -> Self {
        self.secondary.insert((os, arch), ami.into());
        self
    }

    pub fn mapping(&self, os: RhelVersion) -> Option<&RegionTable> {
        self.mappings.get(&os)
    }

    pub fn secondary_image(&self, os: RhelVersion, arch: Architecture) -> Option<&str> {
        self.secondary.get(&(os, arch)).map(String::as_str)
    }

    /// トポロジーが参照するイメージだけを読み込む
    ///
    /// 上書き指定がある組はファイルを読まない。
    #[tracing::instrument(skip(topology, overrides), fields(region = %topology.region))]
    pub fn load(dir: &Path, topology: &Topology, overrides: &ImageOverrides) -> Result<Self> {
        let mut catalog = Self::new();

        for (os, arch) in topology.image_keys() {
            let override_ami = overrides.get(&(os, arch));

            if arch.is_primary() {
                if catalog.mappings.contains_key(&os) {
                    continue;
                }
                let table = match override_ami {
                    Some(ami) => single_region_table(&topology.region, ami),
                    None => read_region_table(&dir.join(mapping_file_name(os, None)))?,
                };
                catalog.mappings.insert(os, table);
            } else {
                let ami = match override_ami {
                    Some(ami) => ami.clone(),
                    None => {
                        let path = dir.join(mapping_file_name(os, Some(arch)));
                        let table = read_region_table(&path)?;
                        region_image(&table, &topology.region).ok_or_else(|| {
                            FleetError::MissingRegionImage {
                                path: path.clone(),
                                region: topology.region.clone(),
                            }
                        })?
                    }
                };
                catalog.secondary.insert((os, arch), ami);
            }
        }

        debug!(
            mappings = catalog.mappings.len(),
            secondary = catalog.secondary.len(),
            "Loaded image catalog"
        );
        Ok(catalog)
    }
}

/// イメージインデックスのファイル名
pub fn mapping_file_name(os: RhelVersion, arch: Option<Architecture>) -> String {
    match arch {
        Some(arch) if !arch.is_primary() => format!("{}mapping_{}.json", os.label(), arch),
        _ => format!("{}mapping.json", os.label()),
    }
}

/// 1リージョンだけの表（上書き指定用）
pub fn single_region_table(region: &str, ami: &str) -> RegionTable {
    BTreeMap::from([(
        region.to_string(),
        BTreeMap::from([(AMI_KEY.to_string(), ami.to_string())]),
    )])
}

fn region_image(table: &RegionTable, region: &str) -> Option<String> {
    table.get(region)?.get(AMI_KEY).cloned()
}

fn read_region_table(path: &Path) -> Result<RegionTable> {
    let content = std::fs::read_to_string(path).map_err(|e| FleetError::MissingImageIndex {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| FleetError::InvalidImageIndex {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Count, NetworkMode, RoleSpec, TopologyRequest};
    use std::fs;
    use tempfile::tempdir;

    fn rhel(major: u8) -> RhelVersion {
        RhelVersion::new(major).unwrap()
    }

    fn subnet_topology() -> Topology {
        let mut topology = TopologyRequest {
            network: NetworkMode::Subnet {
                vpc_id: "vpc-1".into(),
                subnet_id: "subnet-1".into(),
            },
            ..Default::default()
        }
        .into_topology();
        topology.roles.push(
            RoleSpec::client(rhel(9), Count::Fixed(1))
                .with_architectures(vec![Some(Architecture::Arm64)]),
        );
        topology
    }

    #[test]
    fn test_mapping_file_names() {
        assert_eq!(mapping_file_name(rhel(8), None), "RHEL8mapping.json");
        assert_eq!(
            mapping_file_name(rhel(8), Some(Architecture::X86_64)),
            "RHEL8mapping.json"
        );
        assert_eq!(
            mapping_file_name(rhel(9), Some(Architecture::Arm64)),
            "RHEL9mapping_arm64.json"
        );
    }

    #[test]
    fn test_load_reads_only_referenced_files() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("RHEL8mapping.json"),
            r#"{"eu-west-1": {"AMI": "ami-rhel8"}, "us-east-1": {"AMI": "ami-rhel8-us"}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("RHEL9mapping_arm64.json"),
            r#"{"eu-west-1": {"AMI": "ami-rhel9-arm"}}"#,
        )
        .unwrap();

        let catalog =
            ImageCatalog::load(dir.path(), &subnet_topology(), &ImageOverrides::new()).unwrap();
        assert_eq!(catalog.mapping(rhel(8)).unwrap().len(), 2);
        assert!(catalog.mapping(rhel(9)).is_none());
        assert_eq!(
            catalog.secondary_image(rhel(9), Architecture::Arm64),
            Some("ami-rhel9-arm")
        );
    }

    #[test]
    fn test_missing_index_file_is_fatal() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("RHEL8mapping.json"),
            r#"{"eu-west-1": {"AMI": "ami-rhel8"}}"#,
        )
        .unwrap();

        let err = ImageCatalog::load(dir.path(), &subnet_topology(), &ImageOverrides::new())
            .unwrap_err();
        match err {
            FleetError::MissingImageIndex { path, .. } => {
                assert!(path.ends_with("RHEL9mapping_arm64.json"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_region_is_fatal() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("RHEL8mapping.json"),
            r#"{"eu-west-1": {"AMI": "ami-rhel8"}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("RHEL9mapping_arm64.json"),
            r#"{"ap-south-1": {"AMI": "ami-rhel9-arm"}}"#,
        )
        .unwrap();

        let err = ImageCatalog::load(dir.path(), &subnet_topology(), &ImageOverrides::new())
            .unwrap_err();
        assert!(matches!(err, FleetError::MissingRegionImage { ref region, .. } if region == "eu-west-1"));
    }

    #[test]
    fn test_overrides_skip_files() {
        let dir = tempdir().unwrap();
        let overrides = ImageOverrides::from([
            ((rhel(8), Architecture::X86_64), "ami-override-8".to_string()),
            ((rhel(9), Architecture::Arm64), "ami-override-9-arm".to_string()),
        ]);

        let catalog = ImageCatalog::load(dir.path(), &subnet_topology(), &overrides).unwrap();
        assert_eq!(
            catalog.mapping(rhel(8)),
            Some(&single_region_table("eu-west-1", "ami-override-8"))
        );
        assert_eq!(
            catalog.secondary_image(rhel(9), Architecture::Arm64),
            Some("ami-override-9-arm")
        );
    }
}
