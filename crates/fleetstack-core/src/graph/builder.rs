//! トポロジー → リソースグラフ

use super::{
    ELASTIC_IP_SUFFIX, ElasticIpNode, ImageRef, InstanceNode, InstanceTags, Placement,
    ResourceGraph, ResourceNode, SECURITY_GROUP, SecurityGroupNode,
};
use crate::error::{FleetError, Result};
use crate::image::ImageCatalog;
use crate::model::{Architecture, NetworkMode, OsTagStyle, RhelVersion, Role, RoleSpec, Topology};
use crate::naming;
use std::collections::BTreeMap;
use tracing::debug;

/// グラフ構築のオプション
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// キーペア名から取り出した識別子（Name タグの先頭）
    pub identity: String,
    pub os_tag_style: OsTagStyle,
}

/// インスタンスサイズ
///
/// RHEL 5/6 は現行世代のインスタンスで起動できないため固定のサイズを使う。
pub fn instance_type(os: RhelVersion, arch: Architecture, network: &NetworkMode) -> &'static str {
    let flat = !network.is_subnet_scoped();
    if os.is_legacy() {
        return if flat { "m3.large" } else { "i3.large" };
    }
    match arch {
        Architecture::X86_64 if flat => "m3.large",
        Architecture::X86_64 => "m5.large",
        Architecture::Arm64 => "t4g.large",
    }
}

/// トポロジーからリソースグラフを構築する
///
/// 同じ入力に対して常に同じグラフを返す。
pub fn build(
    topology: &Topology,
    catalog: &ImageCatalog,
    options: &BuildOptions,
) -> Result<ResourceGraph> {
    topology.validate()?;

    let subnet_scoped = topology.network.is_subnet_scoped();
    let mut nodes = BTreeMap::new();
    let mut mappings = BTreeMap::new();

    nodes.insert(
        SECURITY_GROUP.to_string(),
        ResourceNode::SecurityGroup(SecurityGroupNode::standard(
            topology.network.vpc_id().map(str::to_string),
        )),
    );

    for spec in &topology.roles {
        for (index, arch) in spec.instance_architectures().into_iter().enumerate() {
            let logical_name = spec.logical_name(index);
            let image = resolve_image(spec, arch, catalog, &mut mappings)?;

            let placement = match topology.network.subnet_id() {
                Some(subnet_id) => Placement::Subnet(subnet_id.to_string()),
                None => Placement::Default,
            };
            let os = (spec.role == Role::Cli).then(|| spec.os.tag(options.os_tag_style));

            let node = InstanceNode {
                image,
                instance_type: instance_type(spec.os, arch, &topology.network).to_string(),
                placement,
                security_group: SECURITY_GROUP.to_string(),
                data_volume: spec.data_volume.clone(),
                tags: InstanceTags {
                    name: naming::resource_name(
                        &options.identity,
                        topology.fs_mode,
                        &topology.name,
                        &logical_name,
                    ),
                    role: spec.role,
                    os,
                },
            };

            if subnet_scoped {
                insert_unique(
                    &mut nodes,
                    format!("{}{}", logical_name, ELASTIC_IP_SUFFIX),
                    ResourceNode::ElasticIp(ElasticIpNode {
                        instance: logical_name.clone(),
                    }),
                )?;
            }
            insert_unique(&mut nodes, logical_name, ResourceNode::Instance(node))?;
        }
    }

    debug!(
        nodes = nodes.len(),
        mappings = mappings.len(),
        subnet_scoped,
        "Built resource graph"
    );

    Ok(ResourceGraph {
        description: topology.description(),
        mappings,
        nodes,
        subnet_scoped,
    })
}

fn insert_unique(
    nodes: &mut BTreeMap<String, ResourceNode>,
    name: String,
    node: ResourceNode,
) -> Result<()> {
    if nodes.contains_key(&name) {
        return Err(FleetError::DuplicateLogicalName(name));
    }
    nodes.insert(name, node);
    Ok(())
}

fn resolve_image(
    spec: &RoleSpec,
    arch: Architecture,
    catalog: &ImageCatalog,
    mappings: &mut BTreeMap<RhelVersion, crate::image::RegionTable>,
) -> Result<ImageRef> {
    if let Some(ami) = &spec.ami_override {
        return Ok(ImageRef::Literal(ami.clone()));
    }

    if arch.is_primary() {
        let table = catalog
            .mapping(spec.os)
            .ok_or_else(|| FleetError::MissingImageIndex {
                path: crate::image::mapping_file_name(spec.os, None).into(),
                message: format!("{} のマッピングが読み込まれていません", spec.os),
            })?;
        mappings.entry(spec.os).or_insert_with(|| table.clone());
        return Ok(ImageRef::Mapping(spec.os));
    }

    catalog
        .secondary_image(spec.os, arch)
        .map(|ami| ImageRef::Literal(ami.to_string()))
        .ok_or_else(|| FleetError::MissingImageIndex {
            path: crate::image::mapping_file_name(spec.os, Some(arch)).into(),
            message: format!("{} {} のイメージが読み込まれていません", spec.os, arch),
        })
}
