//! テンプレートのシリアライズ
//!
//! リソースグラフをプロビジョニングサービスにそのまま渡す JSON 文書に変換する。
//! オブジェクトのキーは常にソート順で出力されるため、同じグラフからは
//! 同じバイト列が得られる。

use crate::error::Result;
use crate::graph::{
    ElasticIpNode, ImageRef, InstanceNode, Placement, ResourceGraph, ResourceNode,
    SecurityGroupNode,
};
use serde_json::{Map, Value, json};

pub const FORMAT_VERSION: &str = "2010-09-09";

/// キーペアを受け取るテンプレートパラメータ名
pub const KEY_NAME_PARAMETER: &str = "KeyName";

/// グラフをテンプレート文書に変換
pub fn render(graph: &ResourceGraph) -> Value {
    let mappings: Map<String, Value> = graph
        .mappings
        .iter()
        .map(|(os, table)| (os.label(), json!(table)))
        .collect();

    let resources: Map<String, Value> = graph
        .nodes
        .iter()
        .map(|(name, node)| (name.clone(), render_node(node)))
        .collect();

    json!({
        "AWSTemplateFormatVersion": FORMAT_VERSION,
        "Description": graph.description,
        "Mappings": mappings,
        "Parameters": {
            KEY_NAME_PARAMETER: {
                "Description": "Name of an existing EC2 KeyPair to enable SSH access to the instances",
                "Type": "String",
            }
        },
        "Resources": resources,
        "Outputs": {},
    })
}

/// 送信用のテンプレート本文（インデント付き JSON）
pub fn to_template_body(graph: &ResourceGraph) -> Result<String> {
    Ok(serde_json::to_string_pretty(&render(graph))?)
}

fn render_node(node: &ResourceNode) -> Value {
    let properties = match node {
        ResourceNode::Instance(instance) => instance_properties(instance),
        ResourceNode::SecurityGroup(group) => security_group_properties(group),
        ResourceNode::ElasticIp(eip) => elastic_ip_properties(eip),
    };
    json!({
        "Type": node.kind().type_name(),
        "Properties": properties,
    })
}

fn instance_properties(instance: &InstanceNode) -> Value {
    let mut properties = Map::new();

    let image = match &instance.image {
        ImageRef::Mapping(os) => json!({
            "Fn::FindInMap": [os.label(), { "Ref": "AWS::Region" }, "AMI"]
        }),
        ImageRef::Literal(ami) => json!(ami),
    };
    properties.insert("ImageId".into(), image);
    properties.insert("InstanceType".into(), json!(instance.instance_type));
    properties.insert("KeyName".into(), json!({ "Ref": KEY_NAME_PARAMETER }));

    let group_ref = json!([{ "Ref": instance.security_group }]);
    match &instance.placement {
        Placement::Default => {
            properties.insert("SecurityGroups".into(), group_ref);
        }
        Placement::Subnet(subnet_id) => {
            properties.insert("SecurityGroupIds".into(), group_ref);
            properties.insert("SubnetId".into(), json!(subnet_id));
        }
    }

    if let Some(volume) = &instance.data_volume {
        properties.insert(
            "BlockDeviceMappings".into(),
            json!([{
                "DeviceName": volume.device,
                "Ebs": { "VolumeSize": volume.size_gb.to_string() },
            }]),
        );
    }

    let mut tags = vec![
        json!({ "Key": "Name", "Value": instance.tags.name }),
        json!({ "Key": "Role", "Value": instance.tags.role.tag() }),
    ];
    if let Some(os) = &instance.tags.os {
        tags.push(json!({ "Key": "OS", "Value": os }));
    }
    properties.insert("Tags".into(), Value::Array(tags));

    Value::Object(properties)
}

fn security_group_properties(group: &SecurityGroupNode) -> Value {
    let ingress: Vec<Value> = group
        .ingress
        .iter()
        .map(|rule| {
            json!({
                "CidrIp": rule.cidr,
                "FromPort": rule.port.to_string(),
                "ToPort": rule.port.to_string(),
                "IpProtocol": rule.protocol.as_str(),
            })
        })
        .collect();

    let mut properties = Map::new();
    properties.insert("GroupDescription".into(), json!(group.description));
    properties.insert("SecurityGroupIngress".into(), Value::Array(ingress));
    if let Some(vpc_id) = &group.vpc_id {
        properties.insert("VpcId".into(), json!(vpc_id));
    }
    Value::Object(properties)
}

fn elastic_ip_properties(eip: &ElasticIpNode) -> Value {
    json!({
        "Domain": "vpc",
        "InstanceId": { "Ref": eip.instance },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{BuildOptions, build};
    use crate::image::{ImageCatalog, single_region_table};
    use crate::model::{Architecture, NetworkMode, OsTagStyle, RhelVersion, TopologyRequest};
    use crate::model::{ClientRequest, Count};
    use std::collections::BTreeMap;

    fn rhel(major: u8) -> RhelVersion {
        RhelVersion::new(major).unwrap()
    }

    fn graph(network: NetworkMode) -> ResourceGraph {
        let topology = TopologyRequest {
            network,
            cds: 2,
            clients: BTreeMap::from([(
                rhel(9),
                ClientRequest {
                    count: Count::Fixed(2),
                    architectures: vec![Some(Architecture::Arm64), None],
                },
            )]),
            ..Default::default()
        }
        .into_topology();
        let catalog = ImageCatalog::new()
            .with_mapping(rhel(8), single_region_table("eu-west-1", "ami-8"))
            .with_mapping(rhel(9), single_region_table("eu-west-1", "ami-9"))
            .with_secondary(rhel(9), Architecture::Arm64, "ami-9-arm");
        let options = BuildOptions {
            identity: "jdoe".into(),
            os_tag_style: OsTagStyle::Truncated,
        };
        build(&topology, &catalog, &options).unwrap()
    }

    fn subnet() -> NetworkMode {
        NetworkMode::Subnet {
            vpc_id: "vpc-1".into(),
            subnet_id: "subnet-1".into(),
        }
    }

    #[test]
    fn test_top_level_sections() {
        let doc = render(&graph(subnet()));
        assert_eq!(doc["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(doc["Description"], "RHUI with 2 CDS and 1 HAProxy nodes, 2 RHEL9 clients");
        assert_eq!(doc["Parameters"]["KeyName"]["Type"], "String");
        assert_eq!(doc["Outputs"], json!({}));
        assert_eq!(doc["Mappings"]["RHEL8"]["eu-west-1"]["AMI"], "ami-8");
        assert_eq!(doc["Mappings"]["RHEL9"]["eu-west-1"]["AMI"], "ami-9");
    }

    #[test]
    fn test_subnet_instance_properties() {
        let doc = render(&graph(subnet()));
        let rhua = &doc["Resources"]["rhua"];
        assert_eq!(rhua["Type"], "AWS::EC2::Instance");
        assert_eq!(rhua["Properties"]["SubnetId"], "subnet-1");
        assert_eq!(
            rhua["Properties"]["SecurityGroupIds"],
            json!([{ "Ref": "RHUIsecuritygroup" }])
        );
        assert!(rhua["Properties"].get("SecurityGroups").is_none());
        assert_eq!(
            rhua["Properties"]["ImageId"],
            json!({ "Fn::FindInMap": ["RHEL8", { "Ref": "AWS::Region" }, "AMI"] })
        );
        assert_eq!(
            rhua["Properties"]["BlockDeviceMappings"][0],
            json!({ "DeviceName": "/dev/sdb", "Ebs": { "VolumeSize": "100" } })
        );

        let eip = &doc["Resources"]["rhuaEIP"];
        assert_eq!(eip["Type"], "AWS::EC2::EIP");
        assert_eq!(
            eip["Properties"],
            json!({ "Domain": "vpc", "InstanceId": { "Ref": "rhua" } })
        );

        assert_eq!(doc["Resources"]["RHUIsecuritygroup"]["Properties"]["VpcId"], "vpc-1");
    }

    #[test]
    fn test_client_tags_and_literal_image() {
        let doc = render(&graph(subnet()));
        let client = &doc["Resources"]["rhel9cli1"]["Properties"];
        assert_eq!(client["ImageId"], "ami-9-arm");
        assert_eq!(client["InstanceType"], "t4g.large");
        assert_eq!(
            client["Tags"],
            json!([
                { "Key": "Name", "Value": "jdoe_nfs_rhui_rhel9cli1" },
                { "Key": "Role", "Value": "CLI" },
                { "Key": "OS", "Value": "RHEL9" },
            ])
        );

        let cds = &doc["Resources"]["cds1"]["Properties"];
        assert_eq!(cds["Tags"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_flat_template() {
        let topology = TopologyRequest::default().into_topology();
        let catalog =
            ImageCatalog::new().with_mapping(rhel(8), single_region_table("eu-west-1", "ami-8"));
        let options = BuildOptions {
            identity: "jdoe".into(),
            os_tag_style: OsTagStyle::Truncated,
        };
        let doc = render(&build(&topology, &catalog, &options).unwrap());

        let resources = doc["Resources"].as_object().unwrap();
        assert_eq!(resources.len(), 4);
        assert!(!resources.keys().any(|k| k.ends_with("EIP")));
        assert_eq!(
            resources["haproxy"]["Properties"]["SecurityGroups"],
            json!([{ "Ref": "RHUIsecuritygroup" }])
        );
        assert!(resources["RHUIsecuritygroup"]["Properties"].get("VpcId").is_none());

        let ingress = resources["RHUIsecuritygroup"]["Properties"]["SecurityGroupIngress"]
            .as_array()
            .unwrap();
        assert_eq!(ingress.len(), 7);
        assert_eq!(
            ingress[6],
            json!({ "CidrIp": "0.0.0.0/0", "FromPort": "53", "ToPort": "53", "IpProtocol": "udp" })
        );
    }

    #[test]
    fn test_body_is_byte_identical_across_builds() {
        let first = to_template_body(&graph(subnet())).unwrap();
        let second = to_template_body(&graph(subnet())).unwrap();
        assert_eq!(first, second);
    }
}
