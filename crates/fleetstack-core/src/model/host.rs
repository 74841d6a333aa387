//! 作成済みホストの解決結果

use super::os::RhelVersion;
use super::role::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 接続先アドレスの公開範囲
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exposure {
    Public,
    Private,
}

/// 接続先アドレス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectAddress {
    pub hostname: String,
    pub ip: Option<String>,
    pub exposure: Exposure,
}

/// 作成されたコンピュートリソース1台分
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    pub instance_id: String,
    pub role: Option<Role>,
    /// OSタグ（クライアントのみ）
    pub os: Option<String>,
    pub public_hostname: String,
    pub private_hostname: String,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
    /// 予約タグ以外のタグ
    pub extra_tags: BTreeMap<String, String>,
}

impl HostRecord {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            ..Default::default()
        }
    }

    /// パブリックIPがあればパブリック、なければプライベート
    pub fn connect_address(&self) -> ConnectAddress {
        match &self.public_ip {
            Some(ip) => ConnectAddress {
                hostname: self.public_hostname.clone(),
                ip: Some(ip.clone()),
                exposure: Exposure::Public,
            },
            None => ConnectAddress {
                hostname: self.private_hostname.clone(),
                ip: self.private_ip.clone(),
                exposure: Exposure::Private,
            },
        }
    }

    pub fn rhel_version(&self) -> Option<RhelVersion> {
        self.os.as_deref().and_then(RhelVersion::from_tag)
    }

    /// `Name` タグ（inventory の並び順に使う）
    pub fn name_tag(&self) -> Option<&str> {
        self.extra_tags.get("Name").map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_address_prefers_public() {
        let mut record = HostRecord::new("i-1");
        record.public_hostname = "ec2-1.compute.amazonaws.com".into();
        record.private_hostname = "ip-10-0-0-1.internal".into();
        record.public_ip = Some("54.1.1.1".into());
        record.private_ip = Some("10.0.0.1".into());

        let address = record.connect_address();
        assert_eq!(address.exposure, Exposure::Public);
        assert_eq!(address.hostname, "ec2-1.compute.amazonaws.com");

        record.public_ip = None;
        let address = record.connect_address();
        assert_eq!(address.exposure, Exposure::Private);
        assert_eq!(address.hostname, "ip-10-0-0-1.internal");
        assert_eq!(address.ip.as_deref(), Some("10.0.0.1"));
    }
}
