use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FleetError {
    #[error("未知のアーキテクチャです: {0}")]
    UnknownArchitecture(String),

    #[error("未対応の RHEL バージョンです: {0}")]
    UnsupportedRhelVersion(String),

    #[error("vpc_id と subnet_id は同時に指定する必要があります")]
    MismatchedNetwork,

    #[error(
        "ロール '{role}' のアーキテクチャ {arch} はサブネット配置が必要です\nヒント: VPC なしのフラットネットワークでは x86_64 のみ起動できます"
    )]
    SecondaryArchitectureRequiresSubnet { role: String, arch: String },

    #[error("イメージインデックスが見つかりません: {path}\n理由: {message}")]
    MissingImageIndex { path: PathBuf, message: String },

    #[error("イメージインデックス {path} にリージョン '{region}' の AMI がありません")]
    MissingRegionImage { path: PathBuf, region: String },

    #[error("イメージインデックスが不正です: {path}\n理由: {message}")]
    InvalidImageIndex { path: PathBuf, message: String },

    #[error("論理名が重複しています: {0}")]
    DuplicateLogicalName(String),

    #[error("テンプレート検証エラー: {0}")]
    InvalidTemplate(String),

    #[error("パラメータの形式が不正です (NAME=VALUE): {0}")]
    InvalidParameter(String),

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("IO エラー: {path}\n理由: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("JSON エラー: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FleetError>;
