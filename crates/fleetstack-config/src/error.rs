use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "指定された設定ファイルが見つかりません: {0}\n\
        --config または FLEETSTACK_CONFIG のパスを確認してください"
    )]
    ConfigFileNotFound(PathBuf),

    #[error("設定ファイルの解析に失敗しました: {path}\n理由: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
