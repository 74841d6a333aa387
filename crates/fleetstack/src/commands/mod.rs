pub mod create;
pub mod validate;

use std::process::ExitCode;

/// コマンドの終了状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// スタックが失敗状態で終わった
    StackFailed,
    /// inventory にホスト名が欠けた行がある（ファイルは手動で修正する）
    InvalidInventory,
}

impl Outcome {
    pub fn code(&self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::StackFailed => 1,
            Outcome::InvalidInventory => 2,
        }
    }
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        ExitCode::from(outcome.code())
    }
}
