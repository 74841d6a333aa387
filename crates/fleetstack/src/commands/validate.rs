use super::Outcome;
use anyhow::Context;
use colored::Colorize;
use fleetstack_core::{InventoryValidation, inventory};
use std::path::Path;

/// 欠損行を表示（作成時の検証と共通）
pub fn report(validation: &InventoryValidation) {
    for line in &validation.bad_lines {
        println!("Missing hostname on line {}!", line);
    }
}

pub fn handle(file: &Path) -> anyhow::Result<Outcome> {
    println!("{}", "inventory を検証中...".blue());

    let document = std::fs::read_to_string(file)
        .with_context(|| format!("inventory を読み込めません: {}", file.display()))?;
    let validation = inventory::validate(&document);

    if validation.is_ok() {
        println!("{}", "✓ inventory は正常です！".green().bold());
        return Ok(Outcome::Success);
    }

    report(&validation);
    eprintln!();
    eprintln!("{}", "✗ ホスト名が欠けた行があります".red().bold());
    eprintln!("ファイルを手動で修正するか、スタックを削除してやり直してください。");
    Ok(Outcome::InvalidInventory)
}
