use crate::dump::types::TableInfo;
use crate::error::{Result, SqldumpError};
use dialoguer::{Input, MultiSelect};
use std::path::PathBuf;

/// 获取转储文件路径，优先命令行参数，否则交互输入
pub fn get_dump_path(arg: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = arg {
        return Ok(path);
    }
    let input: String = Input::new()
        .with_prompt("请输入 SQL 转储文件路径")
        .interact_text()
        .map_err(|e| SqldumpError::other(format!("读取输入失败: {e}")))?;
    Ok(PathBuf::from(input.trim()))
}

/// 选择列表中每张表的显示文本
pub fn table_labels(tables: &[TableInfo]) -> Vec<String> {
    tables
        .iter()
        .map(|t| format!("{} (第{}行起, {} 条 INSERT)", t.name, t.line_from, t.statements))
        .collect()
}

/// 交互选择要导出的表，什么都不选表示导出全部
pub fn select_tables(tables: &[TableInfo]) -> Result<Vec<String>> {
    if tables.is_empty() {
        return Ok(Vec::new());
    }
    let chosen = MultiSelect::new()
        .with_prompt("选择要导出的表（空格选择，回车确认；不选则导出全部）")
        .items(&table_labels(tables))
        .interact()
        .map_err(|e| SqldumpError::other(format!("交互选择失败: {e}")))?;

    Ok(chosen.into_iter().map(|i| tables[i].name.clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_takes_precedence() {
        let path = get_dump_path(Some(PathBuf::from("dump.sql"))).unwrap();
        assert_eq!(path, PathBuf::from("dump.sql"));
    }

    #[test]
    fn test_table_labels() {
        let labels = table_labels(&[TableInfo {
            name: "users".into(),
            line_from: 3,
            line_to: 9,
            statements: 2,
        }]);
        assert_eq!(labels, vec!["users (第3行起, 2 条 INSERT)"]);
    }

    #[test]
    fn test_select_from_empty_list() {
        assert!(select_tables(&[]).unwrap().is_empty());
    }
}
