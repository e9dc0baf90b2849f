//! 分表写入器
//!
//! 每个表区段输出到 `<目录>/<表名>.<扩展名>`，同一张表在转储中再次出现时
//! 写入 `<表名>.partN.<扩展名>`，不会覆盖之前的文件。
//! 不同表名清理后得到相同文件名时，后出现的表追加 `_N` 后缀。

use super::{DumpWriter, WriteStats, create_writer};
use crate::dump::types::{OutputFormat, Row};
use crate::error::{Result, SqldumpError};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};

/// 分表写入器
pub struct MultiTableWriter {
    format: OutputFormat,
    base_dir: PathBuf,
    current: Option<(String, Box<dyn DumpWriter>)>,
    sections: HashMap<String, usize>,
    used_paths: HashSet<PathBuf>,
    stats: WriteStats,
}

impl MultiTableWriter {
    /// 在指定目录下创建分表写入器，目录不存在时自动创建
    pub fn new<P: AsRef<Path>>(format: OutputFormat, base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;
        tracing::info!("分表输出目录: {}", base_dir.display());

        Ok(Self {
            format,
            base_dir,
            current: None,
            sections: HashMap::new(),
            used_paths: HashSet::new(),
            stats: WriteStats::new(),
        })
    }

    /// 输出目录
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// 表名对应的输出文件路径
    pub fn table_path(&self, table_name: &str, section: usize) -> PathBuf {
        self.path_for_stem(&sanitize_file_name(table_name), section)
    }

    fn path_for_stem(&self, stem: &str, section: usize) -> PathBuf {
        let file_name = if section <= 1 {
            format!("{}.{}", stem, self.format.extension())
        } else {
            format!("{}.part{}.{}", stem, section, self.format.extension())
        };
        self.base_dir.join(file_name)
    }

    /// 为表区段分配本次运行中未使用过的路径
    fn allocate_path(&mut self, table_name: &str, section: usize) -> PathBuf {
        let stem = sanitize_file_name(table_name);
        let mut path = self.path_for_stem(&stem, section);
        let mut suffix = 1;
        while self.used_paths.contains(&path) {
            suffix += 1;
            path = self.path_for_stem(&format!("{stem}_{suffix}"), section);
        }
        if suffix > 1 {
            tracing::warn!(
                "表 {} 的文件名与其他表冲突，改为写入 {}",
                table_name,
                path.display()
            );
        }
        self.used_paths.insert(path.clone());
        path
    }
}

/// 把表名转换为安全的文件名
fn sanitize_file_name(table_name: &str) -> String {
    let name: String = table_name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() || name.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        name
    }
}

impl DumpWriter for MultiTableWriter {
    fn name(&self) -> &str {
        "MULTI"
    }

    fn write_table_start(&mut self, table_name: &str) -> Result<()> {
        if self.current.is_some() {
            self.write_table_end()?;
        }

        let section = {
            let count = self.sections.entry(table_name.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let path = self.allocate_path(table_name, section);
        if section > 1 {
            tracing::warn!(
                "表 {} 在转储中不连续，第 {} 段写入 {}",
                table_name,
                section,
                path.display()
            );
        }

        let file = File::create(&path).map_err(|e| {
            SqldumpError::write_error(
                table_name,
                format!("无法创建文件 {}: {}", path.display(), e),
            )
        })?;
        let mut writer = create_writer(self.format, Box::new(file))?;
        writer.write_table_start(table_name)?;

        tracing::debug!("表 {} 输出到 {}", table_name, path.display());
        self.current = Some((table_name.to_string(), writer));
        Ok(())
    }

    fn write_rows(&mut self, rows: &[Row]) -> Result<()> {
        let Some(first) = rows.first() else {
            return Ok(());
        };
        match self.current.as_mut() {
            Some((name, writer)) if name.as_str() == &*first.table_name => {
                writer.write_rows(rows)
            }
            _ => Err(SqldumpError::write_error(
                first.table_name.to_string(),
                "没有该表的写入器",
            )),
        }
    }

    fn write_table_end(&mut self) -> Result<()> {
        let Some((name, mut writer)) = self.current.take() else {
            return Ok(());
        };
        writer.write_table_end()?;
        writer.close()?;
        let table_stats = writer.stats();
        tracing::debug!("表 {} 写入完成: {}", name, table_stats);
        self.stats.merge(&table_stats);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.write_table_end()?;
        self.stats.finish();
        tracing::info!("分表写入完成: {}", self.stats);
        Ok(())
    }

    fn stats(&self) -> WriteStats {
        self.stats.clone()
    }
}
