use anyhow::{Context, Result};
use clap::Parser;
use sqldump_parser::config::Config;
use sqldump_parser::dump::OutputFormat;
use sqldump_parser::dump::discovery::scan_tables_with_limit;
use sqldump_parser::input_path::{get_dump_path, select_tables};
use sqldump_parser::pipeline::DumpProcessor;
use sqldump_parser::writer::{DumpWriter, MultiTableWriter, create_writer};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "sqldump-cli")]
#[command(about = "并发解析 SQL 转储文件中的 INSERT 语句并导出行数据", long_about = None)]
#[command(version)]
struct Cli {
    /// SQL 转储文件，省略时交互输入
    file: Option<PathBuf>,

    /// 输出格式: txt, csv, json, jsonl
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// 输出文件；分表模式下为输出目录。省略时输出到 stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 解析线程数，0 表示使用全部 CPU
    #[arg(short, long)]
    workers: Option<usize>,

    /// 每批次最多行数
    #[arg(long = "batch-size")]
    batch_size: Option<usize>,

    /// TOML 配置文件
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 每张表输出一个文件
    #[arg(long = "split-tables")]
    split_tables: bool,

    /// 只导出这些表，可重复或以逗号分隔
    #[arg(short, long = "table", value_delimiter = ',')]
    tables: Vec<String>,

    /// 列出转储中的表后退出
    #[arg(long = "list-tables")]
    list_tables: bool,

    /// 交互选择要导出的表
    #[arg(long)]
    select: bool,

    /// 语句错误输出文件（JSONL）
    #[arg(long = "errors-out")]
    errors_out: Option<PathBuf>,

    /// 不按提交顺序聚合（要求同一张表的 INSERT 连续出现）
    #[arg(long = "unordered")]
    unordered: bool,
}

impl Cli {
    /// 命令行参数覆盖配置文件
    fn apply(&self, config: &mut Config) {
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(output) = &self.output {
            config.output.path = Some(output.to_string_lossy().into_owned());
        }
        if self.split_tables {
            config.output.split_tables = true;
        }
        if let Some(workers) = self.workers {
            config.parser.worker_count = workers;
        }
        if let Some(batch_size) = self.batch_size {
            config.parser.batch_size = batch_size;
        }
        if let Some(errors_out) = &self.errors_out {
            config.parser.errors_out = Some(errors_out.to_string_lossy().into_owned());
        }
        if self.unordered {
            config.parser.preserve_order = false;
        }
    }
}

fn open_writer(config: &Config) -> Result<Box<dyn DumpWriter>> {
    let format = config.output.format;
    let path = config.output.path.as_deref();

    if config.output.split_tables {
        let dir = path.context("分表输出必须指定输出目录")?;
        return Ok(Box::new(MultiTableWriter::new(format, dir)?));
    }

    let output: Box<dyn Write + Send> = match path {
        Some(file) => Box::new(
            File::create(file).with_context(|| format!("无法创建输出文件: {file}"))?,
        ),
        None => Box::new(std::io::stdout()),
    };
    Ok(create_writer(format, output)?)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("无法加载配置文件: {}", path.display()))?,
        None => Config::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    #[cfg(feature = "logging")]
    sqldump_parser::logging::init_logging(
        sqldump_parser::logging::LogConfig::from_settings(
            &config.log.level,
            config.log.log_dir.as_deref(),
        )?,
    )?;

    let input = get_dump_path(cli.file.clone())?;
    if !input.exists() {
        anyhow::bail!("文件不存在: {}", input.display());
    }

    if cli.list_tables {
        let tables = scan_tables_with_limit(&input, config.parser.max_line_bytes)?;
        for table in &tables {
            println!(
                "{}\t{}\t{}\t{}",
                table.name, table.line_from, table.line_to, table.statements
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut tables = cli.tables.clone();
    if cli.select {
        let found = scan_tables_with_limit(&input, config.parser.max_line_bytes)?;
        tables.extend(select_tables(&found)?);
    }

    let mut processor = DumpProcessor::new(config.parser.clone());
    if !tables.is_empty() {
        tracing::info!("只导出表: {}", tables.join(", "));
        processor = processor.with_tables(tables);
    }

    let mut writer = open_writer(&config)?;
    let summary = processor.process_file(&input, writer.as_mut())?;

    let close_failed = match writer.close() {
        Ok(()) => false,
        Err(e) => {
            tracing::error!("关闭输出失败: {}", e);
            true
        }
    };
    tracing::info!("{} 写入统计: {}", writer.name(), writer.stats());

    if summary.has_write_errors() || close_failed {
        eprintln!("处理完成，但有 {} 次写入失败", summary.write_errors);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
