//! 写入统计信息模块

/// 写入统计信息
#[derive(Debug, Default, Clone)]
pub struct WriteStats {
    /// 已写出的行数
    pub rows: u64,
    /// 已开始的表区段数
    pub tables: usize,
    /// 已写出的批次数
    pub batches: usize,
    /// 写入开始时间
    pub start_time: Option<std::time::Instant>,
    /// 写入完成时间
    pub end_time: Option<std::time::Instant>,
}

impl WriteStats {
    /// 创建新的统计信息，记录开始时间
    pub fn new() -> Self {
        Self {
            start_time: Some(std::time::Instant::now()),
            ..Default::default()
        }
    }

    /// 记录一个批次
    pub fn record_batch(&mut self, rows: usize) {
        self.batches += 1;
        self.rows += rows as u64;
    }

    /// 标记写入完成，记录结束时间
    pub fn finish(&mut self) {
        self.end_time = Some(std::time::Instant::now());
    }

    /// 计算写入持续时间
    pub fn duration(&self) -> Option<std::time::Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }

    /// 计算每秒写出行数
    pub fn rows_per_second(&self) -> Option<f64> {
        self.duration().map(|d| {
            if d.as_secs_f64() > 0.0 {
                self.rows as f64 / d.as_secs_f64()
            } else {
                0.0
            }
        })
    }

    /// 合并其他统计信息，保留最早的开始时间和最晚的结束时间
    pub fn merge(&mut self, other: &WriteStats) {
        self.rows += other.rows;
        self.tables += other.tables;
        self.batches += other.batches;

        self.start_time = match (self.start_time, other.start_time) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.end_time = match (self.end_time, other.end_time) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }
}

impl std::fmt::Display for WriteStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "表: {}, 批次: {}, 行: {}", self.tables, self.batches, self.rows)?;

        if let Some(duration) = self.duration() {
            write!(f, ", 耗时: {:.2}s", duration.as_secs_f64())?;

            if let Some(rps) = self.rows_per_second() {
                write!(f, ", 速度: {:.2} 行/秒", rps)?;
            }
        }
        Ok(())
    }
}
