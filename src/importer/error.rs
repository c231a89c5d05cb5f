// ==========================================
// 生鲜配送拣选系统 - 导入层错误类型
// ==========================================

use thiserror::Error;

/// 导入层错误类型
///
/// 文件级问题才是错误; 行级问题进 DQ 报告,不中断批次
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("不支持的文件格式: {0}")]
    UnsupportedFormat(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("文件无数据行: {0}")]
    EmptyFile(String),

    #[error("落库失败: {0}")]
    PersistError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
