// ==========================================
// 生鲜配送拣选系统 - 导入层
// ==========================================
// 职责: 主数据 (箱型/覆写) 的文件导入
// ==========================================

pub mod error;
pub mod file_parser;
pub mod master_data_importer;

pub use error::{ImportError, ImportResult};
pub use master_data_importer::{
    ImportKind, ImportReport, MasterDataImporter, MasterDataImporterImpl, RowViolation,
};
