// ==========================================
// 生鲜配送拣选系统 - 表格文件读取
// ==========================================
// 支持: CSV (.csv) / Excel (.xlsx/.xls)
// 输出: 按表头命名的行记录 (HashMap<列名, 值>),空白行跳过
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook, Reader, Xlsx};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// 按表头命名的原始行记录
pub type RawRecord = HashMap<String, String>;

/// 读取表格文件 (按扩展名自动选择解析器)
pub fn read_table(path: &Path) -> ImportResult<Vec<RawRecord>> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "csv" => read_csv(path),
        "xlsx" | "xls" => read_excel(path),
        _ => Err(ImportError::UnsupportedFormat(ext)),
    }
}

/// 读取 CSV 文件
fn read_csv(path: &Path) -> ImportResult<Vec<RawRecord>> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // 允许行长度不一致
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ImportError::CsvParseError(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| ImportError::CsvParseError(e.to_string()))?;
        let row = zip_row(&headers, record.iter());
        if !row.values().all(|v| v.is_empty()) {
            records.push(row);
        }
    }

    Ok(records)
}

/// 读取 Excel 文件 (首个工作表)
fn read_excel(path: &Path) -> ImportResult<Vec<RawRecord>> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e: calamine::XlsxError| ImportError::ExcelParseError(e.to_string()))?;

    let sheet_names = workbook.sheet_names();
    let sheet_name = sheet_names
        .first()
        .cloned()
        .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| ImportError::EmptyFile(path.display().to_string()))?;
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();

    let mut records = Vec::new();
    for data_row in rows {
        let row = zip_row(&headers, data_row.iter().map(|c| c.to_string()));
        if !row.values().all(|v| v.is_empty()) {
            records.push(row);
        }
    }

    Ok(records)
}

/// 表头与单元格按列对齐为行记录 (值去首尾空白)
fn zip_row<I, S>(headers: &[String], cells: I) -> RawRecord
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut row = RawRecord::new();
    for (col_idx, value) in cells.into_iter().enumerate() {
        if let Some(header) = headers.get(col_idx) {
            row.insert(header.clone(), value.as_ref().trim().to_string());
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_read_csv_with_headers() {
        let file = csv_file("key,max_weight_kg\nSMALL,5.0\nMEDIUM,10.0\n");
        let records = read_table(file.path()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("key"), Some(&"SMALL".to_string()));
        assert_eq!(records[1].get("max_weight_kg"), Some(&"10.0".to_string()));
    }

    #[test]
    fn test_read_csv_skips_blank_rows() {
        let file = csv_file("key,max_weight_kg\nSMALL,5.0\n,\nMEDIUM,10.0\n");
        let records = read_table(file.path()).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_missing_file_rejected() {
        let result = read_table(Path::new("no_such_file.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        let result = read_table(file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }
}
