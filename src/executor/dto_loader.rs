// ==========================================
// 销售佣金 CRM - 提取数据加载器
// ==========================================
// 输入形态:
// - 直接的 DTO 对象数组
// - {"tabular_ref": {"path": ..., "format": "csv"|"xlsx"}} 表格文件引用
// 输出: 统一的 JSON 行数组（缺失 internal_uuid 的行补齐）,
//       由选定转换器的 parse_dtos 完成类型化
// ==========================================

use crate::executor::error::{ExecutionError, ExecutionResult};
use calamine::{open_workbook, Reader, Xlsx};
use csv::ReaderBuilder;
use serde_json::{json, Map, Value};
use std::fs::File;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

/// 将 extracted_data_json 展开为 DTO 行数组
pub fn load_rows(extracted: &Value) -> ExecutionResult<Vec<Value>> {
    let mut rows = match extracted {
        Value::Array(items) => items.clone(),
        Value::Object(obj) => match obj.get("tabular_ref") {
            Some(tabular) => load_tabular(tabular)?,
            None => {
                return Err(ExecutionError::DtoLoad(
                    "提取数据既不是数组也不是表格引用".to_string(),
                ))
            }
        },
        Value::Null => Vec::new(),
        _ => {
            return Err(ExecutionError::DtoLoad(
                "提取数据形态无法识别".to_string(),
            ))
        }
    };

    for row in &mut rows {
        ensure_internal_uuid(row);
    }

    debug!(row_count = rows.len(), "提取数据加载完成");
    Ok(rows)
}

/// 行对象缺失 internal_uuid 时补齐（创建波次解析片段时复用）
pub(crate) fn ensure_internal_uuid(row: &mut Value) {
    if let Value::Object(obj) = row {
        let missing = match obj.get("internal_uuid") {
            Some(Value::String(s)) => s.trim().is_empty(),
            _ => true,
        };
        if missing {
            obj.insert(
                "internal_uuid".to_string(),
                Value::String(Uuid::new_v4().to_string()),
            );
        }
    }
}

fn load_tabular(tabular: &Value) -> ExecutionResult<Vec<Value>> {
    let path = tabular
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| ExecutionError::DtoLoad("表格引用缺少 path".to_string()))?;
    let format = tabular
        .get("format")
        .and_then(Value::as_str)
        .map(str::to_lowercase)
        .unwrap_or_else(|| {
            Path::new(path)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase()
        });

    match format.as_str() {
        "csv" => load_csv(Path::new(path)),
        "xlsx" | "xls" => load_xlsx(Path::new(path)),
        other => Err(ExecutionError::DtoLoad(format!(
            "不支持的表格格式: {other}"
        ))),
    }
}

fn load_csv(path: &Path) -> ExecutionResult<Vec<Value>> {
    if !path.exists() {
        return Err(ExecutionError::DtoLoad(format!(
            "表格文件不存在: {}",
            path.display()
        )));
    }

    let file =
        File::open(path).map_err(|e| ExecutionError::DtoLoad(format!("打开文件失败: {e}")))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ExecutionError::DtoLoad(format!("CSV 表头读取失败: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| ExecutionError::DtoLoad(format!("CSV 行读取失败: {e}")))?;
        let mut obj = Map::new();
        for (col_idx, value) in record.iter().enumerate() {
            if let Some(header) = headers.get(col_idx) {
                obj.insert(header.clone(), coerce_cell(value.trim()));
            }
        }
        // 跳过完全空白的行
        if obj.values().all(Value::is_null) {
            continue;
        }
        rows.push(Value::Object(obj));
    }
    Ok(rows)
}

fn load_xlsx(path: &Path) -> ExecutionResult<Vec<Value>> {
    if !path.exists() {
        return Err(ExecutionError::DtoLoad(format!(
            "表格文件不存在: {}",
            path.display()
        )));
    }

    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e: calamine::XlsxError| ExecutionError::DtoLoad(format!("Excel 打开失败: {e}")))?;

    let sheet_names = workbook.sheet_names();
    let sheet_name = sheet_names
        .first()
        .cloned()
        .ok_or_else(|| ExecutionError::DtoLoad("Excel 文件无工作表".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ExecutionError::DtoLoad(format!("Excel 工作表读取失败: {e}")))?;

    let mut row_iter = range.rows();
    let header_row = row_iter
        .next()
        .ok_or_else(|| ExecutionError::DtoLoad("Excel 文件无数据行".to_string()))?;
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for data_row in row_iter {
        let mut obj = Map::new();
        for (col_idx, cell) in data_row.iter().enumerate() {
            if let Some(header) = headers.get(col_idx) {
                obj.insert(header.clone(), coerce_cell(cell.to_string().trim()));
            }
        }
        if obj.values().all(Value::is_null) {
            continue;
        }
        rows.push(Value::Object(obj));
    }
    Ok(rows)
}

/// 单元格字符串 → JSON 值（空 → null, 数字 → Number, 其余 → String）
fn coerce_cell(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = raw.parse::<i64>() {
        return json!(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return json!(f);
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_inline_array_fills_uuid() {
        let extracted = json!([
            {"order_number": "PO-1"},
            {"order_number": "PO-2", "internal_uuid": "u-2"}
        ]);
        let rows = load_rows(&extracted).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0]["internal_uuid"].as_str().is_some());
        assert_eq!(rows[1]["internal_uuid"], "u-2");
    }

    #[test]
    fn test_null_yields_empty() {
        assert!(load_rows(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_csv_tabular_ref() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "company_name,zip_code").unwrap();
        writeln!(temp_file, "Acme,90210").unwrap();
        writeln!(temp_file, ",").unwrap();
        writeln!(temp_file, "Beta,").unwrap();

        let extracted = json!({
            "tabular_ref": {"path": temp_file.path().to_str().unwrap(), "format": "csv"}
        });
        let rows = load_rows(&extracted).unwrap();
        // 空白行被跳过
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["company_name"], "Acme");
        assert_eq!(rows[0]["zip_code"], json!(90210));
        assert!(rows[1]["zip_code"].is_null());
        assert!(rows[0]["internal_uuid"].as_str().is_some());
    }

    #[test]
    fn test_unknown_shape_fails() {
        assert!(load_rows(&json!("not rows")).is_err());
        assert!(load_rows(&json!({"other": 1})).is_err());
    }
}
