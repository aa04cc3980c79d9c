use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::ReportTable;
use crate::error::Result;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// BOM 付き UTF-8 の CSV を書き出す（表計算ソフトでの文字化け対策）
pub fn write_csv(table: &ReportTable, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(UTF8_BOM)?;

    let mut writer = ::csv::Writer::from_writer(file);
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_csv_with_bom() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("abc.csv");
        let table = ReportTable {
            headers: vec!["key".to_string(), "time_spent".to_string()],
            rows: vec![
                vec!["ABC-1".to_string(), "1,5".to_string()],
                vec!["ABC-2".to_string(), "0,0".to_string()],
            ],
        };

        write_csv(&table, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        // カンマを含む値は引用符で囲まれる
        assert_eq!(text, "key,time_spent\nABC-1,\"1,5\"\nABC-2,\"0,0\"\n");
    }
}
