use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook};
use std::path::Path;

use super::ReportTable;
use crate::config::ExportConfig;
use crate::error::Result;

/// Excel のシート名の上限
const MAX_SHEET_NAME_LEN: usize = 31;

/// 1シートのブックを書き出す。ヘッダーは太字・固定、列幅は内容に合わせる
pub fn write_workbook(
    table: &ReportTable,
    path: &Path,
    project_key: &str,
    config: &ExportConfig,
) -> Result<()> {
    let mut workbook = Workbook::new();

    // ヘッダー: 青背景・白太字
    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x4472C4))
        .set_border(FormatBorder::Thin);

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name(config, project_key))?;

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_with_format(0, col as u16, header, &header_format)?;
    }

    for (idx, row) in table.rows.iter().enumerate() {
        let row_num = 1 + idx as u32;
        for (col, value) in row.iter().enumerate() {
            worksheet.write(row_num, col as u16, value)?;
        }
    }

    for (col, len) in table.column_lengths().into_iter().enumerate() {
        worksheet.set_column_width(col as u16, config.column_width(len) as f64)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    workbook.save(path)?;
    Ok(())
}

pub fn sheet_name(config: &ExportConfig, project_key: &str) -> String {
    config
        .sheet_name(project_key)
        .chars()
        .take(MAX_SHEET_NAME_LEN)
        .collect()
}
