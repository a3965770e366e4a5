use chrono::{Local, NaiveDate};
use clap::Args;
use std::path::{Path, PathBuf};
use tenant_arrears::config::{AppConfig, ReportConfig};
use tenant_arrears::error::AppError;
use tenant_arrears::telemetry;
use tenant_arrears::workflows::arrears::{
    ArrearsReport, ArrearsReportError, ArrearsReportGenerator, GeneratedReport, SourceInput,
};

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Arrears list workbook (first sheet: code in C, period in H, amount in K)
    #[arg(long)]
    pub(crate) arrears: PathBuf,
    /// Resident directory workbook containing the configured directory sheet
    #[arg(long)]
    pub(crate) residents: PathBuf,
    /// Where to write the report (defaults to <ARREARS_OUTPUT_DIR>/處理結果_<date>.xlsx)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Date embedded in the default file name (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Print every merged row after the summary
    #[arg(long)]
    pub(crate) list_rows: bool,
}

pub(crate) async fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let list_rows = args.list_rows;
    let (generated, output) = write_report(&config.report, args).await?;
    render_report(&generated.report, &output, list_rows);
    Ok(())
}

/// Reads both workbooks concurrently, merges them and writes the result.
pub(crate) async fn write_report(
    config: &ReportConfig,
    args: ReportArgs,
) -> Result<(GeneratedReport, PathBuf), AppError> {
    let generator = ArrearsReportGenerator::new(config);
    let (arrears, residents) = read_sources(&args.arrears, &args.residents).await?;
    let generated = generator.generate(&arrears, &residents)?;

    let output = args.output.unwrap_or_else(|| {
        let today = args.today.unwrap_or_else(|| Local::now().date_naive());
        config.output_dir.join(generator.report_file_name(today))
    });
    tokio::fs::write(&output, &generated.workbook).await?;

    Ok((generated, output))
}

async fn read_sources(
    arrears: &Path,
    residents: &Path,
) -> Result<(Vec<u8>, Vec<u8>), ArrearsReportError> {
    tokio::try_join!(
        read_source(arrears, SourceInput::Arrears),
        read_source(residents, SourceInput::Residents),
    )
}

async fn read_source(path: &Path, input: SourceInput) -> Result<Vec<u8>, ArrearsReportError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| ArrearsReportError::Io {
            input,
            path: path.to_path_buf(),
            source,
        })
}

fn render_report(report: &ArrearsReport, output: &Path, list_rows: bool) {
    let summary = report.summary();

    println!("Arrears report written to {}", output.display());
    println!("  rows written:          {}", summary.rows_written);
    println!("  rows without code:     {}", summary.skipped_without_code);
    println!("  unmatched residents:   {}", summary.unmatched_residents);
    println!("  skipped with warnings: {}", summary.warnings);

    for warning in &report.warnings {
        println!("  - {warning}");
    }

    if list_rows {
        println!();
        for row in &report.rows {
            println!("{}", row.cells().join(" | "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use tenant_arrears::config::DEFAULT_RESIDENT_SHEET;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "tenant-arrears-{}-{}",
            name,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).expect("scratch dir");
        dir
    }

    fn write_fixtures(dir: &Path) -> (PathBuf, PathBuf) {
        let mut arrears = Workbook::new();
        let sheet = arrears.add_worksheet();
        sheet.write_string(0, 2, "代碼").expect("header");
        sheet.write_number(1, 2, 530902).expect("code");
        sheet.write_string(1, 7, "2026/01/01~2026/02/01").expect("period");
        sheet.write_number(1, 10, 1200).expect("amount");
        let arrears_path = dir.join("arrears.xlsx");
        arrears.save(&arrears_path).expect("save arrears");

        let mut residents = Workbook::new();
        let sheet = residents.add_worksheet();
        sheet.set_name(DEFAULT_RESIDENT_SHEET).expect("sheet name");
        sheet.write_string(0, 2, "地址").expect("header");
        sheet
            .write_string(1, 2, "新北市新店區中央路153號9樓之2")
            .expect("address");
        sheet.write_string(1, 7, "王小明").expect("name");
        sheet.write_string(1, 8, "0912345678").expect("phone");
        let residents_path = dir.join("residents.xlsx");
        residents.save(&residents_path).expect("save residents");

        (arrears_path, residents_path)
    }

    #[tokio::test]
    async fn writes_dated_report_into_output_dir() {
        let dir = scratch_dir("report");
        let (arrears, residents) = write_fixtures(&dir);
        let config = ReportConfig {
            output_dir: dir.clone(),
            ..ReportConfig::default()
        };
        let args = ReportArgs {
            arrears,
            residents,
            output: None,
            today: NaiveDate::from_ymd_opt(2026, 2, 15),
            list_rows: false,
        };

        let (generated, output) = write_report(&config, args).await.expect("report runs");

        assert_eq!(output, dir.join("處理結果_2026-02-15.xlsx"));
        assert!(output.exists());
        assert_eq!(generated.report.rows.len(), 1);
        assert_eq!(generated.report.rows[0].fee_period, "115年1月至115年2月");
        assert_eq!(generated.report.rows[0].display_amount, "1,200");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn missing_source_file_names_the_input() {
        let dir = scratch_dir("missing");
        let (arrears, _) = write_fixtures(&dir);
        let args = ReportArgs {
            arrears,
            residents: dir.join("no-such-file.xlsx"),
            output: Some(dir.join("out.xlsx")),
            today: None,
            list_rows: false,
        };

        let error = write_report(&ReportConfig::default(), args)
            .await
            .expect_err("residents file missing");

        match error {
            AppError::Report(ArrearsReportError::Io { input, .. }) => {
                assert_eq!(input, SourceInput::Residents)
            }
            other => panic!("expected io error, got {other:?}"),
        }
        assert!(!dir.join("out.xlsx").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
