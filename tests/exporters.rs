use health_report::config::ReportKind;
use health_report::error::AppError;
use health_report::exporters::{HealthExporter, ReportExporter, export_heart_rate};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/sample_export.xml");

fn write_zip(dir: &TempDir, entry: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join("export.zip");
    let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
    writer.start_file(entry, SimpleFileOptions::default()).unwrap();
    writer.write_all(content).unwrap();
    writer.finish().unwrap();
    path
}

fn assert_pdf(path: &Path) {
    let bytes = fs::read(path).unwrap();
    assert!(bytes.starts_with(b"%PDF-"), "{} is not a PDF", path.display());
}

#[test]
fn every_report_type_exports_from_xml() {
    let dir = tempfile::tempdir().unwrap();
    for kind in ReportKind::ALL {
        let output = dir.path().join(kind.default_output());
        tokio_test::block_on(HealthExporter.export(kind, Path::new(FIXTURE), &output, true)).unwrap();
        assert_pdf(&output);
    }
}

#[test]
fn zipped_export_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_zip(
        &dir,
        "apple_health_export/export.xml",
        &fs::read(FIXTURE).unwrap(),
    );
    let output = dir.path().join("sleep.pdf");
    tokio_test::block_on(HealthExporter.export(ReportKind::Sleep, &input, &output, false)).unwrap();
    assert_pdf(&output);
}

#[test]
fn zip_without_export_xml_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_zip(&dir, "apple_health_export/export_cda.xml", b"<ClinicalDocument/>");
    let output = dir.path().join("heart.pdf");
    let result = tokio_test::block_on(export_heart_rate(&input, &output, true));
    assert!(matches!(result, Err(AppError::ParseError(_))), "{:?}", result);
    assert!(!output.exists());
}

#[test]
fn export_without_matching_records_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("export.xml");
    fs::write(
        &input,
        r#"<?xml version="1.0" encoding="UTF-8"?>
<HealthData locale="en_US">
 <Record type="HKQuantityTypeIdentifierStepCount" sourceName="Phone" startDate="2024-03-02 10:00:00 +0100" endDate="2024-03-02 10:10:00 +0100" value="1200"/>
</HealthData>
"#,
    )
    .unwrap();
    let output = dir.path().join("medication.pdf");
    let result = tokio_test::block_on(HealthExporter.export(
        ReportKind::Medication,
        &input,
        &output,
        true,
    ));
    assert!(matches!(result, Err(AppError::NoRecords(_))), "{:?}", result);
    assert!(!output.exists());
}

#[test]
fn empty_input_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("export.xml");
    fs::write(&input, b"").unwrap();
    let output = dir.path().join("heart.pdf");
    let result = tokio_test::block_on(export_heart_rate(&input, &output, true));
    assert!(matches!(result, Err(AppError::InputFileError(_))), "{:?}", result);
}
