use health_report::apple_health::types::{HealthRecord, parse_timestamp};
use health_report::error::AppError;
use health_report::xml_utils::{find_chunk_boundaries, find_chunk_boundaries_with, process_chunk_slice};
use quick_xml::Reader;
use quick_xml::events::Event;

fn keep_all(record: HealthRecord) -> Option<HealthRecord> {
    Some(record)
}

#[test]
fn record_from_xml_optional_fields() {
    let xml = r#"<Record type="HKQuantityTypeIdentifierHeartRate" value="60" startDate="2020-01-01 10:00:00 +0000" endDate="2020-01-01 10:00:00 +0000" sourceName="watch"/>"#;
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    match reader.read_event_into(&mut buf).unwrap() {
        Event::Empty(e) => {
            let rec = HealthRecord::from_xml(&e).unwrap();
            assert_eq!(rec.record_type, "HKQuantityTypeIdentifierHeartRate");
            assert_eq!(rec.value.as_deref(), Some("60"));
            assert_eq!(rec.unit, None);
            assert_eq!(rec.creation_date, None);
            assert_eq!(rec.source_name, "watch");
            assert!(rec.metadata.is_empty());
        }
        _ => panic!("Expected empty Record event"),
    }
}

#[test]
fn record_attribute_values_are_unescaped() {
    let chunk = br#"<Record type="T" sourceName="Tom &amp; Jerry" startDate="2020-01-01 10:00:00 +0000" endDate="2020-01-01 10:00:00 +0000"/>"#;
    let records = process_chunk_slice(chunk, &keep_all).unwrap();
    assert_eq!(records[0].source_name, "Tom & Jerry");
}

#[test]
fn numeric_value_reports_malformed_records() {
    let record = HealthRecord {
        record_type: "HKQuantityTypeIdentifierHeartRate".to_string(),
        value: Some("abc".to_string()),
        ..HealthRecord::default()
    };
    match record.numeric_value() {
        Err(AppError::MalformedRecord { record_type, .. }) => {
            assert_eq!(record_type, "HKQuantityTypeIdentifierHeartRate")
        }
        other => panic!("expected MalformedRecord, got {:?}", other),
    }
}

#[test]
fn timestamps_keep_their_offset() {
    let at = parse_timestamp("2024-03-01 23:30:00 +0100").unwrap();
    assert_eq!(at.offset().local_minus_utc(), 3600);
    assert_eq!(at.date_naive().to_string(), "2024-03-01");
    assert!(parse_timestamp("2024-03-01T23:30:00Z").is_err());
}

#[test]
fn find_chunk_boundaries_basic() {
    let xml = b"<Record/><Workout/><ActivitySummary/>";
    let boundaries = find_chunk_boundaries(xml);
    assert_eq!(boundaries, vec![0, xml.len()]);
}

#[test]
fn find_chunk_boundaries_multiple() {
    let element = b"<Record/>";
    let repeat = (2 * 1024 * 1024 / element.len()) + 10;
    let data = element.repeat(repeat);
    let boundaries = find_chunk_boundaries(&data);
    assert!(boundaries.len() > 2);
    assert_eq!(*boundaries.first().unwrap(), 0);
    assert_eq!(*boundaries.last().unwrap(), data.len());
}

#[test]
fn chunk_boundaries_only_fall_before_records() {
    let element = br#"<Record type="A" value="1"><MetadataEntry key="k" value="v"/><MetadataEntry key="j" value="w"/></Record>
"#;
    let data = element.repeat(50);
    let boundaries = find_chunk_boundaries_with(&data, 64);
    assert!(boundaries.len() > 10);
    for &b in &boundaries[1..boundaries.len() - 1] {
        assert!(data[b..].starts_with(b"<Record "), "boundary {} splits a record", b);
    }
    assert!(boundaries.windows(2).all(|w| w[0] < w[1]));

    let mut total = 0;
    for window in boundaries.windows(2) {
        let records = process_chunk_slice(&data[window[0]..window[1]], &keep_all).unwrap();
        for record in &records {
            assert_eq!(record.metadata.len(), 2);
        }
        total += records.len();
    }
    assert_eq!(total, 50);
}

#[test]
fn record_tag_prefixes_are_not_boundaries() {
    let mut data = Vec::new();
    data.extend_from_slice(b"<Records>");
    data.extend(std::iter::repeat_n(b' ', 100));
    data.extend_from_slice(b"<RecordCount value=\"1\"/>");
    data.extend_from_slice(b"<Record type=\"A\"/>");
    let boundaries = find_chunk_boundaries_with(&data, 10);
    assert_eq!(boundaries.len(), 3);
    assert!(data[boundaries[1]..].starts_with(b"<Record type"));
}

#[test]
fn process_chunk_slice_collects_metadata() {
    let chunk = br#"<Record type="HKMedicationDoseEvent" startDate="2024-03-01 08:00:00 +0100" endDate="2024-03-01 08:00:00 +0100">
  <MetadataEntry key="HKMedicationName" value="Aspirin"/>
  <MetadataEntry key="HKMedicationDoseEventStatus" value="HKMedicationDoseEventStatusTaken"/>
</Record>
<Record type="Steps" value="1" startDate="2020-01-01 10:00:00 +0000" endDate="2020-01-01 10:00:00 +0000" sourceName="watch"/>"#;
    let records = process_chunk_slice(chunk, &keep_all).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].metadata_value("HKMedicationName"), Some("Aspirin"));
    assert_eq!(
        records[0].metadata_value("HKMedicationDoseEventStatus"),
        Some("HKMedicationDoseEventStatusTaken")
    );
    assert!(records[1].metadata.is_empty());
}

#[test]
fn process_chunk_slice_reads_nested_and_dangling_records() {
    // a chunk that starts inside a Correlation and closes it
    let chunk = br#"<Record type="Systolic" value="120" startDate="2020-01-01 10:00:00 +0000" endDate="2020-01-01 10:00:00 +0000"/>
 </Correlation>
 <Record type="Steps" value="5" startDate="2020-01-01 10:00:00 +0000" endDate="2020-01-01 10:00:00 +0000"/>
</HealthData>"#;
    let records = process_chunk_slice(chunk, &keep_all).unwrap();
    let types: Vec<&str> = records.iter().map(|r| r.record_type.as_str()).collect();
    assert_eq!(types, vec!["Systolic", "Steps"]);
}

#[test]
fn process_chunk_slice_applies_conversion() {
    let chunk = br#"<Record type="A" value="1"/><Record type="B" value="2"/><Record type="A" value="3"/>"#;
    let values = process_chunk_slice(chunk, &|r: HealthRecord| {
        (r.record_type == "A").then(|| r.value.unwrap_or_default())
    })
    .unwrap();
    assert_eq!(values, vec!["1".to_string(), "3".to_string()]);
}

#[test]
fn process_chunk_slice_rejects_broken_xml() {
    let chunk = br#"<Record type="A" value="1"/><Record type="B""#;
    let result = process_chunk_slice(chunk, &keep_all);
    assert!(matches!(
        result,
        Err(AppError::XmlParseError(_)) | Err(AppError::ParseError(_))
    ));
}
