use chrono::{TimeZone, Utc};
use satfmt::core::AbstractedMetadata;
use satfmt::io::dimap::{from_xml, to_xml};
use satfmt::product::{MetadataElement, MetadataValue, Product};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_metadata_tree_round_trip() {
    init_logging();
    let mut root = MetadataElement::new("metadata");
    root.set_attribute("PRODUCT", MetadataValue::Str("SCENE_42".to_string()));
    root.set_attribute("ABS_ORBIT", MetadataValue::Int(65432));
    root.set_attribute("centre_lat", MetadataValue::Double(47.123456789012345));
    root.set_attribute(
        "first_line_time",
        MetadataValue::Utc(Utc.with_ymd_and_hms(2008, 3, 15, 12, 30, 45).unwrap()),
    );
    let mut child = MetadataElement::new("Leader");
    child.set_attribute("quality", MetadataValue::Int(1));
    root.add_child(child);

    let xml = to_xml(&root);
    let parsed = from_xml(&xml).expect("Failed to re-parse emitted XML");
    assert_eq!(parsed, root);
}

#[test]
fn test_doubles_round_trip_exactly() {
    init_logging();
    let mut root = MetadataElement::new("m");
    for (i, v) in [
        0.1,
        -1.0 / 3.0,
        1e-308,
        6.378137e6,
        99999.0,
        f64::MAX,
    ]
    .iter()
    .enumerate()
    {
        root.set_attribute(&format!("v{}", i), MetadataValue::Double(*v));
    }
    let parsed = from_xml(&to_xml(&root)).unwrap();
    assert_eq!(parsed, root);
}

#[test]
fn test_escaped_names_and_values() {
    init_logging();
    let mut root = MetadataElement::new("m");
    root.set_attribute(
        "note",
        MetadataValue::Str("a < b && \"quoted\" > c".to_string()),
    );
    let parsed = from_xml(&to_xml(&root)).unwrap();
    assert_eq!(parsed, root);
}

#[test]
fn test_abstracted_metadata_survives_emission() {
    init_logging();
    let mut meta = AbstractedMetadata::new();
    meta.set_string("MISSION", "ERS-2");
    meta.set_string("PASS", "DESCENDING");
    meta.set_int("ABS_ORBIT", 65432);
    meta.set_double("range_spacing", 12.5);
    meta.set_utc(
        "first_line_time",
        Utc.with_ymd_and_hms(2008, 3, 15, 12, 30, 45).unwrap(),
    );

    let mut product = Product::new("SCENE_42", 4900, 26000);
    meta.attach_to(&mut product);

    let xml = to_xml(product.metadata_root());
    let parsed = from_xml(&xml).unwrap();
    let abstracted = parsed
        .child("Abstracted_Metadata")
        .expect("abstracted tree missing after round trip");
    assert_eq!(
        abstracted.get_attribute("MISSION"),
        Some(&MetadataValue::Str("ERS-2".to_string()))
    );
    assert_eq!(
        abstracted.get_attribute("ABS_ORBIT"),
        Some(&MetadataValue::Int(65432))
    );
    assert_eq!(
        abstracted.get_attribute("range_spacing"),
        Some(&MetadataValue::Double(12.5))
    );
    // Undeclared attributes stay declared-with-placeholder, not dropped.
    assert!(abstracted.get_attribute("radar_frequency").is_some());
}

#[test]
fn test_malformed_xml_is_an_error() {
    init_logging();
    assert!(from_xml("<MDElem name=\"m\"><MDATTR name=\"x\"").is_err());
    assert!(from_xml("<MDElem name=\"m\"><MDATTR name=\"x\" type=\"int64\">abc</MDATTR></MDElem>").is_err());
}
