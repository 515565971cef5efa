//! DIMAP-style metadata emission: the metadata tree serialized as element
//! XML and re-parsed losslessly, used for sidecar headers and caching.

use crate::product::{MetadataElement, MetadataValue};
use crate::types::{FmtResult, FormatError};
use chrono::{DateTime, Utc};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

fn type_tag(value: &MetadataValue) -> &'static str {
    match value {
        MetadataValue::Str(_) => "ascii",
        MetadataValue::Int(_) => "int64",
        MetadataValue::Double(_) => "float64",
        MetadataValue::Utc(_) => "utc",
    }
}

fn value_text(value: &MetadataValue) -> String {
    match value {
        MetadataValue::Str(s) => s.clone(),
        MetadataValue::Int(v) => v.to_string(),
        // Display round-trips f64 exactly, comfortably covering the legacy
        // 6-significant-digit emission boundary.
        MetadataValue::Double(v) => v.to_string(),
        MetadataValue::Utc(t) => t.to_rfc3339(),
    }
}

fn write_element(elem: &MetadataElement, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    out.push_str(&format!("{}<MDElem name=\"{}\">\n", pad, escape(&elem.name)));
    for (name, value) in elem.attributes() {
        out.push_str(&format!(
            "{}  <MDATTR name=\"{}\" type=\"{}\">{}</MDATTR>\n",
            pad,
            escape(name),
            type_tag(value),
            escape(&value_text(value))
        ));
    }
    for child in elem.children() {
        write_element(child, indent + 1, out);
    }
    out.push_str(&format!("{}</MDElem>\n", pad));
}

/// Emit a metadata tree as DIMAP-style element XML.
pub fn to_xml(root: &MetadataElement) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    write_element(root, 0, &mut out);
    out
}

fn parse_value(kind: &str, text: &str) -> FmtResult<MetadataValue> {
    match kind {
        "ascii" => Ok(MetadataValue::Str(text.to_string())),
        "int64" => text
            .parse::<i64>()
            .map(MetadataValue::Int)
            .map_err(|_| FormatError::Xml(format!("bad int64 attribute value {:?}", text))),
        "float64" => text
            .parse::<f64>()
            .map(MetadataValue::Double)
            .map_err(|_| FormatError::Xml(format!("bad float64 attribute value {:?}", text))),
        "utc" => DateTime::parse_from_rfc3339(text)
            .map(|t| MetadataValue::Utc(t.with_timezone(&Utc)))
            .map_err(|_| FormatError::Xml(format!("bad utc attribute value {:?}", text))),
        other => Err(FormatError::Xml(format!("unknown attribute type {:?}", other))),
    }
}

fn name_attr(e: &quick_xml::events::BytesStart<'_>) -> FmtResult<String> {
    let attr = e
        .try_get_attribute("name")
        .map_err(|err| FormatError::Xml(err.to_string()))?
        .ok_or_else(|| FormatError::Xml("element without name attribute".to_string()))?;
    Ok(attr
        .unescape_value()
        .map_err(|err| FormatError::Xml(err.to_string()))?
        .into_owned())
}

/// Re-parse DIMAP-style element XML into a metadata tree.
pub fn from_xml(xml: &str) -> FmtResult<MetadataElement> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<MetadataElement> = Vec::new();
    let mut root: Option<MetadataElement> = None;
    let mut pending_attr: Option<(String, String)> = None;
    let mut pending_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"MDElem" => {
                    stack.push(MetadataElement::new(&name_attr(&e)?));
                }
                b"MDATTR" => {
                    let name = name_attr(&e)?;
                    let kind = e
                        .try_get_attribute("type")
                        .map_err(|err| FormatError::Xml(err.to_string()))?
                        .ok_or_else(|| {
                            FormatError::Xml("MDATTR without type attribute".to_string())
                        })?
                        .unescape_value()
                        .map_err(|err| FormatError::Xml(err.to_string()))?
                        .into_owned();
                    pending_attr = Some((name, kind));
                    pending_text.clear();
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if pending_attr.is_some() {
                    pending_text.push_str(
                        &t.unescape()
                            .map_err(|err| FormatError::Xml(err.to_string()))?,
                    );
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"MDATTR" => {
                    let (name, kind) = pending_attr.take().ok_or_else(|| {
                        FormatError::Xml("unbalanced MDATTR end tag".to_string())
                    })?;
                    let value = parse_value(&kind, &pending_text)?;
                    let parent = stack.last_mut().ok_or_else(|| {
                        FormatError::Xml("MDATTR outside of MDElem".to_string())
                    })?;
                    parent.set_attribute(&name, value);
                }
                b"MDElem" => {
                    let elem = stack
                        .pop()
                        .ok_or_else(|| FormatError::Xml("unbalanced MDElem end tag".to_string()))?;
                    if let Some(parent) = stack.last_mut() {
                        parent.add_child(elem);
                    } else {
                        root = Some(elem);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(FormatError::Xml(e.to_string())),
        }
    }

    root.ok_or_else(|| FormatError::Xml("no MDElem root found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_tree() -> MetadataElement {
        let mut root = MetadataElement::new("metadata");
        root.set_attribute("PRODUCT", MetadataValue::Str("SCENE_42".to_string()));
        root.set_attribute("num_output_lines", MetadataValue::Int(26000));
        root.set_attribute("range_spacing", MetadataValue::Double(12.5));
        root.set_attribute("incidence_near", MetadataValue::Double(23.1456));
        root.set_attribute(
            "first_line_time",
            MetadataValue::Utc(Utc.with_ymd_and_hms(2008, 3, 15, 12, 30, 45).unwrap()),
        );

        let mut child = MetadataElement::new("Leader");
        child.set_attribute("centre_lat", MetadataValue::Double(-47.123456));
        child.set_attribute("note", MetadataValue::Str("a < b & c".to_string()));
        root.add_child(child);
        root
    }

    #[test]
    fn test_round_trip_preserves_everything() {
        let tree = sample_tree();
        let xml = to_xml(&tree);
        let parsed = from_xml(&xml).unwrap();
        assert_eq!(parsed, tree);
    }

    #[test]
    fn test_six_significant_digit_values_survive() {
        let mut root = MetadataElement::new("metadata");
        let values = [
            123456.0_f64,
            1.23456,
            0.000123456,
            -98765.4,
            829924.0,
            1e-6,
        ];
        for (i, v) in values.iter().enumerate() {
            root.set_attribute(&format!("v{}", i), MetadataValue::Double(*v));
        }
        let parsed = from_xml(&to_xml(&root)).unwrap();
        for (i, v) in values.iter().enumerate() {
            match parsed.get_attribute(&format!("v{}", i)) {
                Some(MetadataValue::Double(p)) => assert_eq!(p, v),
                other => panic!("unexpected value {:?}", other),
            }
        }
    }

    #[test]
    fn test_escaped_characters() {
        let mut root = MetadataElement::new("a&b");
        root.set_attribute("x", MetadataValue::Str("<tag>".to_string()));
        let parsed = from_xml(&to_xml(&root)).unwrap();
        assert_eq!(parsed.name, "a&b");
        assert_eq!(
            parsed.get_attribute("x"),
            Some(&MetadataValue::Str("<tag>".to_string()))
        );
    }

    #[test]
    fn test_malformed_input() {
        assert!(from_xml("<MDElem name=\"x\">").is_err());
        assert!(from_xml("no xml at all").is_err());
    }
}
