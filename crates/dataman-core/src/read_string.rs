use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use encoding_rs::Encoding;
use roxmltree::{Document, Node};

use crate::error::AssembleError;

/// Element path of the read string inside the result XML
const FULL_STRING_PATH: [&str; 3] = ["result", "general", "full_string"];

/// Extract the read string from a reader result XML document.
///
/// Returns an empty string when `result/general/full_string` is absent. A
/// `full_string` marked `encoding="base64"` is decoded and its bytes are
/// interpreted with `encoding`; otherwise the inner text is returned as is.
pub fn read_string_from_xml(xml: &str, encoding: &'static Encoding) -> Result<String, AssembleError> {
    let doc = Document::parse(xml)?;

    let Some(node) = find_full_string(&doc) else {
        return Ok(String::new());
    };

    let text = inner_text(&node);

    if node.attribute("encoding") == Some("base64") {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Ok(String::new());
        }

        let bytes = STANDARD.decode(compact)?;
        let (decoded, _) = encoding.decode_without_bom_handling(&bytes);
        return Ok(decoded.into_owned());
    }

    Ok(text)
}

fn find_full_string<'a, 'input>(doc: &'a Document<'input>) -> Option<Node<'a, 'input>> {
    let root = doc.root_element();
    if root.tag_name().name() != FULL_STRING_PATH[0] {
        return None;
    }

    FULL_STRING_PATH[1..].iter().try_fold(root, |node, name| {
        node.children()
            .find(|child| child.is_element() && child.tag_name().name() == *name)
    })
}

fn inner_text(node: &Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_full_string() {
        let xml = r#"<result><general><full_string encoding="base64">SGVsbG8=</full_string></general></result>"#;
        let text = read_string_from_xml(xml, encoding_rs::UTF_8).unwrap();
        assert_eq!(text, "Hello");
    }

    #[test]
    fn test_plain_full_string() {
        let xml = r#"<result><general><full_string>ABC123</full_string></general></result>"#;
        let text = read_string_from_xml(xml, encoding_rs::UTF_8).unwrap();
        assert_eq!(text, "ABC123");
    }

    #[test]
    fn test_other_encoding_attribute_is_verbatim() {
        let xml = r#"<result><general><full_string encoding="ascii">SGVsbG8=</full_string></general></result>"#;
        let text = read_string_from_xml(xml, encoding_rs::UTF_8).unwrap();
        assert_eq!(text, "SGVsbG8=");
    }

    #[test]
    fn test_missing_full_string() {
        let xml = r#"<result><general><symbology>DataMatrix</symbology></general></result>"#;
        assert_eq!(read_string_from_xml(xml, encoding_rs::UTF_8).unwrap(), "");

        let wrong_root = r#"<report><general><full_string>X</full_string></general></report>"#;
        assert_eq!(read_string_from_xml(wrong_root, encoding_rs::UTF_8).unwrap(), "");
    }

    #[test]
    fn test_empty_base64_is_empty() {
        let xml = r#"<result><general><full_string encoding="base64"> </full_string></general></result>"#;
        assert_eq!(read_string_from_xml(xml, encoding_rs::UTF_8).unwrap(), "");
    }

    #[test]
    fn test_base64_with_line_breaks() {
        let xml = "<result><general><full_string encoding=\"base64\">SGVs\n  bG8=</full_string></general></result>";
        assert_eq!(read_string_from_xml(xml, encoding_rs::UTF_8).unwrap(), "Hello");
    }

    #[test]
    fn test_base64_uses_session_encoding() {
        // 0xE9 is 'é' in windows-1252 but invalid as UTF-8
        let xml = r#"<result><general><full_string encoding="base64">6Q==</full_string></general></result>"#;
        assert_eq!(read_string_from_xml(xml, encoding_rs::WINDOWS_1252).unwrap(), "é");
        assert_eq!(read_string_from_xml(xml, encoding_rs::UTF_8).unwrap(), "\u{fffd}");
    }

    #[test]
    fn test_malformed_input_is_an_error() {
        let broken_xml = "<result><general><full_string>ABC</general>";
        assert!(matches!(
            read_string_from_xml(broken_xml, encoding_rs::UTF_8),
            Err(AssembleError::Xml(_))
        ));

        let broken_base64 = r#"<result><general><full_string encoding="base64">%%%</full_string></general></result>"#;
        assert!(matches!(
            read_string_from_xml(broken_base64, encoding_rs::UTF_8),
            Err(AssembleError::Base64(_))
        ));
    }
}
