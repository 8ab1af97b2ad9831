use std::fmt;
use std::sync::{Arc, Mutex};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Kind of a single result item sent by the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    /// Decoded text
    ReadString,
    /// Decoded text wrapped in the reader's result XML
    ReadXml,
    /// Raw image bytes (bmp/png/jpeg)
    Image,
    /// SVG overlay describing where codes were found
    ImageGraphics,
}

impl ResultType {
    pub const ALL: [ResultType; 4] = [
        ResultType::ReadString,
        ResultType::ReadXml,
        ResultType::Image,
        ResultType::ImageGraphics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::ReadString => "ReadString",
            ResultType::ReadXml => "ReadXml",
            ResultType::Image => "Image",
            ResultType::ImageGraphics => "ImageGraphics",
        }
    }

    /// Parse a config label such as `read_xml` or `ImageGraphics`
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "readstring" | "string" => Some(ResultType::ReadString),
            "readxml" | "xml" => Some(ResultType::ReadXml),
            "image" => Some(ResultType::Image),
            "imagegraphics" | "graphics" => Some(ResultType::ImageGraphics),
            _ => None,
        }
    }

    pub fn mask(self) -> ResultTypes {
        match self {
            ResultType::ReadString => ResultTypes::READ_STRING,
            ResultType::ReadXml => ResultTypes::READ_XML,
            ResultType::Image => ResultTypes::IMAGE,
            ResultType::ImageGraphics => ResultTypes::IMAGE_GRAPHICS,
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Set of result kinds, used for the session subscription
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResultTypes: u32 {
        const READ_STRING = 1 << 0;
        const READ_XML = 1 << 1;
        const IMAGE = 1 << 2;
        const IMAGE_GRAPHICS = 1 << 3;
    }
}

impl ResultTypes {
    pub fn has(&self, result_type: ResultType) -> bool {
        self.contains(result_type.mask())
    }

    /// Kinds contained in the mask, in declaration order
    pub fn types(&self) -> impl Iterator<Item = ResultType> + '_ {
        ResultType::ALL.into_iter().filter(|t| self.has(*t))
    }
}

impl From<ResultType> for ResultTypes {
    fn from(value: ResultType) -> Self {
        value.mask()
    }
}

impl FromIterator<ResultType> for ResultTypes {
    fn from_iter<I: IntoIterator<Item = ResultType>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ResultTypes::empty(), |mask, t| mask | t.mask())
    }
}

impl fmt::Display for ResultTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }

        let names: Vec<&str> = self.types().map(|t| t.as_str()).collect();
        f.write_str(&names.join(" | "))
    }
}

/// Identifies a result item: its kind plus the trigger cycle it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultId {
    pub result_type: ResultType,
    pub id: i32,
}

impl ResultId {
    pub fn new(result_type: ResultType, id: i32) -> Self {
        Self { result_type, id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleResult {
    pub id: ResultId,
    pub data: Vec<u8>,
}

impl SimpleResult {
    pub fn new(result_type: ResultType, id: i32, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: ResultId::new(result_type, id),
            data: data.into(),
        }
    }

    pub fn result_type(&self) -> ResultType {
        self.id.result_type
    }

    /// Payload as text; invalid UTF-8 sequences are replaced
    pub fn data_as_string(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Everything the reader produced for one trigger cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplexResult {
    pub simple_results: Vec<SimpleResult>,
}

/// Complex result as handed out by a session. The producer may still hold a
/// reference, so consumers copy what they need under the lock.
pub type SharedComplexResult = Arc<Mutex<ComplexResult>>;

impl ComplexResult {
    pub fn new(simple_results: Vec<SimpleResult>) -> Self {
        Self { simple_results }
    }

    pub fn len(&self) -> usize {
        self.simple_results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.simple_results.is_empty()
    }

    pub fn result_types(&self) -> ResultTypes {
        self.simple_results.iter().map(|r| r.result_type()).collect()
    }

    pub fn into_shared(self) -> SharedComplexResult {
        Arc::new(Mutex::new(self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnecting => "Disconnecting",
        };
        f.write_str(s)
    }
}

/// A reader found during discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub name: String,
    pub port_name: String,
    pub baud_rate: u32,
}

/// Events delivered by a device session, from the session's own thread
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    Connected,
    Disconnected,
    ComplexResultCompleted(SharedComplexResult),
    /// A partial result that never completed into a complex result
    SimpleResultDropped(SimpleResult),
}

/// Events forwarded from the backend to the display thread
#[derive(Debug, Clone)]
pub enum AppEvent {
    ShowComplexResult(SharedComplexResult),
    ConnectionChanged(ConnectionState),
    ResultDropped(ResultId),
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_type_labels() {
        assert_eq!(ResultType::from_label("read_xml"), Some(ResultType::ReadXml));
        assert_eq!(ResultType::from_label(" ImageGraphics "), Some(ResultType::ImageGraphics));
        assert_eq!(ResultType::from_label("read-string"), Some(ResultType::ReadString));
        assert_eq!(ResultType::from_label("IMAGE"), Some(ResultType::Image));
        assert_eq!(ResultType::from_label("barcode"), None);
    }

    #[test]
    fn test_mask_display() {
        let mask = ResultTypes::READ_XML | ResultTypes::IMAGE | ResultTypes::IMAGE_GRAPHICS;
        assert_eq!(mask.to_string(), "ReadXml | Image | ImageGraphics");
        assert_eq!(ResultTypes::empty().to_string(), "None");
    }

    #[test]
    fn test_complex_result_types() {
        let complex = ComplexResult::new(vec![
            SimpleResult::new(ResultType::Image, 3, vec![1, 2, 3]),
            SimpleResult::new(ResultType::ReadString, 3, "ABC"),
            SimpleResult::new(ResultType::Image, 3, vec![4]),
        ]);

        let types = complex.result_types();
        assert!(types.has(ResultType::Image));
        assert!(types.has(ResultType::ReadString));
        assert!(!types.has(ResultType::ReadXml));
        assert_eq!(complex.len(), 3);
    }

    #[test]
    fn test_data_as_string_is_lossy() {
        let result = SimpleResult::new(ResultType::ReadString, 1, vec![b'A', 0xff, b'B']);
        assert_eq!(result.data_as_string(), "A\u{fffd}B");
    }
}
