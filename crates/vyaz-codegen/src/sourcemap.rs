//! Position maps and their Source Map v3 serialization

use serde::{Deserialize, Serialize};

use crate::error::CodegenError;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// One generated position paired with the source position it came from.
/// All coordinates are zero-based; columns count UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub generated_line: u32,
    pub generated_column: u32,
    /// Index into the map's `sources`
    pub source: u32,
    pub source_line: u32,
    pub source_column: u32,
}

impl Mapping {
    /// The same mapping moved down `lines` and right `columns`.
    pub fn shifted(self, lines: u32, columns: u32) -> Self {
        Self {
            generated_line: self.generated_line + lines,
            generated_column: self.generated_column + columns,
            ..self
        }
    }

    pub fn with_source(self, source: u32) -> Self {
        Self { source, ..self }
    }
}

/// Source Map revision 3
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<String>>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    /// Builds a map from mappings in emission order.
    pub fn new(
        file: Option<String>,
        sources: Vec<String>,
        sources_content: Option<Vec<String>>,
        mappings: &[Mapping],
    ) -> Self {
        Self {
            version: 3,
            file,
            sources,
            sources_content,
            names: Vec::new(),
            mappings: encode_mappings(mappings),
        }
    }

    pub fn to_json(&self) -> Result<String, CodegenError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, CodegenError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Encodes mappings into the `mappings` field: lines separated by `;`,
/// segments by `,`, each segment a run of base64 VLQ deltas.
pub fn encode_mappings(mappings: &[Mapping]) -> String {
    let mut out = String::new();
    let mut line = 0u32;
    let mut prev_column = 0i64;
    let mut prev_source = 0i64;
    let mut prev_source_line = 0i64;
    let mut prev_source_column = 0i64;
    let mut first_in_line = true;

    for mapping in mappings {
        while line < mapping.generated_line {
            out.push(';');
            line += 1;
            prev_column = 0;
            first_in_line = true;
        }
        if !first_in_line {
            out.push(',');
        }
        first_in_line = false;

        encode_vlq(&mut out, i64::from(mapping.generated_column) - prev_column);
        encode_vlq(&mut out, i64::from(mapping.source) - prev_source);
        encode_vlq(&mut out, i64::from(mapping.source_line) - prev_source_line);
        encode_vlq(&mut out, i64::from(mapping.source_column) - prev_source_column);

        prev_column = i64::from(mapping.generated_column);
        prev_source = i64::from(mapping.source);
        prev_source_line = i64::from(mapping.source_line);
        prev_source_column = i64::from(mapping.source_column);
    }
    out
}

/// Appends one base64 VLQ value: sign in the lowest bit, five bits per digit,
/// continuation in the sixth.
pub fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    loop {
        let mut digit = (vlq & 0b1_1111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b10_0000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vlq(value: i64) -> String {
        let mut out = String::new();
        encode_vlq(&mut out, value);
        out
    }

    fn mapping(generated: (u32, u32), source: (u32, u32)) -> Mapping {
        Mapping {
            generated_line: generated.0,
            generated_column: generated.1,
            source: 0,
            source_line: source.0,
            source_column: source.1,
        }
    }

    #[test]
    fn test_vlq_digits() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(123), "2H");
    }

    #[test]
    fn test_mappings_are_relative() {
        let mappings = [
            mapping((0, 0), (0, 0)),
            mapping((0, 4), (0, 6)),
            mapping((1, 2), (2, 0)),
        ];
        assert_eq!(encode_mappings(&mappings), "AAAA,IAAM;EAEN");
    }

    #[test]
    fn test_empty_lines_are_kept() {
        let mappings = [mapping((2, 0), (1, 0))];
        assert_eq!(encode_mappings(&mappings), ";;AACA");
    }

    #[test]
    fn test_json_shape() {
        let map = SourceMap::new(
            Some("main.js".to_string()),
            vec!["main.vz".to_string()],
            Some(vec!["пусть а = 1;".to_string()]),
            &[mapping((0, 0), (0, 0))],
        );
        let json = map.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], 3);
        assert_eq!(value["sources"][0], "main.vz");
        assert_eq!(value["sourcesContent"][0], "пусть а = 1;");
        assert_eq!(value["mappings"], "AAAA");
        assert_eq!(SourceMap::from_json(&json).unwrap(), map);
    }
}
