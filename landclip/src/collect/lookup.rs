use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::info;

use crate::collect::global_variables::{DEFAULT_LOOKUP_DELIMITER, DEFAULT_LOOKUP_ENCODING};
use crate::collect::LookupSource;
use crate::geometric::CodeLookup;

/// Reads a two-column `code,label` table.
///
/// Files are decoded with `encoding` first, so Latin-1 tables exported from
/// desktop GIS tools load without mangling accents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvLookupSource {
    pub delimiter: u8,
    pub has_headers: bool,
    /// WHATWG encoding label, e.g. "UTF-8" or "ISO-8859-1"
    pub encoding: String,
}

impl Default for CsvLookupSource {
    fn default() -> Self {
        CsvLookupSource {
            delimiter: DEFAULT_LOOKUP_DELIMITER,
            has_headers: true,
            encoding: DEFAULT_LOOKUP_ENCODING.to_string(),
        }
    }
}

impl CsvLookupSource {
    /// Decode raw bytes and parse them
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<CodeLookup> {
        let encoding = encoding_rs::Encoding::for_label(self.encoding.as_bytes())
            .with_context(|| format!("Unknown text encoding: {}", self.encoding))?;
        let (decoded, _, _) = encoding.decode(bytes);
        self.parse_str(decoded.as_ref())
    }

    pub fn parse_str(&self, text: &str) -> Result<CodeLookup> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(self.has_headers)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut pairs = Vec::new();
        for (index, result) in rdr.records().enumerate() {
            let record = result.context("Failed to read lookup record")?;
            let line = record.position().map(|p| p.line()).unwrap_or(index as u64 + 1);

            let (Some(code), Some(label)) = (record.get(0), record.get(1)) else {
                anyhow::bail!("Lookup line {} needs a code and a label", line);
            };
            let code: i32 = code
                .trim()
                .parse()
                .with_context(|| format!("Invalid category code {:?} on line {}", code, line))?;
            pairs.push((code, label.trim().to_string()));
        }

        Ok(CodeLookup::from_pairs(pairs)?)
    }
}

impl LookupSource for CsvLookupSource {
    fn load_lookup(&self, path: &Path) -> Result<CodeLookup> {
        let file =
            File::open(path).with_context(|| format!("Failed to open lookup file: {:?}", path))?;
        let mut buffer = Vec::new();
        BufReader::new(file)
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read lookup file: {:?}", path))?;

        let lookup = self
            .parse_bytes(&buffer)
            .with_context(|| format!("Invalid lookup file: {:?}", path))?;
        info!("Loaded {} category labels from {:?}", lookup.len(), path);
        Ok(lookup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClipError;

    #[test]
    fn test_parse_with_headers() {
        let text = "code,label\n11,Open Water\n21,\"Developed, Open Space\"\n\n90, Woody Wetlands \n";
        let lookup = CsvLookupSource::default().parse_str(text).unwrap();
        assert_eq!(lookup.len(), 3);
        assert_eq!(lookup.label(11), Some("Open Water"));
        assert_eq!(lookup.label(21), Some("Developed, Open Space"));
        assert_eq!(lookup.label(90), Some("Woody Wetlands"));
    }

    #[test]
    fn test_parse_semicolon_latin1() {
        let source = CsvLookupSource {
            delimiter: b';',
            has_headers: false,
            encoding: "ISO-8859-1".to_string(),
        };
        // "5;Pelouse\n6;Sol nu\n2;Bâti\n" in Latin-1
        let mut bytes = b"5;Pelouse\n6;Sol nu\n2;B".to_vec();
        bytes.push(0xE2);
        bytes.extend_from_slice(b"ti\n");

        let lookup = source.parse_bytes(&bytes).unwrap();
        assert_eq!(lookup.label(2), Some("Bâti"));
        assert_eq!(lookup.label(6), Some("Sol nu"));
    }

    #[test]
    fn test_parse_rejects_duplicates_and_bad_codes() {
        let source = CsvLookupSource::default();
        let err = source.parse_str("code,label\n1,Water\n1,Lake\n").unwrap_err();
        assert_eq!(
            err.downcast_ref::<ClipError>(),
            Some(&ClipError::DuplicateCode(1))
        );

        assert!(source.parse_str("code,label\nwater,1\n").is_err());
        assert!(source.parse_str("code,label\n7\n").is_err());
    }

    #[test]
    fn test_unknown_encoding() {
        let source = CsvLookupSource {
            encoding: "klingon".to_string(),
            ..CsvLookupSource::default()
        };
        assert!(source.parse_bytes(b"1,Water\n").is_err());
    }

    #[test]
    fn test_load_lookup_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nlcd.csv");
        std::fs::write(&path, "code,label\n41,Deciduous Forest\n42,Evergreen Forest\n").unwrap();

        let lookup = CsvLookupSource::default().load_lookup(&path).unwrap();
        assert_eq!(lookup.label(42), Some("Evergreen Forest"));
    }
}
