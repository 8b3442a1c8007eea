//! Analysis result model and JSON rendering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rank::RankedSection;
use crate::refine::RefinedSection;

/// Run metadata echoed into the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Base names of every requested document, readable or not
    pub input_documents: Vec<String>,
    pub persona: String,
    pub job_to_be_done: String,
    /// UTC, `YYYY-MM-DDTHH:MM:SSZ`
    pub processing_timestamp: String,
}

impl RunMetadata {
    pub fn new(
        input_documents: Vec<String>,
        persona: impl Into<String>,
        job_to_be_done: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            input_documents,
            persona: persona.into(),
            job_to_be_done: job_to_be_done.into(),
            processing_timestamp: format_timestamp(at),
        }
    }
}

/// Output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub metadata: RunMetadata,
    /// Ordered by rank ascending
    pub extracted_sections: Vec<RankedSection>,
    /// Ranked sections that yielded refined text, in rank order
    pub subsection_analysis: Vec<RefinedSection>,
}

impl AnalysisResult {
    /// A result with no sections.
    pub fn empty(metadata: RunMetadata) -> Self {
        Self {
            metadata,
            extracted_sections: Vec::new(),
            subsection_analysis: Vec::new(),
        }
    }
}

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Four-space indented JSON
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Serialize a result to JSON.
pub fn to_json(result: &AnalysisResult, format: JsonFormat) -> Result<String> {
    match format {
        JsonFormat::Compact => Ok(serde_json::to_string(result)?),
        JsonFormat::Pretty => {
            let mut buf = Vec::new();
            let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
            let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
            result.serialize(&mut ser)?;
            String::from_utf8(buf).map_err(|e| Error::Serialization(e.to_string()))
        }
    }
}

/// Format a timestamp the way the output metadata expects.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> AnalysisResult {
        let at = Utc.with_ymd_and_hms(2025, 7, 10, 15, 31, 22).unwrap();
        AnalysisResult {
            metadata: RunMetadata::new(
                vec!["a.pdf".to_string()],
                "HR professional",
                "Create fillable forms",
                at,
            ),
            extracted_sections: vec![RankedSection {
                document: "a.pdf".to_string(),
                section_title: "Fill and Sign".to_string(),
                importance_rank: 1,
                page_number: 2,
                section_index: 0,
                score: 0.7,
            }],
            subsection_analysis: vec![RefinedSection {
                document: "a.pdf".to_string(),
                refined_text: "Open the form.".to_string(),
                page_number: 2,
            }],
        }
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(sample().metadata.processing_timestamp, "2025-07-10T15:31:22Z");
    }

    #[test]
    fn test_to_json_pretty() {
        let json = to_json(&sample(), JsonFormat::Pretty).unwrap();
        assert!(json.contains("\n    \"metadata\": {"));
        assert!(json.contains("\"importance_rank\": 1"));
        assert!(!json.contains("section_index"));
    }

    #[test]
    fn test_to_json_compact() {
        let json = to_json(&sample(), JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_field_layout() {
        let value: serde_json::Value =
            serde_json::from_str(&to_json(&sample(), JsonFormat::Compact).unwrap()).unwrap();

        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert!(keys.contains(&"extracted_sections".to_string()));
        assert_eq!(value["metadata"]["persona"], "HR professional");
        assert_eq!(value["subsection_analysis"][0]["refined_text"], "Open the form.");
    }
}
