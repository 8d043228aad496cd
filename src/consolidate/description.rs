// src/consolidate/description.rs
//! The terminal artifact: six canonical sections, all always populated.
//! The backend is an untrusted text producer, so parsing is defensive:
//! fences and surrounding prose are tolerated, missing keys are not.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// Placeholder for a section the sources said nothing about. Downstream
/// export must stay deterministic, so a field is never absent.
pub const NOT_SPECIFIED: &str = "Not specified";

/// Section labels in the fixed export order. This ordering is the de-facto
/// export format and must not change under downstream consumers.
pub const SECTION_LABELS: [&str; 6] = [
    "Overview",
    "Responsibilities",
    "Required Qualifications",
    "Preferred Qualifications",
    "Key Competencies",
    "Work Environment",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancedJobDescription {
    pub overview: String,
    pub responsibilities: Vec<String>,
    pub required_qualifications: Vec<String>,
    pub preferred_qualifications: Vec<String>,
    pub key_competencies: Vec<String>,
    pub work_environment: String,
}

impl EnhancedJobDescription {
    /// Plain-text export: six labeled sections in [`SECTION_LABELS`] order.
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        push_text_section(&mut out, SECTION_LABELS[0], &self.overview);
        push_list_section(&mut out, SECTION_LABELS[1], &self.responsibilities);
        push_list_section(&mut out, SECTION_LABELS[2], &self.required_qualifications);
        push_list_section(&mut out, SECTION_LABELS[3], &self.preferred_qualifications);
        push_list_section(&mut out, SECTION_LABELS[4], &self.key_competencies);
        push_text_section(&mut out, SECTION_LABELS[5], &self.work_environment);
        out.trim_end().to_string()
    }
}

fn push_text_section(out: &mut String, label: &str, body: &str) {
    out.push_str(label);
    out.push_str(":\n");
    out.push_str(body);
    out.push_str("\n\n");
}

fn push_list_section(out: &mut String, label: &str, items: &[String]) {
    out.push_str(label);
    out.push_str(":\n");
    for item in items {
        out.push_str("- ");
        out.push_str(item);
        out.push('\n');
    }
    out.push('\n');
}

/// File name for a downloaded description, safe for filesystems:
/// `<company>_<title>_enhanced.txt` with spaces underscored and slashes
/// dashed (titles like "Deputy/ Assistant Director" are common).
pub fn export_file_name(company: &str, title: &str) -> String {
    format!("{}_{}_enhanced.txt", company.trim(), title.trim())
        .replace(' ', "_")
        .replace('/', "-")
}

/// Raw wire shape. The backend is asked for snake_case keys but models drift
/// into other casings, so aliases are accepted; absent keys stay `None` and
/// fail the shape check below.
#[derive(Debug, Deserialize)]
struct RawDescription {
    #[serde(alias = "Overview")]
    overview: Option<FieldValue>,
    #[serde(alias = "Responsibilities")]
    responsibilities: Option<FieldValue>,
    #[serde(alias = "requiredQualifications", alias = "Required Qualifications")]
    required_qualifications: Option<FieldValue>,
    #[serde(alias = "preferredQualifications", alias = "Preferred Qualifications")]
    preferred_qualifications: Option<FieldValue>,
    #[serde(alias = "keyCompetencies", alias = "Key Competencies")]
    key_competencies: Option<FieldValue>,
    #[serde(alias = "workEnvironment", alias = "Work Environment")]
    work_environment: Option<FieldValue>,
}

/// Models answer lists as arrays or as one string; both are accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    fn into_text(self) -> String {
        let s = match self {
            FieldValue::Text(t) => t.trim().to_string(),
            FieldValue::List(items) => items
                .iter()
                .map(|i| i.trim())
                .filter(|i| !i.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        };
        if s.is_empty() {
            NOT_SPECIFIED.to_string()
        } else {
            s
        }
    }

    fn into_list(self) -> Vec<String> {
        let items: Vec<String> = match self {
            FieldValue::List(items) => items
                .into_iter()
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .collect(),
            FieldValue::Text(t) => {
                let t = t.trim();
                if t.is_empty() {
                    Vec::new()
                } else {
                    vec![t.to_string()]
                }
            }
        };
        if items.is_empty() {
            vec![NOT_SPECIFIED.to_string()]
        } else {
            items
        }
    }
}

/// Parse a backend reply into the canonical shape. All six keys must be
/// present; blank values collapse to the placeholder.
pub(crate) fn parse_description(reply: &str) -> Result<EnhancedJobDescription> {
    let json = extract_json_object(reply)?;
    let raw: RawDescription =
        serde_json::from_str(json).context("backend reply is not the expected JSON object")?;

    let field = |name: &str, v: Option<FieldValue>| {
        v.ok_or_else(|| anyhow!("backend reply is missing the `{name}` field"))
    };
    Ok(EnhancedJobDescription {
        overview: field("overview", raw.overview)?.into_text(),
        responsibilities: field("responsibilities", raw.responsibilities)?.into_list(),
        required_qualifications: field("required_qualifications", raw.required_qualifications)?
            .into_list(),
        preferred_qualifications: field("preferred_qualifications", raw.preferred_qualifications)?
            .into_list(),
        key_competencies: field("key_competencies", raw.key_competencies)?.into_list(),
        work_environment: field("work_environment", raw.work_environment)?.into_text(),
    })
}

/// Slice out the outermost `{...}`, tolerating code fences and prose around
/// the object.
fn extract_json_object(reply: &str) -> Result<&str> {
    let start = reply
        .find('{')
        .ok_or_else(|| anyhow!("backend reply contains no JSON object"))?;
    let end = reply
        .rfind('}')
        .ok_or_else(|| anyhow!("backend reply contains no JSON object"))?;
    if end < start {
        return Err(anyhow!("backend reply contains no JSON object"));
    }
    Ok(&reply[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_reply_with_prose() {
        let reply = r#"Here is the description you asked for:
```json
{
  "overview": "Runs the payments platform.",
  "responsibilities": ["Own the roadmap", "Ship features"],
  "required_qualifications": ["5y experience"],
  "preferred_qualifications": [],
  "key_competencies": "Communication",
  "work_environment": ""
}
```
Let me know if you need anything else."#;
        let d = parse_description(reply).unwrap();
        assert_eq!(d.overview, "Runs the payments platform.");
        assert_eq!(d.responsibilities.len(), 2);
        assert_eq!(d.preferred_qualifications, vec![NOT_SPECIFIED.to_string()]);
        assert_eq!(d.key_competencies, vec!["Communication".to_string()]);
        assert_eq!(d.work_environment, NOT_SPECIFIED);
    }

    #[test]
    fn missing_field_is_an_error() {
        let reply = r#"{"overview": "x", "responsibilities": []}"#;
        let err = parse_description(reply).unwrap_err();
        assert!(err.to_string().contains("required_qualifications"));
    }

    #[test]
    fn prose_without_json_is_an_error() {
        assert!(parse_description("Sorry, I cannot help with that.").is_err());
    }

    #[test]
    fn export_file_names_are_filesystem_safe() {
        assert_eq!(
            export_file_name("Monetary Authority", "Deputy/ Assistant Director"),
            "Monetary_Authority_Deputy-_Assistant_Director_enhanced.txt"
        );
    }

    #[test]
    fn plain_text_export_keeps_the_fixed_section_order() {
        let d = EnhancedJobDescription {
            overview: "O".into(),
            responsibilities: vec!["r1".into(), "r2".into()],
            required_qualifications: vec!["q".into()],
            preferred_qualifications: vec![NOT_SPECIFIED.into()],
            key_competencies: vec!["k".into()],
            work_environment: "Hybrid".into(),
        };
        let text = d.to_plain_text();
        let mut last = 0;
        for label in SECTION_LABELS {
            let pos = text
                .find(&format!("{label}:"))
                .unwrap_or_else(|| panic!("missing section {label}"));
            assert!(pos >= last, "section {label} out of order");
            last = pos;
        }
        assert!(text.contains("- r1\n- r2"));
        assert!(text.ends_with("Hybrid"));
    }
}
