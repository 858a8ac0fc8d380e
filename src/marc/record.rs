//! MARC21 output accumulator
//!
//! Fields are addressed with dotted paths `TAG.IND1.IND2.CODE`, e.g.
//! `245.1.0.a`. Empty indicators are blanks, an empty code defaults to `a`:
//! `040...` addresses tag 040 with both indicators blank.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::convert::{ConvertError, ConvertResult};

pub const DEFAULT_LEADER: &str = "00000nam a2200000zca4500";

/// Parsed `TAG.IND1.IND2.CODE` address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    pub tag: String,
    pub ind1: char,
    pub ind2: char,
    pub code: Option<char>,
}

impl FieldPath {
    pub fn code_or_default(&self) -> char {
        self.code.unwrap_or('a')
    }
}

impl FromStr for FieldPath {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConvertError::InvalidPath(s.to_string());
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 4 {
            return Err(invalid());
        }

        let tag = parts[0];
        if tag.len() != 3 || !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid());
        }

        let single = |part: &str, blank: Option<char>| -> Result<Option<char>, ConvertError> {
            let mut chars = part.chars();
            match (chars.next(), chars.next()) {
                (None, _) => Ok(blank),
                (Some(c), None) => Ok(Some(c)),
                _ => Err(invalid()),
            }
        };

        Ok(FieldPath {
            tag: tag.to_string(),
            ind1: single(parts[1], Some(' '))?.unwrap_or(' '),
            ind2: single(parts[2], Some(' '))?.unwrap_or(' '),
            code: single(parts[3], None)?,
        })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ind = |c: char| if c == ' ' { String::new() } else { c.to_string() };
        write!(
            f,
            "{}.{}.{}.{}",
            self.tag,
            ind(self.ind1),
            ind(self.ind2),
            self.code.map(String::from).unwrap_or_default()
        )
    }
}

/// One occurrence of a data field
///
/// Subfields are grouped by code in first-seen order, so an interleaved
/// sequence such as `$a $b $a` comes back from MARCXML as `$a $a $b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataField {
    pub ind1: char,
    pub ind2: char,
    pub subfields: IndexMap<char, Vec<String>>,
}

impl DataField {
    pub fn new(ind1: char, ind2: char) -> Self {
        Self {
            ind1,
            ind2,
            subfields: IndexMap::new(),
        }
    }

    pub fn subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .get(&code)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn subfield_values(&self, code: char) -> &[String] {
        self.subfields.get(&code).map(Vec::as_slice).unwrap_or(&[])
    }

    fn with_subfields(mut self, subfields: &[(char, &str)]) -> Self {
        for (code, value) in subfields {
            self.subfields
                .entry(*code)
                .or_default()
                .push((*value).to_string());
        }
        self
    }

    fn matches(&self, path: &FieldPath) -> bool {
        self.ind1 == path.ind1 && self.ind2 == path.ind2
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEntry {
    Control(String),
    Data(Vec<DataField>),
}

/// In-progress MARC21 record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marc21Metadata {
    leader: String,
    fields: IndexMap<String, FieldEntry>,
}

impl Default for Marc21Metadata {
    fn default() -> Self {
        Self::new()
    }
}

impl Marc21Metadata {
    pub fn new() -> Self {
        Self {
            leader: DEFAULT_LEADER.to_string(),
            fields: IndexMap::new(),
        }
    }

    pub fn leader(&self) -> &str {
        &self.leader
    }

    pub fn emplace_leader(&mut self, leader: impl Into<String>) {
        self.leader = leader.into();
    }

    pub fn emplace_controlfield(&mut self, tag: &str, value: impl Into<String>) {
        self.fields
            .insert(tag.to_string(), FieldEntry::Control(value.into()));
    }

    pub fn controlfield(&self, tag: &str) -> Option<&str> {
        match self.fields.get(tag) {
            Some(FieldEntry::Control(value)) => Some(value),
            _ => None,
        }
    }

    /// All occurrences of a data field
    pub fn datafields(&self, tag: &str) -> &[DataField] {
        match self.fields.get(tag) {
            Some(FieldEntry::Data(fields)) => fields,
            _ => &[],
        }
    }

    /// Values of the addressed subfield across all matching occurrences
    pub fn subfield_values(&self, path: &str) -> ConvertResult<Vec<&str>> {
        let path: FieldPath = path.parse()?;
        let code = path.code_or_default();
        Ok(self
            .datafields(&path.tag)
            .iter()
            .filter(|field| field.matches(&path))
            .flat_map(|field| field.subfield_values(code))
            .map(String::as_str)
            .collect())
    }

    /// True when any occurrence of `tag` (regardless of indicators) has
    /// `value` in subfield `code`
    pub fn contains(&self, tag: &str, code: char, value: &str) -> bool {
        self.datafields(tag)
            .iter()
            .any(|field| field.subfield_values(code).iter().any(|v| v == value))
    }

    fn data_mut(&mut self, tag: &str) -> ConvertResult<&mut Vec<DataField>> {
        let entry = self
            .fields
            .entry(tag.to_string())
            .or_insert_with(|| FieldEntry::Data(Vec::new()));
        match entry {
            FieldEntry::Data(fields) => Ok(fields),
            FieldEntry::Control(_) => Err(ConvertError::InvalidPath(format!(
                "{} is a control field",
                tag
            ))),
        }
    }

    fn field_mut(&mut self, path: &FieldPath) -> ConvertResult<&mut DataField> {
        let fields = self.data_mut(&path.tag)?;
        let index = match fields.iter().position(|f| f.matches(path)) {
            Some(index) => index,
            None => {
                fields.push(DataField::new(path.ind1, path.ind2));
                fields.len() - 1
            }
        };
        Ok(&mut fields[index])
    }

    /// Set the data field with the path's tag and indicators to exactly
    /// `subfields`, replacing any previous occurrence
    pub fn emplace_datafield(&mut self, path: &str, subfields: &[(char, &str)]) -> ConvertResult<()> {
        let path: FieldPath = path.parse()?;
        let field = self.field_mut(&path)?;
        *field = DataField::new(path.ind1, path.ind2).with_subfields(subfields);
        Ok(())
    }

    /// Set one subfield to a single value, creating the field if needed
    pub fn emplace_subfield(&mut self, path: &str, value: impl Into<String>) -> ConvertResult<()> {
        let path: FieldPath = path.parse()?;
        let code = path.code_or_default();
        let field = self.field_mut(&path)?;
        field.subfields.insert(code, vec![value.into()]);
        Ok(())
    }

    /// Add a new occurrence of the data field
    pub fn append_datafield(&mut self, path: &str, subfields: &[(char, &str)]) -> ConvertResult<()> {
        let path: FieldPath = path.parse()?;
        let field = DataField::new(path.ind1, path.ind2).with_subfields(subfields);
        self.data_mut(&path.tag)?.push(field);
        Ok(())
    }

    /// Add a value to a (possibly repeated) subfield of the first matching occurrence
    pub fn append_subfield(&mut self, path: &str, value: impl Into<String>) -> ConvertResult<()> {
        let path: FieldPath = path.parse()?;
        let code = path.code_or_default();
        let field = self.field_mut(&path)?;
        field.subfields.entry(code).or_default().push(value.into());
        Ok(())
    }

    /// Like [`append_subfield`](Self::append_subfield) but skips values already present
    pub fn append_unique_subfield(&mut self, path: &str, value: impl Into<String>) -> ConvertResult<()> {
        let path: FieldPath = path.parse()?;
        let code = path.code_or_default();
        let value = value.into();
        let field = self.field_mut(&path)?;
        let values = field.subfields.entry(code).or_default();
        if !values.contains(&value) {
            values.push(value);
        }
        Ok(())
    }

    /// Replace `placeholder` with `value` in every subfield value
    pub fn replace_placeholder(&mut self, placeholder: &str, value: &str) {
        for entry in self.fields.values_mut() {
            if let FieldEntry::Data(fields) = entry {
                for field in fields {
                    for values in field.subfields.values_mut() {
                        for v in values.iter_mut().filter(|v| v.contains(placeholder)) {
                            *v = v.replace(placeholder, value);
                        }
                    }
                }
            }
        }
    }

    /// Tags in insertion order with their entries
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldEntry)> {
        self.fields.iter().map(|(tag, entry)| (tag.as_str(), entry))
    }

    /// Structured view persisted by the record service:
    /// `{"metadata": {"leader": .., "fields": {tag: ..}}}`
    pub fn json(&self) -> Value {
        let mut fields = Map::new();
        for (tag, entry) in &self.fields {
            let value = match entry {
                FieldEntry::Control(value) => Value::String(value.clone()),
                FieldEntry::Data(occurrences) => Value::Array(
                    occurrences
                        .iter()
                        .map(|field| {
                            let subfields: Map<String, Value> = field
                                .subfields
                                .iter()
                                .map(|(code, values)| (code.to_string(), json!(values)))
                                .collect();
                            json!({
                                "ind1": field.ind1.to_string(),
                                "ind2": field.ind2.to_string(),
                                "subfields": subfields,
                            })
                        })
                        .collect(),
                ),
            };
            fields.insert(tag.clone(), value);
        }

        json!({
            "metadata": {
                "leader": self.leader,
                "fields": fields,
            }
        })
    }

    /// Rebuild from the structured view; accepts either the full document
    /// or just its `metadata` object
    pub fn from_json(value: &Value) -> ConvertResult<Self> {
        let metadata = value.get("metadata").unwrap_or(value);
        let mut record = Marc21Metadata::new();

        if let Some(leader) = metadata.get("leader").and_then(Value::as_str) {
            record.leader = leader.to_string();
        }

        let fields = match metadata.get("fields") {
            Some(Value::Object(fields)) => fields,
            Some(_) => return Err(ConvertError::invalid("fields", "expected an object")),
            None => return Ok(record),
        };

        for (tag, entry) in fields {
            match entry {
                Value::String(value) => record.emplace_controlfield(tag, value.clone()),
                Value::Array(occurrences) => {
                    let parsed = occurrences
                        .iter()
                        .map(|o| datafield_from_json(tag, o))
                        .collect::<ConvertResult<Vec<_>>>()?;
                    record.fields.insert(tag.clone(), FieldEntry::Data(parsed));
                }
                _ => return Err(ConvertError::invalid(tag.clone(), "unexpected field shape")),
            }
        }

        Ok(record)
    }
}

fn indicator(value: Option<&Value>) -> char {
    value
        .and_then(Value::as_str)
        .and_then(|s| s.chars().next())
        .unwrap_or(' ')
}

fn datafield_from_json(tag: &str, value: &Value) -> ConvertResult<DataField> {
    let mut field = DataField::new(indicator(value.get("ind1")), indicator(value.get("ind2")));

    let subfields = match value.get("subfields") {
        Some(Value::Object(subfields)) => subfields,
        _ => return Err(ConvertError::invalid(tag, "missing subfields")),
    };

    for (code, values) in subfields {
        let code = code
            .chars()
            .next()
            .ok_or_else(|| ConvertError::invalid(tag, "empty subfield code"))?;
        let values = match values {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect(),
            Value::String(single) => vec![single.clone()],
            _ => return Err(ConvertError::invalid(tag, "unexpected subfield value")),
        };
        field.subfields.insert(code, values);
    }

    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path() {
        let path: FieldPath = "245.1.0.a".parse().unwrap();
        assert_eq!(path.tag, "245");
        assert_eq!((path.ind1, path.ind2, path.code), ('1', '0', Some('a')));

        let path: FieldPath = "040...".parse().unwrap();
        assert_eq!((path.ind1, path.ind2, path.code), (' ', ' ', None));
        assert_eq!(path.to_string(), "040...");

        assert!("24.1.0.a".parse::<FieldPath>().is_err());
        assert!("245.10.0.a".parse::<FieldPath>().is_err());
        assert!("245.1.0".parse::<FieldPath>().is_err());
    }

    #[test]
    fn test_emplace_is_idempotent() {
        let mut record = Marc21Metadata::new();
        record.emplace_subfield("245.1.0.a", "first").unwrap();
        record.emplace_subfield("245.1.0.a", "second").unwrap();
        assert_eq!(record.subfield_values("245.1.0.a").unwrap(), vec!["second"]);
        assert_eq!(record.datafields("245").len(), 1);

        record.emplace_datafield("264..1.", &[('a', "Graz")]).unwrap();
        record.emplace_datafield("264..1.", &[('a', "Wien")]).unwrap();
        assert_eq!(record.subfield_values("264..1.a").unwrap(), vec!["Wien"]);
    }

    #[test]
    fn test_append_preserves_order() {
        let mut record = Marc21Metadata::new();
        record.append_datafield("653...", &[('a', "b")]).unwrap();
        record.append_datafield("653...", &[('a', "a")]).unwrap();
        record.append_datafield("653...", &[('a', "b")]).unwrap();
        assert_eq!(record.subfield_values("653...a").unwrap(), vec!["b", "a", "b"]);

        record.append_subfield("700.1..u", "x").unwrap();
        record.append_subfield("700.1..u", "y").unwrap();
        assert_eq!(record.subfield_values("700.1..u").unwrap(), vec!["x", "y"]);
    }

    #[test]
    fn test_append_unique_subfield() {
        let mut record = Marc21Metadata::new();
        record.append_unique_subfield("100.1..u", "Institute").unwrap();
        record.append_unique_subfield("100.1..u", "Institute").unwrap();
        assert_eq!(record.subfield_values("100.1..u").unwrap(), vec!["Institute"]);
    }

    #[test]
    fn test_indicators_select_occurrence() {
        let mut record = Marc21Metadata::new();
        record.emplace_subfield("971.7..a", "gesperrt").unwrap();
        record.emplace_subfield("971.5..a", "TU").unwrap();
        assert_eq!(record.datafields("971").len(), 2);
        assert!(record.contains("971", 'a', "gesperrt"));
    }

    #[test]
    fn test_controlfield_tag_rejects_datafield_ops() {
        let mut record = Marc21Metadata::new();
        record.emplace_controlfield("008", "x");
        assert!(record.emplace_subfield("008...a", "y").is_err());
    }

    #[test]
    fn test_replace_placeholder() {
        let mut record = Marc21Metadata::new();
        record.emplace_datafield("264..1.", &[('a', "Graz"), ('c', "JAHR")]).unwrap();
        record.replace_placeholder("JAHR", "2024");
        assert_eq!(record.subfield_values("264..1.c").unwrap(), vec!["2024"]);
    }

    #[test]
    fn test_json_view_round_trips() {
        let mut record = Marc21Metadata::new();
        record.emplace_controlfield("007", "cr#|||||||||||");
        record.emplace_datafield("245.1.0.", &[('a', "Title"), ('c', "Doe, Jane")]).unwrap();

        let json = record.json();
        assert_eq!(json["metadata"]["fields"]["245"][0]["ind1"], "1");
        assert_eq!(json["metadata"]["fields"]["245"][0]["subfields"]["c"][0], "Doe, Jane");
        assert_eq!(json["metadata"]["fields"]["007"], "cr#|||||||||||");

        assert_eq!(Marc21Metadata::from_json(&json).unwrap(), record);
        assert_eq!(Marc21Metadata::from_json(&json["metadata"]).unwrap(), record);
    }
}
