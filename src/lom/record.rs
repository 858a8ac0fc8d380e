//! LOM output accumulator

use serde_json::{json, Map, Value};

use crate::convert::{ConvertError, ConvertResult};

/// Default language tag for language-neutral strings
pub const NO_LANGUAGE: &str = "x-none";

/// A LOM langstring: `{"langstring": {"lang": .., "#text": ..}}`
pub fn langstring(value: &str, lang: &str) -> Value {
    json!({
        "langstring": {
            "lang": lang,
            "#text": value,
        }
    })
}

fn vocabulary(value: &str) -> Value {
    json!({
        "source": {"langstring": {"lang": NO_LANGUAGE, "#text": "LOMv1.0"}},
        "value": {"langstring": {"lang": NO_LANGUAGE, "#text": value}},
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Record,
    Course,
}

/// In-progress LOM document
///
/// A record document starts from the skeleton sections (general,
/// lifecycle, metametadata, technical, educational, rights,
/// classification). A course document is the `{course, instance}` pair
/// embedded in a record's `courses` list; the same helpers write to the
/// matching course paths.
#[derive(Debug, Clone, PartialEq)]
pub struct LomMetadata {
    shape: Shape,
    root: Value,
}

impl Default for LomMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl LomMetadata {
    pub fn new() -> Self {
        Self {
            shape: Shape::Record,
            root: json!({
                "general": {},
                "lifecycle": {},
                "metametadata": {},
                "technical": {},
                "educational": {},
                "rights": {},
                "classification": [],
            }),
        }
    }

    pub fn course() -> Self {
        Self {
            shape: Shape::Course,
            root: json!({
                "course": {},
                "instance": {},
            }),
        }
    }

    pub fn from_json(value: Value) -> ConvertResult<Self> {
        if !value.is_object() {
            return Err(ConvertError::invalid("metadata", "expected an object"));
        }
        let shape = if value.get("course").is_some() {
            Shape::Course
        } else {
            Shape::Record
        };
        Ok(Self { shape, root: value })
    }

    pub fn json(&self) -> &Value {
        &self.root
    }

    pub fn into_json(self) -> Value {
        self.root
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.root, |node, key| node.get(key))
    }

    fn slot(&mut self, path: &str) -> ConvertResult<(&mut Map<String, Value>, String)> {
        let mut keys: Vec<&str> = path.split('.').collect();
        let last = keys
            .pop()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConvertError::InvalidPath(path.to_string()))?;

        let mut node = &mut self.root;
        for key in keys {
            let object = node
                .as_object_mut()
                .ok_or_else(|| ConvertError::InvalidPath(path.to_string()))?;
            node = object
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }

        let object = node
            .as_object_mut()
            .ok_or_else(|| ConvertError::InvalidPath(path.to_string()))?;
        Ok((object, last.to_string()))
    }

    /// Set `path` to `value`, replacing whatever was there
    pub fn emplace(&mut self, path: &str, value: Value) -> ConvertResult<()> {
        let (object, key) = self.slot(path)?;
        object.insert(key, value);
        Ok(())
    }

    /// Push `value` onto the list at `path`, creating it if needed
    pub fn append(&mut self, path: &str, value: Value) -> ConvertResult<()> {
        let (object, key) = self.slot(path)?;
        match object.entry(key).or_insert_with(|| Value::Array(Vec::new())) {
            Value::Array(items) => {
                items.push(value);
                Ok(())
            }
            _ => Err(ConvertError::InvalidPath(path.to_string())),
        }
    }

    fn pick(&self, record: &'static str, course: &'static str) -> &'static str {
        match self.shape {
            Shape::Record => record,
            Shape::Course => course,
        }
    }

    pub fn set_title(&mut self, title: &str, lang: &str) -> ConvertResult<()> {
        let path = self.pick("general.title", "course.title");
        self.emplace(path, langstring(title, lang))
    }

    pub fn append_identifier(&mut self, id: &str, catalog: &str) -> ConvertResult<()> {
        let path = self.pick("general.identifier", "course.identifier");
        self.append(
            path,
            json!({
                "catalog": catalog,
                "entry": langstring(id, NO_LANGUAGE),
            }),
        )
    }

    pub fn append_language(&mut self, lang: &str) -> ConvertResult<()> {
        let path = self.pick("general.language", "course.language");
        self.append(path, Value::String(lang.to_string()))
    }

    pub fn append_description(&mut self, description: &str, lang: &str) -> ConvertResult<()> {
        let path = self.pick("general.description", "course.description");
        self.append(path, langstring(description, lang))
    }

    pub fn append_keyword(&mut self, keyword: &str, lang: &str) -> ConvertResult<()> {
        let path = self.pick("general.keyword", "course.keyword");
        self.append(path, langstring(keyword, lang))
    }

    pub fn append_contribute(
        &mut self,
        name: &str,
        role: &str,
        description: Option<&str>,
    ) -> ConvertResult<()> {
        let path = self.pick("lifecycle.contribute", "course.contribute");
        let mut contribute = json!({
            "role": vocabulary(role),
            "entity": [name],
        });
        if let Some(description) = description {
            contribute["description"] = langstring(description, NO_LANGUAGE);
        }
        self.append(path, contribute)
    }

    pub fn append_context(&mut self, context: &str) -> ConvertResult<()> {
        let path = self.pick("educational.context", "course.context");
        self.append(path, vocabulary(context))
    }

    pub fn set_version(&mut self, version: &str, datetime: &str) -> ConvertResult<()> {
        let path = self.pick("lifecycle.version", "instance.version");
        let mut value = langstring(version, NO_LANGUAGE);
        value["datetime"] = Value::String(datetime.to_string());
        self.emplace(path, value)
    }

    pub fn set_datetime(&mut self, datetime: &str) -> ConvertResult<()> {
        self.emplace("lifecycle.datetime", Value::String(datetime.to_string()))
    }

    pub fn append_metametadata_contribute(&mut self, name: &str, role: &str) -> ConvertResult<()> {
        self.append(
            "metametadata.contribute",
            json!({
                "role": vocabulary(role),
                "entity": [name],
            }),
        )
    }

    pub fn set_location(&mut self, url: &str) -> ConvertResult<()> {
        self.emplace("technical.location", json!({"type": "URI", "#text": url}))
    }

    pub fn set_thumbnail(&mut self, thumbnail: Value) -> ConvertResult<()> {
        self.emplace("technical.thumbnail", thumbnail)
    }

    pub fn set_duration(&mut self, duration: &str, lang: &str) -> ConvertResult<()> {
        self.emplace(
            "technical.duration",
            json!({
                "duration": duration,
                "description": langstring("duration", lang),
            }),
        )
    }

    pub fn append_format(&mut self, mimetype: &str) -> ConvertResult<()> {
        self.append("technical.format", Value::String(mimetype.to_string()))
    }

    pub fn set_size(&mut self, size: &str) -> ConvertResult<()> {
        self.emplace("technical.size", Value::String(size.to_string()))
    }

    pub fn set_typical_learning_time(&mut self, duration: &str, description: &str) -> ConvertResult<()> {
        self.emplace(
            "educational.typicallearningtime",
            json!({
                "duration": duration,
                "description": langstring(description, NO_LANGUAGE),
            }),
        )
    }

    pub fn append_educational_description(&mut self, description: &str, lang: &str) -> ConvertResult<()> {
        self.append("educational.description", langstring(description, lang))
    }

    pub fn append_learningresourcetype(&mut self, id: &str) -> ConvertResult<()> {
        self.append(
            "educational.learningresourcetype",
            json!({
                "source": {"langstring": {"lang": NO_LANGUAGE, "#text": "https://w3id.org/kim/hcrt/scheme"}},
                "id": id,
            }),
        )
    }

    pub fn set_rights_url(&mut self, url: &str) -> ConvertResult<()> {
        self.emplace("rights.copyrightandotherrestrictions", vocabulary("yes"))?;
        self.emplace("rights.url", Value::String(url.to_string()))
    }

    /// Add an ÖFOS discipline classification
    pub fn append_oefos_id(&mut self, id: &str, lang: &str) -> ConvertResult<()> {
        self.append(
            "classification",
            json!({
                "purpose": vocabulary("discipline"),
                "taxonpath": [{
                    "source": langstring("https://w3id.org/oerbase/vocabs/oefos2012", NO_LANGUAGE),
                    "taxon": [{"id": id, "entry": langstring(id, lang)}],
                }],
            }),
        )
    }

    pub fn append_course(&mut self, course: &LomMetadata) -> ConvertResult<()> {
        self.append("courses", course.root.clone())
    }

    pub fn courses(&self) -> &[Value] {
        self.root
            .get("courses")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// `#text` of every identifier entry
    pub fn identifiers(&self) -> Vec<&str> {
        let path = self.pick("general.identifier", "course.identifier");
        self.get(path)
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| id.pointer("/entry/langstring/#text"))
                    .filter_map(Value::as_str)
                    .collect()
            })
            .unwrap_or_default()
    }
}
