//! Course platform (TeachCenter) export JSON to LOM
//!
//! Each exported item is one file used in one or more courses. Attributes
//! that are not mapped are skipped. Title, abstract and tags are collected
//! while visiting and written at the end, once the record language is known.

use chrono::DateTime;
use once_cell::sync::Lazy;
use serde_json::Value;

use super::{html_unescape, object_entries, scalar_text};
use crate::convert::{Convert, ConvertError, ConvertResult, FallbackPolicy, HandlerTable};
use crate::lom::{LomMetadata, NO_LANGUAGE};

/// Identity of an exported item in the record store, registered as `moodle` pid
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeachCenterKey {
    File {
        url: String,
        year: String,
        semester: String,
        hash_sha1: String,
    },
    Link {
        url: String,
    },
}

impl TeachCenterKey {
    /// Items with a content hash are files, everything else is a link.
    /// Both the 1.0 (`fileurl`, `contenthash`) and the 2.0 (`source`,
    /// `identifier`) export profiles are understood.
    pub fn from_json(item: &Value) -> ConvertResult<Self> {
        let text = |key: &str| item.get(key).and_then(scalar_text);

        let url = text("fileurl")
            .or_else(|| text("source"))
            .ok_or_else(|| ConvertError::invalid("fileurl", "item has no url"))?;

        let hash = text("contenthash").or_else(|| {
            text("identifier").and_then(|id| id.rsplit(':').next().map(str::to_string))
        });

        Ok(match hash {
            Some(hash_sha1) => TeachCenterKey::File {
                url,
                year: text("year").unwrap_or_default(),
                semester: text("semester").unwrap_or_default(),
                hash_sha1,
            },
            None => TeachCenterKey::Link { url },
        })
    }

    pub fn resource_type(&self) -> &'static str {
        match self {
            TeachCenterKey::File { .. } => "file",
            TeachCenterKey::Link { .. } => "link",
        }
    }

    /// Value of the `moodle` pid: content hash for files, url for links
    pub fn moodle_pid(&self) -> &str {
        match self {
            TeachCenterKey::File { hash_sha1, .. } => hash_sha1,
            TeachCenterKey::Link { url } => url,
        }
    }
}

#[derive(Debug, Default)]
pub struct TeachCenterContext {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub tags: Vec<String>,
    pub year: String,
    pub semester: String,
    pub language: Option<String>,
    pub courses: Vec<LomMetadata>,
    /// Campus course ids of every visited course
    pub course_ids: Vec<String>,
    pub file_url: Option<String>,
}

impl TeachCenterContext {
    fn language(&self) -> &str {
        self.language.as_deref().unwrap_or(NO_LANGUAGE)
    }
}

#[derive(Debug, Default)]
struct CourseContext {
    course_id: Option<String>,
}

pub struct TeachCenterToLom;

type Table = HandlerTable<Value, TeachCenterContext, LomMetadata>;
type CourseTable = HandlerTable<Value, CourseContext, LomMetadata>;

static TABLE: Lazy<Table> = Lazy::new(|| {
    HandlerTable::new("teachcenter", FallbackPolicy::Permissive)
        .on("courses", visit_courses)
        .on("year", visit_year)
        .on("semester", visit_semester)
        .on("language", visit_language)
        .on("title", visit_title)
        .on("abstract", visit_abstract)
        .on("tags", visit_tags)
        .on("persons", visit_persons)
        .on("timereleased", visit_timereleased)
        .on("mimetype", visit_mimetype)
        .on("filesize", visit_filesize)
        .on_each(&["fileurl", "source"], visit_file_url)
        .on("resourcetype", visit_resourcetype)
        .on("license", visit_license)
        .on("classification", visit_classification)
});

static COURSE: Lazy<CourseTable> = Lazy::new(|| {
    HandlerTable::new("teachcenter.course", FallbackPolicy::Permissive)
        .on("courseid", visit_courseid)
        .on("identifier", visit_course_identifier)
        .on("coursename", visit_coursename)
        .on("courselanguage", visit_courselanguage)
        .on("structure", visit_structure)
        .on("context", visit_context)
        .on("objective", visit_objective)
        .on("description", visit_description)
        .on("lecturer", visit_lecturer)
        .on("organisation", visit_organisation)
});

impl Convert for TeachCenterToLom {
    type Source = Value;
    type Value = Value;
    type Context = TeachCenterContext;
    type Output = LomMetadata;

    fn table() -> &'static Table {
        &TABLE
    }

    fn entries(source: &Value) -> ConvertResult<Vec<(&str, &Value)>> {
        object_entries(source, "teachcenter item")
    }

    fn record_id(source: &Value) -> Option<String> {
        TeachCenterKey::from_json(source)
            .ok()
            .map(|key| key.moodle_pid().to_string())
    }

    fn finish(ctx: &mut TeachCenterContext, record: &mut LomMetadata) -> ConvertResult<()> {
        let language = ctx.language().to_string();

        if let Some(title) = &ctx.title {
            record.set_title(title, &language)?;
        }

        let version = format!("{} {}", ctx.semester, ctx.year);
        record.set_version(&version, &ctx.year)?;

        for tag in ctx.tags.iter().filter(|t| !t.is_empty()) {
            record.append_keyword(tag, &language)?;
        }

        if let Some(abstract_text) = &ctx.abstract_text {
            let abstract_text = html_unescape(abstract_text);
            if !abstract_text.is_empty() {
                record.append_description(&abstract_text, &language)?;
            }
        }

        for course in &mut ctx.courses {
            course.set_version(&version, &ctx.year)?;
            record.append_course(course)?;
        }
        Ok(())
    }
}

fn string<'a>(key: &str, value: &'a Value) -> ConvertResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| ConvertError::invalid(key, "expected a string"))
}

fn visit_courses(value: &Value, ctx: &mut TeachCenterContext, _: &mut LomMetadata) -> ConvertResult<()> {
    for course in value.as_array().into_iter().flatten() {
        let mut lom = LomMetadata::course();
        let mut course_ctx = CourseContext::default();
        COURSE.visit(object_entries(course, "course")?, &mut course_ctx, &mut lom)?;

        ctx.course_ids.extend(course_ctx.course_id);
        ctx.courses.push(lom);
    }
    Ok(())
}

fn visit_year(value: &Value, ctx: &mut TeachCenterContext, record: &mut LomMetadata) -> ConvertResult<()> {
    let year = scalar_text(value).ok_or_else(|| ConvertError::invalid("year", "expected a year"))?;
    record.set_datetime(&year)?;
    ctx.year = year;
    Ok(())
}

fn visit_semester(value: &Value, ctx: &mut TeachCenterContext, record: &mut LomMetadata) -> ConvertResult<()> {
    let semester = string("semester", value)?;
    record.append_keyword(semester, NO_LANGUAGE)?;
    ctx.semester = semester.to_string();
    Ok(())
}

fn visit_language(value: &Value, ctx: &mut TeachCenterContext, record: &mut LomMetadata) -> ConvertResult<()> {
    let language = string("language", value)?;
    record.append_language(language)?;
    ctx.language = Some(language.to_string());
    Ok(())
}

fn visit_title(value: &Value, ctx: &mut TeachCenterContext, _: &mut LomMetadata) -> ConvertResult<()> {
    ctx.title = Some(string("title", value)?.to_string());
    Ok(())
}

fn visit_abstract(value: &Value, ctx: &mut TeachCenterContext, _: &mut LomMetadata) -> ConvertResult<()> {
    ctx.abstract_text = Some(string("abstract", value)?.to_string());
    Ok(())
}

fn visit_tags(value: &Value, ctx: &mut TeachCenterContext, _: &mut LomMetadata) -> ConvertResult<()> {
    ctx.tags = value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    Ok(())
}

fn visit_persons(value: &Value, _: &mut TeachCenterContext, record: &mut LomMetadata) -> ConvertResult<()> {
    for person in value.as_array().into_iter().flatten() {
        let field = |key: &str| person.get(key).and_then(Value::as_str).unwrap_or("");
        let name = format!("{} {}", field("firstname"), field("lastname"));
        record.append_contribute(name.trim(), field("role"), None)?;
    }
    Ok(())
}

/// Release time is a unix timestamp; only its UTC date is kept
fn visit_timereleased(value: &Value, _: &mut TeachCenterContext, record: &mut LomMetadata) -> ConvertResult<()> {
    let seconds: i64 = scalar_text(value)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ConvertError::invalid("timereleased", "expected a unix timestamp"))?;
    let released = DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| ConvertError::invalid("timereleased", "timestamp out of range"))?;
    record.set_datetime(&released.date_naive().format("%Y-%m-%d").to_string())
}

fn visit_mimetype(value: &Value, _: &mut TeachCenterContext, record: &mut LomMetadata) -> ConvertResult<()> {
    record.append_format(string("mimetype", value)?)
}

fn visit_filesize(value: &Value, _: &mut TeachCenterContext, record: &mut LomMetadata) -> ConvertResult<()> {
    let size = scalar_text(value).ok_or_else(|| ConvertError::invalid("filesize", "expected a size"))?;
    record.set_size(&size)
}

fn visit_file_url(value: &Value, ctx: &mut TeachCenterContext, _: &mut LomMetadata) -> ConvertResult<()> {
    ctx.file_url = Some(string("fileurl", value)?.to_string());
    Ok(())
}

/// Platform resource types to HCRT learning resource types
pub fn learning_resource_type(resource_type: &str) -> Option<&'static str> {
    match resource_type.to_lowercase().as_str() {
        "no selection" | "noselection" => Some("other"),
        "presentationslide" => Some("slide"),
        "exercise" => Some("assessment"),
        "graphic" | "figure" => Some("image"),
        _ => None,
    }
}

fn visit_resourcetype(value: &Value, _: &mut TeachCenterContext, record: &mut LomMetadata) -> ConvertResult<()> {
    let resource_type = string("resourcetype", value)?;
    match learning_resource_type(resource_type) {
        Some(id) => record.append_learningresourcetype(id),
        None => {
            tracing::debug!(resource_type, "No learning resource type for resource type");
            Ok(())
        }
    }
}

fn visit_license(value: &Value, _: &mut TeachCenterContext, record: &mut LomMetadata) -> ConvertResult<()> {
    let url = value
        .get("source")
        .and_then(Value::as_str)
        .ok_or_else(|| ConvertError::invalid("license", "missing source"))?;
    record.set_rights_url(url)
}

/// Sort ÖFOS ids so that every id is followed by its ancestors:
/// `["1234", "123", "2345", "234", "2"]`
pub fn sort_oefos_ids(ids: &mut [String]) {
    ids.sort_by_cached_key(|id| format!("{:\u{ff}<6}", id));
}

fn visit_classification(value: &Value, _: &mut TeachCenterContext, record: &mut LomMetadata) -> ConvertResult<()> {
    let mut ids: Vec<String> = value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|classification| classification.get("values"))
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(|v| v.get("identifier"))
        .filter_map(scalar_text)
        .collect();
    sort_oefos_ids(&mut ids);

    for id in &ids {
        record.append_oefos_id(id, "de")?;
        record.append_oefos_id(id, "en")?;
    }
    Ok(())
}

fn visit_courseid(value: &Value, ctx: &mut CourseContext, record: &mut LomMetadata) -> ConvertResult<()> {
    let id = scalar_text(value).ok_or_else(|| ConvertError::invalid("courseid", "expected an id"))?;
    record.append_identifier(&id, "tugrazonline-id")?;
    ctx.course_id = Some(id);
    Ok(())
}

fn visit_course_identifier(value: &Value, _: &mut CourseContext, record: &mut LomMetadata) -> ConvertResult<()> {
    let id = scalar_text(value).ok_or_else(|| ConvertError::invalid("identifier", "expected an id"))?;
    record.append_identifier(&id, "teachcenter-course-id")
}

fn visit_coursename(value: &Value, _: &mut CourseContext, record: &mut LomMetadata) -> ConvertResult<()> {
    record.set_title(string("coursename", value)?, NO_LANGUAGE)
}

fn visit_courselanguage(value: &Value, _: &mut CourseContext, record: &mut LomMetadata) -> ConvertResult<()> {
    record.append_language(string("courselanguage", value)?)
}

fn visit_structure(value: &Value, _: &mut CourseContext, record: &mut LomMetadata) -> ConvertResult<()> {
    record.append_keyword(string("structure", value)?, NO_LANGUAGE)
}

fn visit_context(value: &Value, _: &mut CourseContext, record: &mut LomMetadata) -> ConvertResult<()> {
    record.append_context(string("context", value)?)
}

fn visit_objective(value: &Value, _: &mut CourseContext, record: &mut LomMetadata) -> ConvertResult<()> {
    record.append_description(string("objective", value)?, NO_LANGUAGE)
}

fn visit_description(value: &Value, _: &mut CourseContext, record: &mut LomMetadata) -> ConvertResult<()> {
    record.append_description(&html_unescape(string("description", value)?), NO_LANGUAGE)
}

fn visit_lecturer(value: &Value, _: &mut CourseContext, record: &mut LomMetadata) -> ConvertResult<()> {
    for lecturer in string("lecturer", value)?.split(',').map(str::trim) {
        record.append_contribute(lecturer, "Author", None)?;
    }
    Ok(())
}

fn visit_organisation(value: &Value, _: &mut CourseContext, record: &mut LomMetadata) -> ConvertResult<()> {
    record.append_contribute(string("organisation", value)?, "Unknown", None)
}
