//! MOOC platform (iMooX) course JSON to LOM
//!
//! The course document follows the MOOChub schema: an `id`, a `type` and an
//! `attributes` object holding the actual course description. Every key the
//! schema defines is listed here, most of them without a LOM counterpart.

use once_cell::sync::Lazy;
use serde_json::Value;

use super::object_entries;
use crate::convert::{Convert, ConvertError, ConvertResult, FallbackPolicy, HandlerTable};
use crate::lom::{LomMetadata, NO_LANGUAGE};

/// Identifier catalog used for course codes and platform ids
pub const CATALOG: &str = "imoox";
const DEFAULT_LEARNING_RESOURCE_TYPE: &str = "https://w3id.org/kim/hcrt/course";

#[derive(Debug, Default)]
pub struct ImooxContext {
    /// Language of langstrings, the first course language
    pub language: Option<String>,
}

impl ImooxContext {
    fn language(&self) -> &str {
        self.language.as_deref().unwrap_or(NO_LANGUAGE)
    }
}

pub struct ImooxToLom;

type Table = HandlerTable<Value, ImooxContext, LomMetadata>;

/// MOOChub attributes with no LOM counterpart
const UNMAPPED: &[&str] = &[
    "type",
    "courseMode",
    "availableUntil",
    "endDate",
    "video",
    "access",
    "expires",
    "trailer",
    "teaches",
    "audience",
    "educationalLevel",
    "keywords",
    "contentLocation",
    "offer",
    "numberOfCredits",
    "educationalCredentialsAwarded",
    "competencyRequired",
    "applicationStartDate",
    "applicationDeadline",
    "accessMode",
    "repeatFrequency",
    "dateCreated",
    "dateModified",
    "hollandCode",
    "hasPart",
    "isPartOf",
    "languages",
];

static TABLE: Lazy<Table> = Lazy::new(|| {
    HandlerTable::new("imoox", FallbackPolicy::Strict)
        .on_each(&["id", "courseCode"], convert_identifier)
        .on_each(&["attributes", "categories"], convert_nested)
        .on("name", convert_name)
        .on_each(&["abstract", "description"], convert_description)
        .on("inLanguage", convert_in_language)
        .on("startDate", convert_start_date)
        .on("image", convert_image)
        .on("instructor", convert_instructor)
        .on("learningobjectives", convert_learning_objectives)
        .on("duration", convert_duration)
        .on("partnerInstitute", convert_partner_institute)
        .on("moocProvider", convert_mooc_provider)
        .on("url", convert_url)
        .on("workload", convert_workload)
        .on_each(&["courseLicenses", "license"], convert_license)
        .on_each(&["contributor", "creator"], convert_contributor)
        .on("publisher", convert_publisher)
        .on("educationalAlignment", convert_educational_alignment)
        .on("learningResourceType", convert_learning_resource_type)
        .on_each(UNMAPPED, ignore)
});

impl Convert for ImooxToLom {
    type Source = Value;
    type Value = Value;
    type Context = ImooxContext;
    type Output = LomMetadata;

    fn table() -> &'static Table {
        &TABLE
    }

    fn entries(source: &Value) -> ConvertResult<Vec<(&str, &Value)>> {
        object_entries(source, "course")
    }

    fn record_id(source: &Value) -> Option<String> {
        course_code(source).map(str::to_string)
    }

    fn prepare(source: &Value, ctx: &mut ImooxContext, _: &mut LomMetadata) -> ConvertResult<()> {
        ctx.language = source
            .pointer("/attributes/languages/0")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(())
    }
}

/// `attributes.courseCode` of a course document
pub fn course_code(course: &Value) -> Option<&str> {
    course.pointer("/attributes/courseCode").and_then(Value::as_str)
}

fn string<'a>(key: &str, value: &'a Value) -> ConvertResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| ConvertError::invalid(key, "expected a string"))
}

fn list<'a>(key: &str, value: &'a Value) -> ConvertResult<&'a [Value]> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| ConvertError::invalid(key, "expected a list"))
}

/// Contributors carry `name`, optionally `type` (the role) and `description`
fn append_contributors(
    contributors: &[Value],
    default_role: &str,
    record: &mut LomMetadata,
) -> ConvertResult<()> {
    for contributor in contributors {
        let name = contributor
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ConvertError::invalid("contributor", "missing name"))?;
        let role = contributor
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or(default_role);
        let description = contributor.get("description").and_then(Value::as_str);
        record.append_contribute(name, role, description)?;
    }
    Ok(())
}

fn ignore(_: &Value, _: &mut ImooxContext, _: &mut LomMetadata) -> ConvertResult<()> {
    Ok(())
}

fn convert_identifier(value: &Value, _: &mut ImooxContext, record: &mut LomMetadata) -> ConvertResult<()> {
    record.append_identifier(string("id", value)?, CATALOG)
}

fn convert_nested(value: &Value, ctx: &mut ImooxContext, record: &mut LomMetadata) -> ConvertResult<()> {
    TABLE.visit(object_entries(value, "attributes")?, ctx, record)
}

fn convert_name(value: &Value, ctx: &mut ImooxContext, record: &mut LomMetadata) -> ConvertResult<()> {
    record.set_title(string("name", value)?, ctx.language())
}

fn convert_description(value: &Value, ctx: &mut ImooxContext, record: &mut LomMetadata) -> ConvertResult<()> {
    record.append_description(string("description", value)?, ctx.language())
}

fn convert_in_language(value: &Value, _: &mut ImooxContext, record: &mut LomMetadata) -> ConvertResult<()> {
    for lang in list("inLanguage", value)?.iter().filter_map(Value::as_str) {
        record.append_language(lang)?;
    }
    Ok(())
}

/// Only the date part of the first start date is kept
fn convert_start_date(value: &Value, _: &mut ImooxContext, record: &mut LomMetadata) -> ConvertResult<()> {
    let start = list("startDate", value)?
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| ConvertError::invalid("startDate", "no start date"))?;
    let date = start.split('T').next().unwrap_or(start);
    record.set_datetime(date)
}

fn convert_image(value: &Value, _: &mut ImooxContext, record: &mut LomMetadata) -> ConvertResult<()> {
    record.set_thumbnail(value.clone())
}

fn convert_instructor(value: &Value, _: &mut ImooxContext, record: &mut LomMetadata) -> ConvertResult<()> {
    append_contributors(list("instructor", value)?, "Author", record)
}

fn convert_learning_objectives(value: &Value, ctx: &mut ImooxContext, record: &mut LomMetadata) -> ConvertResult<()> {
    for objective in list("learningobjectives", value)?.iter().filter_map(Value::as_str) {
        record.append_educational_description(objective, ctx.language())?;
    }
    Ok(())
}

fn convert_duration(value: &Value, ctx: &mut ImooxContext, record: &mut LomMetadata) -> ConvertResult<()> {
    record.set_duration(string("duration", value)?, ctx.language())
}

fn convert_partner_institute(value: &Value, _: &mut ImooxContext, record: &mut LomMetadata) -> ConvertResult<()> {
    append_contributors(list("partnerInstitute", value)?, "Publisher", record)
}

fn convert_mooc_provider(value: &Value, _: &mut ImooxContext, record: &mut LomMetadata) -> ConvertResult<()> {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ConvertError::invalid("moocProvider", "missing name"))?;
    record.append_metametadata_contribute(name, "Provider")
}

fn convert_url(value: &Value, _: &mut ImooxContext, record: &mut LomMetadata) -> ConvertResult<()> {
    record.set_location(string("url", value)?)
}

fn convert_workload(value: &Value, _: &mut ImooxContext, record: &mut LomMetadata) -> ConvertResult<()> {
    record.set_typical_learning_time(string("workload", value)?, "workload")
}

/// The first license wins
fn convert_license(value: &Value, _: &mut ImooxContext, record: &mut LomMetadata) -> ConvertResult<()> {
    let url = list("license", value)?
        .first()
        .and_then(|license| license.get("url"))
        .and_then(Value::as_str)
        .ok_or_else(|| ConvertError::invalid("license", "missing url"))?;
    record.set_rights_url(url)
}

fn convert_contributor(value: &Value, _: &mut ImooxContext, record: &mut LomMetadata) -> ConvertResult<()> {
    append_contributors(list("contributor", value)?, "", record)
}

fn convert_publisher(value: &Value, _: &mut ImooxContext, record: &mut LomMetadata) -> ConvertResult<()> {
    append_contributors(std::slice::from_ref(value), "", record)
}

/// One ÖFOS classification per alignment and language; alignments
/// without a short code are skipped
fn convert_educational_alignment(value: &Value, _: &mut ImooxContext, record: &mut LomMetadata) -> ConvertResult<()> {
    for alignment in list("educationalAlignment", value)? {
        let Some(short_code) = alignment.get("shortCode").and_then(Value::as_str) else {
            continue;
        };
        let names = alignment.get("name").and_then(Value::as_array);
        for name in names.into_iter().flatten() {
            if let Some(lang) = name.get("inLanguage").and_then(Value::as_str) {
                record.append_oefos_id(short_code, lang)?;
            }
        }
    }
    Ok(())
}

fn convert_learning_resource_type(value: &Value, _: &mut ImooxContext, record: &mut LomMetadata) -> ConvertResult<()> {
    let id = value
        .get("identifier")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_LEARNING_RESOURCE_TYPE);
    record.append_learningresourcetype(id)
}
