//! Research information system (Pure) JSON to MARC21
//!
//! Pure records carry far more attributes than the repository keeps, so
//! unknown keys are skipped. Keyword groups and publication statuses are
//! nested objects converted with their own tables.

use once_cell::sync::Lazy;
use serde_json::Value;

use super::{localized_texts, object_entries, scalar_text};
use crate::convert::{Convert, ConvertError, ConvertResult, FallbackPolicy, HandlerTable};
use crate::marc::Marc21Metadata;

type Table = HandlerTable<Value, (), Marc21Metadata>;

pub struct PureToMarc21;

static TABLE: Lazy<Table> = Lazy::new(|| {
    HandlerTable::new("pure", FallbackPolicy::Permissive)
        .on("pureId", convert_pure_id)
        .on("abstract", convert_abstract)
        .on("additionalLinks", convert_additional_links)
        .on("bibliographicalNote", convert_bibliographical_note)
        .on("edition", convert_edition)
        .on("electronicIsbns", convert_electronic_isbns)
        .on("event", convert_event)
        .on("isbns", convert_isbns)
        .on("journalAssociation", convert_journal_association)
        .on("journalNumber", convert_journal_number)
        .on("keywordGroups", convert_keyword_groups)
        .on("language", convert_language)
        .on("managingOrganisationalUnit", convert_managing_organisational_unit)
        .on("numberOfPages", convert_number_of_pages)
        .on("organisationalUnits", convert_organisational_units)
        .on("pages", convert_pages)
        .on("patentNumber", convert_patent_number)
        .on("peerReview", convert_peer_review)
        .on("placeOfPublication", convert_place_of_publication)
        .on("publicationSeries", convert_publication_series)
        .on("publicationStatuses", convert_publication_statuses)
        .on("publisher", convert_publisher)
        .on("relatedProjects", convert_related_projects)
        .on("subTitle", convert_sub_title)
        .on("title", convert_title)
        .on("volume", convert_volume)
});

static KEYWORD_GROUP: Lazy<Table> = Lazy::new(|| {
    HandlerTable::new("pure.keywordGroup", FallbackPolicy::Permissive)
        .on("keywordContainers", convert_keyword_containers)
        .on("freeKeywords", convert_free_keywords)
        .on("structuredKeyword", convert_structured_keyword)
});

static PUBLICATION_STATUS: Lazy<Table> = Lazy::new(|| {
    HandlerTable::new("pure.publicationStatus", FallbackPolicy::Permissive)
        .on("publicationDate", convert_publication_date)
        .on("publicationStatus", convert_publication_status)
});

impl Convert for PureToMarc21 {
    type Source = Value;
    type Value = Value;
    type Context = ();
    type Output = Marc21Metadata;

    fn table() -> &'static Table {
        &TABLE
    }

    fn entries(source: &Value) -> ConvertResult<Vec<(&str, &Value)>> {
        object_entries(source, "pure record")
    }

    fn record_id(source: &Value) -> Option<String> {
        pure_id(source)
    }
}

/// `pureId` of a record, numeric or string
pub fn pure_id(record: &Value) -> Option<String> {
    record.get("pureId").and_then(scalar_text)
}

/// English and German language names as delivered by Pure to ISO 639-3
pub fn iso639_3(name: &str) -> Option<&'static str> {
    let code = match name.trim().to_lowercase().as_str() {
        "german" | "deutsch" => "deu",
        "english" | "englisch" => "eng",
        "french" | "französisch" => "fra",
        "italian" | "italienisch" => "ita",
        "spanish" | "spanisch" => "spa",
        "portuguese" | "portugiesisch" => "por",
        "dutch" | "niederländisch" => "nld",
        "russian" | "russisch" => "rus",
        "polish" | "polnisch" => "pol",
        "czech" | "tschechisch" => "ces",
        "slovenian" | "slowenisch" => "slv",
        "croatian" | "kroatisch" => "hrv",
        "hungarian" | "ungarisch" => "hun",
        "chinese" | "chinesisch" => "zho",
        "japanese" | "japanisch" => "jpn",
        "turkish" | "türkisch" => "tur",
        "greek" | "griechisch" => "ell",
        "latin" | "latein" => "lat",
        _ => return None,
    };
    Some(code)
}

fn text_of(key: &str, value: &Value) -> ConvertResult<String> {
    scalar_text(value).ok_or_else(|| ConvertError::invalid(key, "expected a string"))
}

fn items(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or(&[])
}

fn convert_pure_id(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    let id = text_of("pureId", value)?;
    record.emplace_datafield("995...", &[('i', "Pure"), ('d', id.as_str()), ('9', "local")])
}

fn convert_abstract(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    for text in localized_texts(value, "/text") {
        record.append_datafield("520...", &[('a', text)])?;
    }
    Ok(())
}

fn convert_additional_links(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    for url in items(value).iter().filter_map(|link| link.get("url")).filter_map(Value::as_str) {
        record.append_datafield("856.4.1.", &[('u', url)])?;
    }
    Ok(())
}

fn convert_bibliographical_note(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    for text in localized_texts(value, "/text") {
        record.append_datafield("500...", &[('a', text)])?;
    }
    Ok(())
}

fn convert_edition(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    record.emplace_subfield("250...a", text_of("edition", value)?)
}

fn convert_electronic_isbns(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    match items(value).first().and_then(scalar_text) {
        Some(isbn) => record.append_datafield("020...", &[('a', isbn.trim())]),
        None => Ok(()),
    }
}

fn convert_event(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    for name in localized_texts(value, "/name/text") {
        record.append_datafield("711.2..", &[('a', name)])?;
    }
    Ok(())
}

fn convert_isbns(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    for isbn in items(value).iter().filter_map(scalar_text) {
        record.append_datafield("020...", &[('a', isbn.trim())])?;
    }
    Ok(())
}

fn convert_journal_association(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    match value.pointer("/title/value").and_then(Value::as_str) {
        Some(title) => record.emplace_subfield("773.0.8.t", title),
        None => Ok(()),
    }
}

fn convert_journal_number(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    record.append_subfield("773.0.8.g", text_of("journalNumber", value)?)
}

fn convert_keyword_groups(value: &Value, ctx: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    for group in items(value) {
        KEYWORD_GROUP.visit(object_entries(group, "keywordGroup")?, ctx, record)?;
    }
    Ok(())
}

fn convert_keyword_containers(value: &Value, ctx: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    for container in items(value) {
        KEYWORD_GROUP.visit(object_entries(container, "keywordContainer")?, ctx, record)?;
    }
    Ok(())
}

fn convert_free_keywords(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    for entry in items(value) {
        for word in entry.get("freeKeywords").map(items).unwrap_or(&[]).iter().filter_map(Value::as_str) {
            record.append_datafield("650..4.", &[('g', word)])?;
        }
    }
    Ok(())
}

fn convert_structured_keyword(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    for word in localized_texts(value, "/term/text") {
        record.append_datafield("650..4.", &[('a', word)])?;
    }
    Ok(())
}

/// Unknown language names are logged and skipped
fn convert_language(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    for name in localized_texts(value, "/term/text") {
        match iso639_3(name) {
            Some(code) => record.append_unique_subfield("041...a", code)?,
            None => tracing::warn!(language = name, "No ISO 639-3 code for language"),
        }
    }
    Ok(())
}

fn organisational_unit(unit: &Value, record: &mut Marc21Metadata) -> ConvertResult<()> {
    for name in localized_texts(unit, "/name/text") {
        record.append_unique_subfield("100.1..u", name)?;
        record.append_unique_subfield("700.1..u", name)?;
    }
    Ok(())
}

fn convert_managing_organisational_unit(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    organisational_unit(value, record)
}

fn convert_organisational_units(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    for unit in items(value) {
        organisational_unit(unit, record)?;
    }
    Ok(())
}

fn convert_number_of_pages(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    record.emplace_subfield("300...a", text_of("numberOfPages", value)?)
}

fn convert_pages(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    record.emplace_subfield("300...a", text_of("pages", value)?)
}

fn convert_patent_number(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    record.emplace_subfield("013...a", text_of("patentNumber", value)?)
}

fn convert_peer_review(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    if value.as_bool() == Some(true) {
        record.append_datafield("500...", &[('a', "Refereed/Peer-reviewed")])?;
    }
    Ok(())
}

fn convert_place_of_publication(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    record.emplace_subfield("264...a", text_of("placeOfPublication", value)?)
}

fn convert_publication_series(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    for name in items(value).iter().filter_map(|s| s.get("name")).filter_map(Value::as_str) {
        record.append_datafield("490.0..", &[('a', name)])?;
    }
    Ok(())
}

fn convert_publication_statuses(value: &Value, ctx: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    for status in items(value) {
        PUBLICATION_STATUS.visit(object_entries(status, "publicationStatus")?, ctx, record)?;
    }
    Ok(())
}

fn convert_publication_date(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    match value.get("year").and_then(scalar_text) {
        Some(year) => record.emplace_subfield("264...c", year),
        None => Ok(()),
    }
}

fn convert_publication_status(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    for status in localized_texts(value, "/term/text") {
        record.append_subfield("250...b", status)?;
    }
    Ok(())
}

fn convert_publisher(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    for name in localized_texts(value, "/name/text") {
        record.append_subfield("264...b", name)?;
    }
    Ok(())
}

fn convert_related_projects(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    for project in items(value) {
        for name in localized_texts(project, "/name/text") {
            record.append_datafield("536...", &[('a', name)])?;
        }
    }
    Ok(())
}

fn convert_sub_title(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    match value.get("value").and_then(Value::as_str) {
        Some(subtitle) => record.emplace_subfield("245.1.0.b", subtitle),
        None => Ok(()),
    }
}

fn convert_title(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    let title = value
        .get("value")
        .and_then(Value::as_str)
        .ok_or_else(|| ConvertError::invalid("title", "missing value"))?;
    record.emplace_subfield("245.1.0.a", title)
}

fn convert_volume(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    let volume = text_of("volume", value)?;
    record.append_subfield("490.0..v", volume.as_str())?;
    record.append_subfield("773.0.8.g", volume)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn publication() -> Value {
        json!({
            "pureId": 123456,
            "title": {"value": "Open Science"},
            "subTitle": {"value": "A Study"},
            "abstract": {"text": [{"locale": "en_GB", "value": "Abstract."}]},
            "language": {"term": {"text": [{"locale": "en_GB", "value": "English"}, {"locale": "de_DE", "value": "Klingonisch"}]}},
            "organisationalUnits": [
                {"name": {"text": [{"value": "Institute A"}]}},
                {"name": {"text": [{"value": "Institute A"}]}},
                {"name": {"text": [{"value": "Institute B"}]}}
            ],
            "keywordGroups": [{
                "keywordContainers": [
                    {"freeKeywords": [{"freeKeywords": ["open", "science"]}]},
                    {"structuredKeyword": {"term": {"text": [{"value": "Physics"}]}}}
                ]
            }],
            "publicationStatuses": [{
                "publicationDate": {"year": 2024},
                "publicationStatus": {"term": {"text": [{"value": "Published"}]}}
            }],
            "peerReview": true,
            "volume": "12",
            "somethingElse": {"ignored": true}
        })
    }

    #[test]
    fn test_convert_publication() {
        let mut record = Marc21Metadata::new();
        PureToMarc21::convert(&publication(), &mut record).unwrap();

        assert_eq!(record.subfield_values("995...d").unwrap(), vec!["123456"]);
        assert_eq!(record.subfield_values("245.1.0.a").unwrap(), vec!["Open Science"]);
        assert_eq!(record.subfield_values("245.1.0.b").unwrap(), vec!["A Study"]);
        assert_eq!(record.subfield_values("520...a").unwrap(), vec!["Abstract."]);
        assert_eq!(record.subfield_values("041...a").unwrap(), vec!["eng"]);
        assert_eq!(
            record.subfield_values("700.1..u").unwrap(),
            vec!["Institute A", "Institute B"]
        );
        assert_eq!(record.subfield_values("650..4.g").unwrap(), vec!["open", "science"]);
        assert_eq!(record.subfield_values("650..4.a").unwrap(), vec!["Physics"]);
        assert_eq!(record.subfield_values("264...c").unwrap(), vec!["2024"]);
        assert_eq!(record.subfield_values("250...b").unwrap(), vec!["Published"]);
        assert_eq!(record.subfield_values("500...a").unwrap(), vec!["Refereed/Peer-reviewed"]);
        assert_eq!(record.subfield_values("773.0.8.g").unwrap(), vec!["12"]);
    }

    #[test]
    fn test_language_names() {
        assert_eq!(iso639_3("Deutsch"), Some("deu"));
        assert_eq!(iso639_3(" English "), Some("eng"));
        assert_eq!(iso639_3("Klingonisch"), None);
    }

    #[test]
    fn test_non_object_record_is_rejected() {
        let mut record = Marc21Metadata::new();
        assert!(PureToMarc21::convert(&json!([1, 2]), &mut record).is_err());
    }
}
