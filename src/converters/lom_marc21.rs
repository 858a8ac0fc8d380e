//! LOM (OER record) to MARC21 for the library registry
//!
//! Every top-level LOM section is listed; a section without a MARC
//! counterpart is still named so that a new section fails loudly.

use once_cell::sync::Lazy;
use serde_json::Value;

use super::object_entries;
use crate::convert::{Convert, ConvertResult, FallbackPolicy, HandlerTable};
use crate::marc::Marc21Metadata;

pub struct LomToMarc21;

type Table = HandlerTable<Value, (), Marc21Metadata>;

static TABLE: Lazy<Table> = Lazy::new(|| {
    HandlerTable::new("lom", FallbackPolicy::Strict)
        .on("general", visit_general)
        .on("lifecycle", visit_lifecycle)
        .on("technical", visit_technical)
        .on("educational", visit_educational)
        .on("rights", visit_rights)
        .on("classification", visit_classification)
        .on_each(&["metametadata", "courses", "relation", "annotation"], ignore)
});

impl Convert for LomToMarc21 {
    type Source = Value;
    type Value = Value;
    type Context = ();
    type Output = Marc21Metadata;

    fn table() -> &'static Table {
        &TABLE
    }

    fn entries(source: &Value) -> ConvertResult<Vec<(&str, &Value)>> {
        object_entries(source, "metadata")
    }

    fn record_id(source: &Value) -> Option<String> {
        source
            .pointer("/general/identifier/0/entry/langstring/#text")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn prepare(_: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
        record.emplace_controlfield("007", "cr#|||||||||||");
        record.emplace_datafield("337...", &[('b', "c")])?;
        record.emplace_datafield("338...", &[('b', "cr")])
    }
}

/// `#text` of a langstring
fn text(value: &Value) -> Option<&str> {
    value.pointer("/langstring/#text").and_then(Value::as_str)
}

fn each<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value.get(key).and_then(Value::as_array).into_iter().flatten()
}

fn ignore(_: &Value, _: &mut (), _: &mut Marc21Metadata) -> ConvertResult<()> {
    Ok(())
}

fn visit_general(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    if let Some(title) = value.get("title").and_then(text) {
        record.emplace_subfield("245.1.0.a", title)?;
    }
    for language in each(value, "language").filter_map(Value::as_str) {
        record.append_unique_subfield("041...a", language)?;
    }
    for description in each(value, "description").filter_map(text) {
        record.append_datafield("520...", &[('a', description)])?;
    }
    for keyword in each(value, "keyword").filter_map(text) {
        record.append_datafield("653...", &[('a', keyword)])?;
    }
    for identifier in each(value, "identifier") {
        let entry = identifier.get("entry").and_then(text);
        let catalog = identifier.get("catalog").and_then(Value::as_str);
        if let (Some(entry), Some(catalog)) = (entry, catalog) {
            record.append_datafield("024.7..", &[('a', entry), ('2', catalog)])?;
        }
    }
    Ok(())
}

fn visit_lifecycle(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    for contribute in each(value, "contribute") {
        let role = contribute.get("role").and_then(|r| r.get("value")).and_then(text).unwrap_or("");
        for name in each(contribute, "entity").filter_map(Value::as_str) {
            record.append_datafield("700.1..", &[('a', name), ('e', role)])?;
        }
    }
    if let Some(version) = value.get("version").and_then(text) {
        record.emplace_subfield("250...a", version)?;
    }
    if let Some(datetime) = value.get("datetime").and_then(Value::as_str) {
        let year: String = datetime.chars().take(4).collect();
        record.emplace_subfield("264..1.c", year)?;
    }
    Ok(())
}

fn visit_technical(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    if let Some(url) = value.pointer("/location/#text").and_then(Value::as_str) {
        record.emplace_datafield("856.4.0.", &[('u', url)])?;
    }
    for format in each(value, "format").filter_map(Value::as_str) {
        record.append_unique_subfield("347...b", format)?;
    }
    Ok(())
}

fn visit_educational(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    for description in each(value, "description").filter_map(text) {
        record.append_datafield("521...", &[('a', description)])?;
    }
    Ok(())
}

fn visit_rights(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    if let Some(url) = value.get("url").and_then(Value::as_str) {
        record.emplace_datafield("540...", &[('u', url)])?;
    }
    Ok(())
}

/// ÖFOS ids, once each regardless of how many languages carry them
fn visit_classification(value: &Value, _: &mut (), record: &mut Marc21Metadata) -> ConvertResult<()> {
    let ids = value
        .as_array()
        .into_iter()
        .flatten()
        .flat_map(|classification| each(classification, "taxonpath"))
        .flat_map(|path| each(path, "taxon"))
        .filter_map(|taxon| taxon.get("id"))
        .filter_map(Value::as_str);

    for id in ids {
        if !record.contains("084", 'a', id) {
            record.append_datafield("084...", &[('a', id), ('2', "oefos")])?;
        }
    }
    Ok(())
}
