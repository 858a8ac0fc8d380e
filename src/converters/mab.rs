//! Digital library MAB export to MARC21
//!
//! An export file holds one `info` element with a `fie` child per MAB
//! field: `<fie><fien val="331"/><ind val=" "/><subf subfn="a" subfv=".."/></fie>`.
//! Besides bibliographic fields the export carries the hierarchy of the
//! digital library (root, parent, children) and the file layout on disk,
//! which the import walks after conversion.

use once_cell::sync::Lazy;

use crate::convert::{Convert, ConvertError, ConvertResult, Element, FallbackPolicy, HandlerTable};
use crate::marc::Marc21Metadata;
use crate::models::AccessLevel;

/// Everything the import needs to place the converted record
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MabContext {
    pub publisher: String,
    pub year: String,
    /// `None` when the export leaves file access to the parent
    pub access: Option<AccessLevel>,
    pub resource_type: String,
    pub children_ids: Vec<String>,
    pub all_child_ids: Vec<String>,
    pub root_id: Option<String>,
    pub parent_id: Option<String>,
    pub directory_name: String,
    pub filename: String,
}

impl MabContext {
    /// Children inherit the publisher of their parent
    pub fn with_publisher(publisher: impl Into<String>) -> Self {
        Self {
            publisher: publisher.into(),
            ..Default::default()
        }
    }
}

pub struct MabToMarc21;

type Table = HandlerTable<Element, MabContext, Marc21Metadata>;

/// Fields exported by the digital library without a MARC counterpart
const UNMAPPED: &[&str] = &[
    "001", "200", "334", "335", "341", "343", "359", "405", "406", "410", "412", "501", "507",
    "523", "527", "531", "540", "542", "552", "580", "590", "594", "595", "596", "652", "653",
    "655", "673", "675", "700", "710", "902", "904", "1000", "1001", "1002", "1003", "1004",
    "1005", "1006", "1007", "1008", "1009", "1054", "1055", "1060", "1061", "1062", "1101",
    "1103", "1104", "1106", "1107", "1108", "1109", "1150", "1151", "1152", "1153", "1154",
    "1155", "1156", "1157", "1158", "1159", "1160", "1161", "1162", "1203", "1204", "1206",
    "1207", "1208", "1209", "1210", "1211", "1212", "1213", "1214", "1215", "1250", "1301",
    "1302", "1303", "1400", "1403", "1404", "1405", "1406", "1407", "1408", "1409", "1410",
    "1411", "1450", "1451", "1452", "1453", "1454", "1455", "1456", "1457", "1458", "1500",
    "1501", "1502", "1503", "1505", "1506", "1507", "1508", "1509", "1550", "1551", "1552",
    "1553", "1554", "1600", "1601", "1602", "1603", "1604", "1700", "1701", "1702", "1703",
    "1704", "1705", "1706", "1707", "1708", "1709", "1800", "1801", "1802", "1803", "1804",
    "1805", "1806", "1807",
];

static TABLE: Lazy<Table> = Lazy::new(|| {
    HandlerTable::new("mab", FallbackPolicy::Strict)
        .on("100", visit_author)
        .on_range(101..=199, visit_further_author)
        .on("331", visit_title)
        .on("425", visit_year)
        .on("1050", visit_children_ids)
        .on("1051", visit_all_child_ids)
        .on("1052", visit_root_id)
        .on("1053", visit_parent_id)
        .on("1100", visit_access)
        .on("1102", visit_resource_type)
        .on("1105", visit_directory_name)
        .on("1200", visit_filename)
        .on("1401", visit_volume)
        .on("1402", visit_issue)
        .on("1504", visit_publisher)
        .on_each(UNMAPPED, ignore)
});

impl Convert for MabToMarc21 {
    type Source = Element;
    type Value = Element;
    type Context = MabContext;
    type Output = Marc21Metadata;

    fn table() -> &'static Table {
        &TABLE
    }

    fn entries(source: &Element) -> ConvertResult<Vec<(&str, &Element)>> {
        let info = source
            .find("info")
            .ok_or_else(|| ConvertError::invalid("info", "export has no info element"))?;

        info.children_named("fie")
            .map(|fie| Ok((field_number(fie)?, fie)))
            .collect()
    }

    fn record_id(source: &Element) -> Option<String> {
        let info = source.find("info")?;
        info.children_named("fie")
            .find(|fie| field_number(fie).ok() == Some("001"))
            .map(|fie| first_value(fie).to_string())
    }

    /// Books and journals get publication details from the collected
    /// publisher and year; cover sheets are titled by their type
    fn finish(ctx: &mut MabContext, record: &mut Marc21Metadata) -> ConvertResult<()> {
        if matches!(ctx.resource_type.as_str(), "book" | "journal") {
            record.emplace_datafield("502...", &[('c', ctx.publisher.as_str()), ('d', ctx.year.as_str())])?;
            record.emplace_datafield(
                "264..1.",
                &[('a', "Graz"), ('b', ctx.publisher.as_str()), ('c', ctx.year.as_str())],
            )?;
        }

        if ctx.resource_type == "coverSheet" {
            record.emplace_datafield("245.1.0.", &[('a', ctx.resource_type.as_str())])?;
        }
        Ok(())
    }
}

fn field_number(fie: &Element) -> ConvertResult<&str> {
    fie.child("fien")
        .and_then(|fien| fien.attr("val"))
        .ok_or_else(|| ConvertError::invalid("fie", "field without fien"))
}

/// Value of the first subfield, empty when it carries none
fn first_value(fie: &Element) -> &str {
    fie.children_named("subf")
        .next()
        .and_then(|subf| subf.attr("subfv"))
        .unwrap_or("")
}

fn ignore(_: &Element, _: &mut MabContext, _: &mut Marc21Metadata) -> ConvertResult<()> {
    Ok(())
}

fn visit_author(fie: &Element, _: &mut MabContext, record: &mut Marc21Metadata) -> ConvertResult<()> {
    record.emplace_datafield("100.1..", &[('a', first_value(fie)), ('4', "aut")])
}

fn visit_further_author(fie: &Element, _: &mut MabContext, record: &mut Marc21Metadata) -> ConvertResult<()> {
    record.append_datafield("700.1..", &[('a', first_value(fie)), ('4', "aut")])
}

fn visit_title(fie: &Element, _: &mut MabContext, record: &mut Marc21Metadata) -> ConvertResult<()> {
    record.emplace_datafield("245.1.0.", &[('a', first_value(fie))])
}

fn visit_year(fie: &Element, ctx: &mut MabContext, _: &mut Marc21Metadata) -> ConvertResult<()> {
    ctx.year = first_value(fie).to_string();
    Ok(())
}

fn split_ids(fie: &Element) -> Vec<String> {
    first_value(fie)
        .split(' ')
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

fn visit_children_ids(fie: &Element, ctx: &mut MabContext, _: &mut Marc21Metadata) -> ConvertResult<()> {
    ctx.children_ids = split_ids(fie);
    Ok(())
}

fn visit_all_child_ids(fie: &Element, ctx: &mut MabContext, _: &mut Marc21Metadata) -> ConvertResult<()> {
    ctx.all_child_ids = split_ids(fie);
    Ok(())
}

fn visit_root_id(fie: &Element, ctx: &mut MabContext, _: &mut Marc21Metadata) -> ConvertResult<()> {
    ctx.root_id = Some(first_value(fie).to_string());
    Ok(())
}

fn visit_parent_id(fie: &Element, ctx: &mut MabContext, _: &mut Marc21Metadata) -> ConvertResult<()> {
    ctx.parent_id = Some(first_value(fie).to_string());
    Ok(())
}

/// Only the root of a hierarchy states its access; `N/A` leaves it to the parent
fn visit_access(fie: &Element, ctx: &mut MabContext, _: &mut Marc21Metadata) -> ConvertResult<()> {
    ctx.access = match first_value(fie) {
        "open" | "openaccess" => Some(AccessLevel::Public),
        _ => None,
    };
    Ok(())
}

fn visit_resource_type(fie: &Element, ctx: &mut MabContext, record: &mut Marc21Metadata) -> ConvertResult<()> {
    let resource_type = first_value(fie);
    record.emplace_datafield("336...", &[('a', resource_type), ('2', "repository")])?;
    ctx.resource_type = resource_type.to_string();
    Ok(())
}

fn visit_directory_name(fie: &Element, ctx: &mut MabContext, _: &mut Marc21Metadata) -> ConvertResult<()> {
    ctx.directory_name = first_value(fie).to_string();
    Ok(())
}

fn visit_filename(fie: &Element, ctx: &mut MabContext, _: &mut Marc21Metadata) -> ConvertResult<()> {
    ctx.filename = first_value(fie).to_string();
    Ok(())
}

fn visit_volume(fie: &Element, ctx: &mut MabContext, record: &mut Marc21Metadata) -> ConvertResult<()> {
    let volume = first_value(fie);
    record.emplace_datafield("245.1.0.", &[('a', volume)])?;
    ctx.directory_name = volume.to_string();
    Ok(())
}

/// Issue directories are zero padded to two digits
fn visit_issue(fie: &Element, ctx: &mut MabContext, record: &mut Marc21Metadata) -> ConvertResult<()> {
    let issue = first_value(fie);
    let number: u32 = issue
        .trim()
        .parse()
        .map_err(|_| ConvertError::invalid("1402", format!("issue '{}' is not a number", issue)))?;
    record.emplace_datafield("245.1.0.", &[('a', issue)])?;
    ctx.directory_name = format!("{:02}", number);
    Ok(())
}

fn visit_publisher(fie: &Element, ctx: &mut MabContext, _: &mut Marc21Metadata) -> ConvertResult<()> {
    ctx.publisher = first_value(fie).to_string();
    Ok(())
}
