//! Campus information system thesis XML to MARC21
//!
//! The thesis document is a flat list of `attr` elements plus `metaclass`
//! groups (AUTHOR, TEXT, SUPERVISOR, ...) whose `metaobj` children carry
//! the same `attr` keys again. Every key the service can send is listed;
//! an unknown key means the service changed and the conversion fails.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::convert::{Convert, ConvertResult, Element, FallbackPolicy, HandlerTable};
use crate::marc::{Marc21Metadata, RESTRICTION_MARKER};

pub const INSTITUTION: &str = "Technische Universität Graz";
pub const SOURCE_SYSTEM: &str = "TUGRAZonline";
const YEAR_PLACEHOLDER: &str = "JAHR";
const LANGUAGE_PLACEHOLDER: &str = "PLATZHALTER";

/// Cross-field state of one thesis conversion
#[derive(Debug, Default)]
pub struct CampusOnlineContext {
    pub in_metaobj: bool,
    pub metaclass: String,
    pub first_name: String,
    pub last_name: String,
    pub author_name: Option<String>,
    /// Supervisor type code read inside a SUPERVISOR metaobj
    pub typ: String,
    /// Language of the current TEXT metaobj
    pub language: Option<String>,
    /// Original language of the thesis
    pub object_language: Option<String>,
    pub lock_from: String,
    pub year: Option<String>,
}

/// Converter for the campus thesis service
pub struct CampusOnlineToMarc21;

impl CampusOnlineToMarc21 {
    /// Fixed fields every thesis record starts with
    pub fn skeleton() -> ConvertResult<Marc21Metadata> {
        let mut record = Marc21Metadata::new();
        record.emplace_controlfield("007", "cr#|||||||||||");
        record.emplace_datafield(
            "040...",
            &[('a', "AT-UBTUG"), ('b', "ger"), ('d', "AT-UBTUG"), ('e', "rda")],
        )?;
        record.emplace_datafield("044...", &[('c', "XA-AT")])?;
        record.emplace_datafield("264..1.", &[('a', "Graz"), ('c', YEAR_PLACEHOLDER)])?;
        record.emplace_datafield("300...", &[('a', "1 Online-Ressource ( Seiten )"), ('b', "ill")])?;
        record.emplace_datafield("336...", &[('b', "txt")])?;
        record.emplace_datafield("337...", &[('b', "c")])?;
        record.emplace_datafield("338...", &[('b', "cr")])?;
        record.emplace_datafield("347...", &[('a', "Textdatei"), ('b', "PDF")])?;
        record.emplace_datafield("506.0..", &[('f', "Unrestricted online access"), ('2', "star")])?;
        record.emplace_datafield("546...", &[('a', "Zusammenfassung in")])?;
        record.emplace_datafield(
            "655...",
            &[('a', "Hochschulschrift"), ('0', "(DE-588)4113937-9"), ('d', "gnd-content")],
        )?;
        Ok(record)
    }
}

type Table = HandlerTable<Element, CampusOnlineContext, Marc21Metadata>;

/// Keys the service sends that carry nothing for the bibliographic record
const IGNORED: &[&str] = &[
    "PAG", "CO", "CHD", "ARCHD", "PUBD", "PUBLIC", "STATUS", "STATUSD", "ORG", "ZUGKB", "ZUG",
    "SPSTAT", "SPBGR", "TLANGS", "VOLLTEXT", "FNLN", "AKK", "MNR", "STRI", "STKZ", "ORIG",
    "INTERN",
];

static TABLE: Lazy<Table> = Lazy::new(|| {
    HandlerTable::new("campusonline", FallbackPolicy::Strict)
        .on("ID", visit_id)
        .on("EJAHR", visit_ejahr)
        .on("ORGP", visit_orgp)
        .on("TYPKB", visit_typkb)
        .on("TYP", visit_typ)
        .on("SPVON", visit_spvon)
        .on("SPBIS", visit_spbis)
        .on("OLANG", visit_olang)
        .on("LANG", visit_lang)
        .on("metaclass", visit_metaclass)
        .on("name", visit_name)
        .on("metaobj", visit_metaobj)
        .on("FN", visit_fn)
        .on("LN", visit_ln)
        .on("TIT", visit_tit)
        .on("ABS", visit_abs)
        .on("KEYW", visit_keyw)
        .on_each(IGNORED, ignore)
});

static KEYWORD_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[;,]").expect("valid regex"));

impl Convert for CampusOnlineToMarc21 {
    type Source = Element;
    type Value = Element;
    type Context = CampusOnlineContext;
    type Output = Marc21Metadata;

    fn table() -> &'static Table {
        &TABLE
    }

    fn entries(source: &Element) -> ConvertResult<Vec<(&str, &Element)>> {
        Ok(source.entries())
    }

    fn record_id(source: &Element) -> Option<String> {
        source.find_attr("ID").map(|id| id.text().to_string())
    }

    /// Write 008 and fill the year placeholders once the whole thesis is known
    fn finish(ctx: &mut CampusOnlineContext, record: &mut Marc21Metadata) -> ConvertResult<()> {
        let year = ctx.year.as_deref().unwrap_or("????");
        let language = ctx
            .object_language
            .as_deref()
            .and_then(language_decode)
            .unwrap_or("und");

        record.emplace_controlfield("008", fixed_length_data(&Utc::now().format("%y%m%d").to_string(), year, language));

        if let Some(year) = &ctx.year {
            record.replace_placeholder(YEAR_PLACEHOLDER, year);
        }
        Ok(())
    }
}

/// 40 character fixed-length data elements of 008
pub fn fixed_length_data(entered: &str, year: &str, language: &str) -> String {
    format!(
        "{:<6}s{:<4}    au |||||om||||||||||{:<3}|c",
        entered, year, language
    )
}

/// Campus language code to MARC language code
pub fn language_decode(lang: &str) -> Option<&'static str> {
    match lang {
        "DE" => Some("deu"),
        "EN" => Some("eng"),
        _ => None,
    }
}

fn construct_name(first: &str, last: &str) -> String {
    format!("{}, {}", last, first)
}

fn ignore(_: &Element, _: &mut CampusOnlineContext, _: &mut Marc21Metadata) -> ConvertResult<()> {
    Ok(())
}

fn visit_id(node: &Element, _: &mut CampusOnlineContext, record: &mut Marc21Metadata) -> ConvertResult<()> {
    record.emplace_datafield("995...", &[('i', SOURCE_SYSTEM), ('d', node.text()), ('9', "local")])
}

fn visit_ejahr(node: &Element, ctx: &mut CampusOnlineContext, _: &mut Marc21Metadata) -> ConvertResult<()> {
    let year: String = node.text().chars().take(4).collect();
    if year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()) {
        ctx.year = Some(year);
    }
    Ok(())
}

/// `ORGP` is the organisation path `university>faculty>institute`
fn visit_orgp(node: &Element, _: &mut CampusOnlineContext, record: &mut Marc21Metadata) -> ConvertResult<()> {
    let path = node.text().replace("&gt;", ">");
    let parts: Vec<&str> = path.split('>').map(str::trim).collect();
    let faculty = parts.get(1).copied().unwrap_or("");
    let institute = parts.get(2).copied().unwrap_or("");

    record.emplace_datafield("971.5..", &[('a', INSTITUTION), ('b', faculty), ('c', institute)])
}

fn visit_typkb(node: &Element, _: &mut CampusOnlineContext, record: &mut Marc21Metadata) -> ConvertResult<()> {
    let value = if node.text() == "DISS" { "HS-DISS" } else { "HS-MASTER" };
    record.emplace_datafield("970.2..", &[('d', value)])
}

fn visit_typ(node: &Element, ctx: &mut CampusOnlineContext, record: &mut Marc21Metadata) -> ConvertResult<()> {
    if ctx.in_metaobj {
        ctx.typ = node.text().to_string();
        return Ok(());
    }

    record.emplace_datafield(
        "502...",
        &[('b', node.text()), ('c', INSTITUTION), ('d', YEAR_PLACEHOLDER)],
    )
}

fn first_word(text: &str) -> &str {
    text.split(' ').next().unwrap_or("")
}

fn visit_spvon(node: &Element, ctx: &mut CampusOnlineContext, _: &mut Marc21Metadata) -> ConvertResult<()> {
    ctx.lock_from = first_word(node.text()).to_string();
    Ok(())
}

fn visit_spbis(node: &Element, ctx: &mut CampusOnlineContext, record: &mut Marc21Metadata) -> ConvertResult<()> {
    let until = node.text();
    if until.is_empty() {
        return Ok(());
    }

    record.emplace_datafield(
        "971.7..",
        &[('a', RESTRICTION_MARKER), ('b', ctx.lock_from.as_str()), ('c', first_word(until))],
    )
}

fn visit_olang(node: &Element, ctx: &mut CampusOnlineContext, record: &mut Marc21Metadata) -> ConvertResult<()> {
    ctx.object_language = Some(node.text().to_string());
    let code = language_decode(node.text()).unwrap_or(LANGUAGE_PLACEHOLDER);
    record.emplace_subfield("041...a", code)
}

fn visit_lang(node: &Element, ctx: &mut CampusOnlineContext, _: &mut Marc21Metadata) -> ConvertResult<()> {
    ctx.language = Some(node.text().to_string());
    Ok(())
}

fn visit_metaclass(node: &Element, ctx: &mut CampusOnlineContext, record: &mut Marc21Metadata) -> ConvertResult<()> {
    TABLE.visit(node.entries(), ctx, record)
}

fn visit_name(node: &Element, ctx: &mut CampusOnlineContext, _: &mut Marc21Metadata) -> ConvertResult<()> {
    ctx.metaclass = node.text().to_string();
    Ok(())
}

fn visit_metaobj(node: &Element, ctx: &mut CampusOnlineContext, record: &mut Marc21Metadata) -> ConvertResult<()> {
    if !matches!(ctx.metaclass.as_str(), "AUTHOR" | "TEXT" | "SUPERVISOR") {
        return Ok(());
    }

    ctx.in_metaobj = true;
    ctx.first_name.clear();
    ctx.last_name.clear();
    ctx.typ.clear();

    TABLE.visit(node.entries(), ctx, record)?;

    match ctx.metaclass.as_str() {
        "AUTHOR" => {
            let name = construct_name(&ctx.first_name, &ctx.last_name);
            record.emplace_datafield("100.1..", &[('a', name.as_str()), ('4', "aut")])?;
            ctx.author_name = Some(name);
        }
        "SUPERVISOR" => {
            let ind1 = match ctx.typ.as_str() {
                "BTTUG" => "0",
                "MBTUG" => "2",
                "1BUTUG" => "1",
                _ => "",
            };
            let name = construct_name(&ctx.first_name, &ctx.last_name);
            record.append_datafield(&format!("971.{}.0.", ind1), &[('a', name.as_str())])?;
        }
        _ => {}
    }

    ctx.in_metaobj = false;
    Ok(())
}

fn visit_fn(node: &Element, ctx: &mut CampusOnlineContext, _: &mut Marc21Metadata) -> ConvertResult<()> {
    ctx.first_name = node.text().to_string();
    Ok(())
}

fn visit_ln(node: &Element, ctx: &mut CampusOnlineContext, _: &mut Marc21Metadata) -> ConvertResult<()> {
    ctx.last_name = node.text().to_string();
    Ok(())
}

/// Title in the thesis language goes to 245, translations to 246
fn visit_tit(node: &Element, ctx: &mut CampusOnlineContext, record: &mut Marc21Metadata) -> ConvertResult<()> {
    if !ctx.in_metaobj {
        return Ok(());
    }

    if ctx.language == ctx.object_language {
        let author = ctx.author_name.as_deref().unwrap_or("N/A");
        record.emplace_datafield("245.1.0.", &[('a', node.text()), ('c', author)])
    } else {
        record.append_datafield("246.1..", &[('i', SOURCE_SYSTEM), ('a', node.text())])
    }
}

fn visit_abs(node: &Element, _: &mut CampusOnlineContext, record: &mut Marc21Metadata) -> ConvertResult<()> {
    record.append_datafield("520...", &[('a', node.text())])
}

fn visit_keyw(node: &Element, _: &mut CampusOnlineContext, record: &mut Marc21Metadata) -> ConvertResult<()> {
    for subject in KEYWORD_SEPARATOR
        .split(node.text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        record.append_datafield("653...", &[('a', subject)])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const THESIS: &str = r#"<bas:thesis xmlns:bas="http://www.campusonline.at/thesisservice/basetypes">
  <bas:attr key="ID">4711</bas:attr>
  <bas:attr key="TYPKB">DISS</bas:attr>
  <bas:attr key="TYP">Dissertation</bas:attr>
  <bas:attr key="EJAHR">2023</bas:attr>
  <bas:attr key="ORGP">TU Graz&amp;gt;Fakultät für Informatik&amp;gt;Institut für Softwaretechnologie</bas:attr>
  <bas:attr key="OLANG">EN</bas:attr>
  <bas:attr key="VOLLTEXT">J</bas:attr>
  <bas:attr key="SPVON">2023-03-03 00:00:00</bas:attr>
  <bas:attr key="SPBIS">2025-03-03 00:00:00</bas:attr>
  <bas:metaclass>
    <bas:name>AUTHOR</bas:name>
    <bas:metaobj>
      <bas:attr key="FN">Jane</bas:attr>
      <bas:attr key="LN">Doe</bas:attr>
      <bas:attr key="MNR">01234567</bas:attr>
    </bas:metaobj>
  </bas:metaclass>
  <bas:metaclass>
    <bas:name>SUPERVISOR</bas:name>
    <bas:metaobj>
      <bas:attr key="TYP">BTTUG</bas:attr>
      <bas:attr key="FN">Max</bas:attr>
      <bas:attr key="LN">Mustermann</bas:attr>
    </bas:metaobj>
  </bas:metaclass>
  <bas:metaclass>
    <bas:name>TEXT</bas:name>
    <bas:metaobj>
      <bas:attr key="LANG">EN</bas:attr>
      <bas:attr key="TIT">Graph Rewriting</bas:attr>
      <bas:attr key="ABS">An abstract.</bas:attr>
      <bas:attr key="KEYW">graphs; rewriting, , systems</bas:attr>
    </bas:metaobj>
    <bas:metaobj>
      <bas:attr key="LANG">DE</bas:attr>
      <bas:attr key="TIT">Graphersetzung</bas:attr>
    </bas:metaobj>
  </bas:metaclass>
  <bas:metaclass>
    <bas:name>OTHER</bas:name>
    <bas:metaobj><bas:attr key="UNKNOWN">skipped with its metaclass</bas:attr></bas:metaobj>
  </bas:metaclass>
</bas:thesis>"#;

    fn convert(xml: &str) -> ConvertResult<Marc21Metadata> {
        let thesis = Element::parse(xml)?;
        let mut record = CampusOnlineToMarc21::skeleton()?;
        CampusOnlineToMarc21::convert(&thesis, &mut record)?;
        Ok(record)
    }

    #[test]
    fn test_convert_thesis() {
        let record = convert(THESIS).unwrap();

        assert_eq!(record.subfield_values("995...d").unwrap(), vec!["4711"]);
        assert_eq!(record.subfield_values("970.2..d").unwrap(), vec!["HS-DISS"]);
        assert_eq!(record.subfield_values("100.1..a").unwrap(), vec!["Doe, Jane"]);
        assert_eq!(record.subfield_values("245.1.0.a").unwrap(), vec!["Graph Rewriting"]);
        assert_eq!(record.subfield_values("245.1.0.c").unwrap(), vec!["Doe, Jane"]);
        assert_eq!(record.subfield_values("246.1..a").unwrap(), vec!["Graphersetzung"]);
        assert_eq!(record.subfield_values("971.0.0.a").unwrap(), vec!["Mustermann, Max"]);
        assert_eq!(record.subfield_values("041...a").unwrap(), vec!["eng"]);
        assert_eq!(
            record.subfield_values("653...a").unwrap(),
            vec!["graphs", "rewriting", "systems"]
        );
        assert_eq!(
            record.subfield_values("971.5..b").unwrap(),
            vec!["Fakultät für Informatik"]
        );
    }

    #[test]
    fn test_lock_period_and_year_placeholders() {
        let record = convert(THESIS).unwrap();

        assert!(crate::marc::is_restricted(&record));
        assert_eq!(record.subfield_values("971.7..b").unwrap(), vec!["2023-03-03"]);
        assert_eq!(record.subfield_values("971.7..c").unwrap(), vec!["2025-03-03"]);
        assert_eq!(record.subfield_values("264..1.c").unwrap(), vec!["2023"]);
        assert_eq!(record.subfield_values("502...d").unwrap(), vec!["2023"]);

        let data = record.controlfield("008").unwrap();
        assert_eq!(data.chars().count(), 40);
        assert_eq!(&data[7..11], "2023");
        assert_eq!(&data[35..38], "eng");
    }

    #[test]
    fn test_unknown_key_names_key_and_record() {
        let xml = THESIS.replace("<bas:attr key=\"VOLLTEXT\">J</bas:attr>", "<bas:attr key=\"NEWKEY\">x</bas:attr>");
        let err = convert(&xml).unwrap_err();
        assert_eq!(err.unmapped_key(), Some("NEWKEY"));
        assert!(err.to_string().contains("record 4711"));
    }

    #[test]
    fn test_fixed_length_data() {
        assert_eq!(fixed_length_data("240101", "2024", "deu").len(), 40);
    }
}
