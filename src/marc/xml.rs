//! MARCXML serialization
//!
//! The registry exchanges records as MARC21 slim XML. Reading goes through
//! the generic [`Element`] tree; writing builds the document directly.

use quick_xml::escape::escape;

use super::record::{FieldEntry, Marc21Metadata};
use crate::convert::{ConvertError, ConvertResult, Element};

pub const MARCXML_NAMESPACE: &str = "http://www.loc.gov/MARC21/slim";

impl Marc21Metadata {
    /// Parse the first `record` element of a MARCXML document
    /// (a bare `record` root or one wrapped in a `collection`)
    pub fn from_marcxml(xml: &str) -> ConvertResult<Self> {
        let root = Element::parse(xml)?;
        Self::from_marcxml_element(&root)
    }

    pub fn from_marcxml_element(root: &Element) -> ConvertResult<Self> {
        let record = root
            .find("record")
            .ok_or_else(|| ConvertError::Xml("no record element".into()))?;

        let mut metadata = Marc21Metadata::new();
        for child in &record.children {
            match child.name.as_str() {
                "leader" => metadata.emplace_leader(child.text()),
                "controlfield" => {
                    let tag = child
                        .attr("tag")
                        .ok_or_else(|| ConvertError::Xml("controlfield without tag".into()))?;
                    metadata.emplace_controlfield(tag, child.text());
                }
                "datafield" => {
                    let tag = child
                        .attr("tag")
                        .ok_or_else(|| ConvertError::Xml("datafield without tag".into()))?;
                    let ind = |key: &str| {
                        child
                            .attr(key)
                            .and_then(|i| i.trim().chars().next())
                            .map(String::from)
                            .unwrap_or_default()
                    };
                    let subfields: Vec<(char, &str)> = child
                        .children_named("subfield")
                        .filter_map(|s| {
                            let code = s.attr("code")?.chars().next()?;
                            Some((code, s.text()))
                        })
                        .collect();
                    let path = format!("{}.{}.{}.", tag, ind("ind1"), ind("ind2"));
                    metadata.append_datafield(&path, &subfields)?;
                }
                _ => {}
            }
        }

        Ok(metadata)
    }

    /// Serialize as a MARCXML `record`, control fields and data fields sorted by tag
    pub fn to_marcxml(&self) -> String {
        let mut fields: Vec<(&str, &FieldEntry)> = self.fields().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));

        let mut xml = String::new();
        xml.push_str(&format!("<record xmlns=\"{}\">", MARCXML_NAMESPACE));
        xml.push_str(&format!("<leader>{}</leader>", escape(self.leader())));

        for (tag, entry) in fields {
            match entry {
                FieldEntry::Control(value) => {
                    xml.push_str(&format!(
                        "<controlfield tag=\"{}\">{}</controlfield>",
                        escape(tag),
                        escape(value.as_str())
                    ));
                }
                FieldEntry::Data(occurrences) => {
                    for field in occurrences {
                        xml.push_str(&format!(
                            "<datafield tag=\"{}\" ind1=\"{}\" ind2=\"{}\">",
                            escape(tag),
                            escape(field.ind1.to_string().as_str()),
                            escape(field.ind2.to_string().as_str())
                        ));
                        for (code, values) in &field.subfields {
                            for value in values {
                                xml.push_str(&format!(
                                    "<subfield code=\"{}\">{}</subfield>",
                                    escape(code.to_string().as_str()),
                                    escape(value.as_str())
                                ));
                            }
                        }
                        xml.push_str("</datafield>");
                    }
                }
            }
        }

        xml.push_str("</record>");
        xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY_RECORD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<collection xmlns="http://www.loc.gov/MARC21/slim">
  <record>
    <leader>00000nam a2200000 c 4500</leader>
    <controlfield tag="001">990012345</controlfield>
    <datafield tag="035" ind1=" " ind2=" ">
      <subfield code="a">(AT-OBV)AC12345678</subfield>
    </datafield>
    <datafield tag="245" ind1="1" ind2="0">
      <subfield code="a">A &amp; B</subfield>
      <subfield code="c">Doe, Jane</subfield>
    </datafield>
    <datafield tag="653" ind1=" " ind2=" "><subfield code="a">one</subfield></datafield>
    <datafield tag="653" ind1=" " ind2=" "><subfield code="a">two</subfield></datafield>
  </record>
</collection>"#;

    #[test]
    fn test_from_marcxml() {
        let record = Marc21Metadata::from_marcxml(REGISTRY_RECORD).unwrap();
        assert_eq!(record.leader(), "00000nam a2200000 c 4500");
        assert_eq!(record.controlfield("001"), Some("990012345"));
        assert_eq!(record.subfield_values("035...a").unwrap(), vec!["(AT-OBV)AC12345678"]);
        assert_eq!(record.subfield_values("245.1.0.a").unwrap(), vec!["A & B"]);
        assert_eq!(record.subfield_values("653...a").unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn test_to_marcxml_sorts_and_escapes() {
        let mut record = Marc21Metadata::new();
        record.emplace_datafield("245.1.0.", &[('a', "A & B")]).unwrap();
        record.emplace_controlfield("007", "cr");

        let xml = record.to_marcxml();
        let control = xml.find("<controlfield tag=\"007\">").unwrap();
        let data = xml.find("<datafield tag=\"245\" ind1=\"1\" ind2=\"0\">").unwrap();
        assert!(control < data);
        assert!(xml.contains("<subfield code=\"a\">A &amp; B</subfield>"));

        let parsed = Marc21Metadata::from_marcxml(&xml).unwrap();
        assert_eq!(parsed.subfield_values("245.1.0.a").unwrap(), vec!["A & B"]);
    }

    #[test]
    fn test_missing_record_element() {
        assert!(Marc21Metadata::from_marcxml("<collection/>").is_err());
    }
}
