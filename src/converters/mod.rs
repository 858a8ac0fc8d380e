//! Source format converters
//!
//! One module per source system. Each converter is a unit type
//! implementing [`Convert`](crate::convert::Convert).

pub mod campusonline;
pub mod imoox;
pub mod lom_marc21;
pub mod mab;
pub mod pure;
pub mod teachcenter;

pub use campusonline::CampusOnlineToMarc21;
pub use imoox::ImooxToLom;
pub use lom_marc21::LomToMarc21;
pub use mab::{MabContext, MabToMarc21};
pub use pure::PureToMarc21;
pub use teachcenter::{TeachCenterKey, TeachCenterToLom};

use serde_json::Value;

use crate::convert::{ConvertError, ConvertResult};

/// Members of a JSON object in document order
pub(crate) fn object_entries<'a>(value: &'a Value, what: &str) -> ConvertResult<Vec<(&'a str, &'a Value)>> {
    value
        .as_object()
        .map(|object| object.iter().map(|(k, v)| (k.as_str(), v)).collect())
        .ok_or_else(|| ConvertError::invalid(what, "expected an object"))
}

/// `value` strings of a `[{"locale": .., "value": ..}]` list found at `pointer`
pub(crate) fn localized_texts<'a>(value: &'a Value, pointer: &str) -> impl Iterator<Item = &'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|text| text.get("value"))
        .filter_map(Value::as_str)
}

/// String or number as text
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Unescape the HTML entities course systems leave in descriptions
pub(crate) fn html_unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_localized_texts_tolerates_missing_paths() {
        let value = json!({"text": [{"locale": "en_GB", "value": "a"}, {"locale": "de_DE"}]});
        assert_eq!(localized_texts(&value, "/text").collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(localized_texts(&value, "/missing").count(), 0);
    }

    #[test]
    fn test_html_unescape() {
        assert_eq!(html_unescape("a &amp;lt; b &lt;p&gt;"), "a &lt; b <p>");
    }
}
