//! `xl/sharedStrings.xml` reader

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{local_name, TemplateError};

/// Plain text of every `<si>`, rich-text runs concatenated, phonetic runs skipped.
pub(crate) fn parse(xml: &[u8]) -> Result<Vec<String>, TemplateError> {
    let mut reader = Reader::from_reader(xml);
    let mut strings = Vec::new();

    let mut current: Option<String> = None;
    let mut in_t = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) => match local_name(e.name().as_ref()) {
                b"si" => current = Some(String::new()),
                b"rPh" => phonetic_depth += 1,
                b"t" if phonetic_depth == 0 => in_t = true,
                _ => {}
            },
            Event::Empty(e) if local_name(e.name().as_ref()) == b"si" => {
                strings.push(String::new());
            }
            Event::Text(t) if in_t => {
                if let Some(ref mut s) = current {
                    s.push_str(&t.unescape()?);
                }
            }
            Event::CData(t) if in_t => {
                if let Some(ref mut s) = current {
                    s.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(e) => match local_name(e.name().as_ref()) {
                b"si" => strings.extend(current.take()),
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"t" => in_t = false,
                _ => {}
            },
            _ => {}
        }
    }

    Ok(strings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_rich_and_phonetic() {
        let xml = br#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="4">
            <si><t>Transportador:</t></si>
            <si><r><t>Mot</t></r><r><rPr><b/></rPr><t xml:space="preserve">orista </t></r></si>
            <si><t>&#20132;&amp;</t><rPh sb="0" eb="1"><t>ignored</t></rPh></si>
            <si/>
        </sst>"#;
        let strings = parse(xml).unwrap();
        assert_eq!(strings, vec!["Transportador:", "Motorista ", "交&", ""]);
    }
}
