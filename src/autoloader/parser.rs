//! Status Page Parser
//!
//! Extracts the tape inventory from the autoloader's `commands.html`.
//! The page has no semantic markup: every slot is an `<img>` inside the
//! page's only `<center>` block, the tape label is in its `title` and the
//! location is encoded in an `onclick="from_to(slot15)"` handler.
//!
//! The scanner below is tailored to that page. It understands just enough
//! HTML to walk start/end tags and their attributes.

use crate::domain::ports::{Inventory, Location, EMPTY_LABEL};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

// =============================================================================
// Slot Action Pattern
// =============================================================================

const ACTION_PATTERN: &str = r"from_to\((?:slot(\d+)|(drive|picker|mailslot))\)";

/// Any slot action anywhere in the document
static ACTION_ANYWHERE: Lazy<Regex> = Lazy::new(|| Regex::new(ACTION_PATTERN).unwrap());

/// A slot action at the start of an `onclick` value
static ACTION_AT_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{}", ACTION_PATTERN)).unwrap());

// =============================================================================
// Inventory Parsing
// =============================================================================

/// Parse the status page into an inventory
///
/// Fails if the document has no slot action at all, or if a slot image
/// inside the `<center>` block is malformed. A page with every location
/// empty yields an empty inventory.
pub fn parse_inventory(html: &str) -> Result<Inventory> {
    if !ACTION_ANYWHERE.is_match(html) {
        return Err(Error::InvalidStatusPage(
            "Invalid HTML, found no regex matches.".to_string(),
        ));
    }

    let mut inventory = Inventory::new();
    let mut in_center = false;

    for tag in TagScanner::new(html) {
        match (tag.name.as_str(), tag.closing) {
            ("center", false) => in_center = true,
            ("center", true) => in_center = false,
            ("img", false) if in_center => {
                if let Some(onclick) = tag.attr("onclick") {
                    update_slot(&mut inventory, &tag, onclick)?;
                }
            }
            _ => {}
        }
    }

    debug!("Parsed inventory with {} tape(s)", inventory.len());
    Ok(inventory)
}

/// Record the state of a single slot image
fn update_slot(inventory: &mut Inventory, tag: &Tag<'_>, onclick: &str) -> Result<()> {
    debug!("img tag attributes: {:?}", tag.attrs);

    let title = match tag.attr("title") {
        Some(title) if !title.is_empty() => title,
        _ => {
            return Err(Error::MissingAttribute {
                attribute: "title".to_string(),
                tag: tag.raw.to_string(),
            })
        }
    };

    let location = parse_action(onclick)?;
    if title != EMPTY_LABEL {
        inventory.insert(title, location);
    }

    Ok(())
}

/// Decode `from_to(...)` into a location
fn parse_action(onclick: &str) -> Result<Location> {
    let caps = ACTION_AT_START
        .captures(onclick)
        .ok_or_else(|| Error::MalformedAction {
            value: onclick.to_string(),
        })?;

    if let Some(slot) = caps.get(1) {
        let slot = slot.as_str();
        // Slots are numbered exactly as the device prints them: "slot1", never "slot01"
        if slot.starts_with('0') {
            return Err(Error::UnknownSlot {
                slot: slot.to_string(),
            });
        }
        return slot
            .parse::<u8>()
            .ok()
            .and_then(Location::slot)
            .ok_or_else(|| Error::UnknownSlot {
                slot: slot.to_string(),
            });
    }

    match caps.get(2).map(|m| m.as_str()) {
        Some("drive") => Ok(Location::Drive),
        Some("picker") => Ok(Location::Picker),
        Some("mailslot") => Ok(Location::Mailslot),
        _ => Err(Error::MalformedAction {
            value: onclick.to_string(),
        }),
    }
}

// =============================================================================
// Tag Scanner
// =============================================================================

/// A start or end tag
#[derive(Debug)]
struct Tag<'a> {
    /// Lowercased tag name
    name: String,
    closing: bool,
    /// Lowercased attribute names with decoded values
    attrs: Vec<(String, String)>,
    /// The tag as it appears in the document
    raw: &'a str,
}

impl Tag<'_> {
    /// Attribute value; later duplicates win
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Walks the tags of a document, skipping comments, declarations and the
/// contents of `<script>`/`<style>`
struct TagScanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> TagScanner<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    /// Index of the `>` closing a tag that starts at `from`, honouring quotes
    fn tag_end(&self, from: usize) -> Option<usize> {
        let mut quote = None;
        for (i, ch) in self.src[from..].char_indices() {
            match (quote, ch) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"') | (None, '\'') => quote = Some(ch),
                (None, '>') => return Some(from + i),
                _ => {}
            }
        }
        None
    }

    /// Move past the raw text element that just opened
    fn skip_raw_text(&mut self, name: &str) {
        let close = format!("</{}", name);
        let rest = self.src[self.pos..].to_ascii_lowercase();
        self.pos = match rest.find(&close) {
            Some(i) => self.pos + i,
            None => self.src.len(),
        };
    }
}

impl<'a> Iterator for TagScanner<'a> {
    type Item = Tag<'a>;

    fn next(&mut self) -> Option<Tag<'a>> {
        let src = self.src;
        loop {
            let start = self.pos + src.get(self.pos..)?.find('<')?;
            let rest = &src[start..];

            if rest.starts_with("<!--") {
                self.pos = match rest[4..].find("-->") {
                    Some(i) => start + 4 + i + 3,
                    None => src.len(),
                };
                continue;
            }

            let (closing, name_start) = if rest.starts_with("</") {
                (true, start + 2)
            } else {
                (false, start + 1)
            };

            // Declarations, processing instructions and stray '<' in text
            if !src[name_start..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                self.pos = start + 1;
                continue;
            }

            let end = match self.tag_end(name_start) {
                Some(end) => end,
                None => {
                    self.pos = src.len();
                    return None;
                }
            };
            self.pos = end + 1;

            let inner = &src[name_start..end];
            let name_len = inner
                .find(|c: char| c.is_whitespace() || c == '/')
                .unwrap_or(inner.len());
            let name = inner[..name_len].to_ascii_lowercase();
            let attrs = if closing {
                Vec::new()
            } else {
                parse_attributes(&inner[name_len..])
            };

            let self_closing = inner.trim_end().ends_with('/');
            if !closing && !self_closing && (name == "script" || name == "style") {
                self.skip_raw_text(&name);
            }

            return Some(Tag {
                name,
                closing,
                attrs,
                raw: &src[start..=end],
            });
        }
    }
}

/// Parse `key="value" key='value' key=value key` into pairs
fn parse_attributes(s: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut rest = s;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
        if rest.is_empty() {
            break;
        }

        let key_len = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let key = rest[..key_len].to_ascii_lowercase();
        rest = rest[key_len..].trim_start();

        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            match after_eq.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    let close = body.find(q).unwrap_or(body.len());
                    rest = body.get(close + 1..).unwrap_or("");
                    &body[..close]
                }
                _ => {
                    let len = after_eq
                        .find(char::is_whitespace)
                        .unwrap_or(after_eq.len());
                    rest = &after_eq[len..];
                    &after_eq[..len]
                }
            }
        } else {
            ""
        };

        if !key.is_empty() {
            attrs.push((key, decode_entities(value)));
        }
    }

    attrs
}

/// Decode character references in an attribute value
///
/// Handles the common named entities plus decimal (`&#45;`) and hex
/// (`&#x2D;`) references. Anything unrecognized is kept as written.
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest
            .find(';')
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|ch| (ch, semi)));
        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix('x').or_else(|| number.strip_prefix('X')) {
                Some(hex) if !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()) => {
                    u32::from_str_radix(hex, 16).ok()?
                }
                Some(_) => return None,
                None if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) => {
                    number.parse().ok()?
                }
                None => return None,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const TWO_TAPES: &str = r#"
        <center>
            <img src="tape.gif" title="00007FA" onclick="from_to(slot15)" />
            <img src="tape.gif" title="00008FA" onclick="from_to(slot16)" />
            <img src="tape.gif" title="Empty" onclick="from_to(mailslot)" />
        </center>
    "#;

    #[test]
    fn test_parse_two_tapes() {
        let inventory = parse_inventory(TWO_TAPES).unwrap();

        let expected: Inventory = [
            ("00007FA", Location::Slot(15)),
            ("00008FA", Location::Slot(16)),
        ]
        .into_iter()
        .collect();
        assert_eq!(inventory, expected);
    }

    #[test]
    fn test_parse_is_deterministic() {
        assert_eq!(
            parse_inventory(TWO_TAPES).unwrap(),
            parse_inventory(TWO_TAPES).unwrap()
        );
    }

    #[test]
    fn test_named_locations() {
        let html = r#"<center>
            <img title="A00001L3" onclick="from_to(drive)">
            <img title="A00002L3" onclick="from_to(picker)">
            <img title="A00003L3" onclick="from_to(mailslot)">
        </center>"#;
        let inventory = parse_inventory(html).unwrap();

        assert_eq!(inventory.location_of("A00001L3"), Some(Location::Drive));
        assert_eq!(inventory.location_of("A00002L3"), Some(Location::Picker));
        assert_eq!(inventory.location_of("A00003L3"), Some(Location::Mailslot));
    }

    #[test]
    fn test_no_slot_actions_rejected() {
        for html in ["", "</html>", "<head></head><body>Test</body>"] {
            let err = parse_inventory(html).unwrap_err();
            assert_matches!(err, Error::InvalidStatusPage(_));
        }
    }

    #[test]
    fn test_empty_page_is_valid() {
        let html = r#"<center>
            <img title="Empty" onclick="from_to(slot1)">
            <img title="Empty" onclick="from_to(drive)">
        </center>"#;
        let inventory = parse_inventory(html).unwrap();
        assert!(inventory.is_empty());
        assert!(!inventory.contains(EMPTY_LABEL));
    }

    #[test]
    fn test_images_outside_center_ignored() {
        let html = r#"
            <img title="NAV" onclick="from_to(slot1)">
            <center><img title="T1" onclick="from_to(slot2)"></center>
            <img title="FOOTER" onclick="not_an_action()">
        "#;
        let inventory = parse_inventory(html).unwrap();

        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.location_of("T1"), Some(Location::Slot(2)));
    }

    #[test]
    fn test_malformed_action() {
        let html = r#"<center>
            <img title="T1" onclick="from_to(slot2)">
            <img title="T2" onclick="javascript:from_to(slot3)">
        </center>"#;
        let err = parse_inventory(html).unwrap_err();
        assert_matches!(err, Error::MalformedAction { value } if value == "javascript:from_to(slot3)");
    }

    #[test]
    fn test_unknown_slot() {
        let html = r#"<center><img title="T1" onclick="from_to(slot17)"></center>"#;
        let err = parse_inventory(html).unwrap_err();
        assert_matches!(err, Error::UnknownSlot { slot } if slot == "17");
    }

    #[test]
    fn test_slot_with_leading_zero() {
        let html = r#"<center><img title="T1" onclick="from_to(slot01)"></center>"#;
        let err = parse_inventory(html).unwrap_err();
        assert_matches!(err, Error::UnknownSlot { slot } if slot == "01");
    }

    #[test]
    fn test_numeric_character_references() {
        let html = r#"<center>
            <img title="A&#45;0001" onclick="from_to(slot1)">
            <img title="B&#x2D;0002" onclick="from_to(slot2)">
            <img title="C&#X41;&amp;&bogus;&#;" onclick="from_to(slot3)">
        </center>"#;
        let inventory = parse_inventory(html).unwrap();

        assert_eq!(inventory.location_of("A-0001"), Some(Location::Slot(1)));
        assert_eq!(inventory.location_of("B-0002"), Some(Location::Slot(2)));
        assert_eq!(inventory.location_of("CA&&bogus;&#;"), Some(Location::Slot(3)));
    }

    #[test]
    fn test_missing_title() {
        let html = r#"<center><img src="tape.gif" onclick="from_to(slot4)"></center>"#;
        let err = parse_inventory(html).unwrap_err();
        assert_matches!(err, Error::MissingAttribute { attribute, .. } if attribute == "title");
    }

    #[test]
    fn test_duplicate_location_last_write_wins() {
        let html = r#"<center>
            <img title="FIRST" onclick="from_to(slot5)">
            <img title="SECOND" onclick="from_to(slot5)">
        </center>"#;
        for _ in 0..3 {
            let inventory = parse_inventory(html).unwrap();
            assert_eq!(inventory.len(), 1);
            assert_eq!(inventory.occupant(Location::Slot(5)), Some("SECOND"));
        }
    }

    #[test]
    fn test_case_and_quoting_variants() {
        let html = r#"<CENTER>
            <IMG SRC=tape.gif TITLE='T&amp;1' onClick="from_to(slot9)">
            <img title=T2 onclick=from_to(slot10)>
        </CENTER>"#;
        let inventory = parse_inventory(html).unwrap();

        assert_eq!(inventory.location_of("T&1"), Some(Location::Slot(9)));
        assert_eq!(inventory.location_of("T2"), Some(Location::Slot(10)));
    }

    #[test]
    fn test_script_and_comments_skipped() {
        let html = r#"
            <script>var s = "<center><img title='X' onclick='from_to(slot1)'>";</script>
            <!-- <center><img title="Y" onclick="from_to(slot2)"></center> -->
            <center><img title="Z" onclick="from_to(slot3)"></center>
        "#;
        let inventory = parse_inventory(html).unwrap();

        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.location_of("Z"), Some(Location::Slot(3)));
    }

    #[test]
    fn test_img_without_onclick_ignored() {
        let html = r#"<center>
            <img src="logo.gif" title="Dell">
            <img title="T1" onclick="from_to(slot1)">
        </center>"#;
        let inventory = parse_inventory(html).unwrap();
        assert_eq!(inventory.len(), 1);
    }
}
