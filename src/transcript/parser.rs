/// Caption payload decoding (json3 events or timed XML)
use super::RawCaptionEvent;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// Decodes raw caption payloads into ordered caption events
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptionParser;

impl CaptionParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a payload. An empty result means nothing usable was in it.
    pub fn parse(&self, raw: &str) -> Vec<RawCaptionEvent> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        if trimmed.starts_with('{') {
            let events = self.parse_structured(trimmed);
            if !events.is_empty() {
                debug!("Parsed {} json3 caption events", events.len());
                return events;
            }
            debug!("Structured caption payload yielded no events, trying XML");
        }

        let events = self.parse_timed_xml(trimmed);
        debug!("Parsed {} timed-XML caption events", events.len());
        events
    }

    fn parse_structured(&self, raw: &str) -> Vec<RawCaptionEvent> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                debug!("json3 payload did not parse: {}", e);
                return Vec::new();
            }
        };

        let events = match value.get("events").and_then(Value::as_array) {
            Some(events) => events,
            None => return Vec::new(),
        };

        events.iter().filter_map(structured_event).collect()
    }

    fn parse_timed_xml(&self, raw: &str) -> Vec<RawCaptionEvent> {
        let (Ok(text_tag), Ok(attribute), Ok(inner_tag), Ok(entity)) = (
            Regex::new(r#"(?s)<text\b([^>]*)>(.*?)</text>"#),
            Regex::new(r#"(\w+)\s*=\s*"([^"]*)""#),
            Regex::new(r"<[^>]+>"),
            Regex::new(ENTITY_PATTERN),
        ) else {
            return Vec::new();
        };

        text_tag
            .captures_iter(raw)
            .filter_map(|captures| {
                let attrs = captures.get(1)?.as_str();
                let body = captures.get(2)?.as_str();

                let mut start = None;
                let mut duration = 0.0;
                for attr in attribute.captures_iter(attrs) {
                    let value = attr.get(2).and_then(|v| v.as_str().trim().parse::<f64>().ok());
                    match attr.get(1).map(|n| n.as_str()) {
                        Some("start") => start = value,
                        Some("dur") => duration = value.unwrap_or(0.0),
                        _ => {}
                    }
                }

                let stripped = inner_tag.replace_all(body, "");
                // Timed XML escapes twice, e.g. `&amp;#39;`
                let decoded = decode_with(&entity, &decode_with(&entity, &stripped));
                let text = collapse_whitespace(&decoded);
                if text.is_empty() {
                    return None;
                }

                Some(RawCaptionEvent::new(seconds_to_ms(start?), seconds_to_ms(duration), text))
            })
            .collect()
    }
}

const ENTITY_PATTERN: &str = r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);";

/// Decode named and numeric character references; unknown ones stay verbatim
pub fn decode_html_entities(text: &str) -> String {
    match Regex::new(ENTITY_PATTERN) {
        Ok(entity) => decode_with(&entity, text),
        Err(_) => text.to_string(),
    }
}

fn decode_with(entity: &Regex, text: &str) -> String {
    entity
        .replace_all(text, |caps: &regex::Captures| {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            decode_entity(name).unwrap_or_else(|| whole.to_string())
        })
        .into_owned()
}

fn decode_entity(name: &str) -> Option<String> {
    let named = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => None,
    };
    if let Some(ch) = named {
        return Some(ch.to_string());
    }

    let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()?
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse::<u32>().ok()?
    } else {
        return None;
    };
    char::from_u32(code).map(|c| c.to_string())
}

fn structured_event(event: &Value) -> Option<RawCaptionEvent> {
    let segs = event.get("segs")?.as_array()?;
    let joined: String = segs
        .iter()
        .filter_map(|seg| seg.get("utf8").and_then(Value::as_str))
        .collect();

    let text = collapse_whitespace(&joined);
    if text.is_empty() {
        return None;
    }

    let start_ms = millis_field(event, "tStartMs")?;
    let duration_ms = millis_field(event, "dDurationMs")?;
    Some(RawCaptionEvent::new(start_ms, duration_ms, text))
}

/// Missing fields default to 0; present but non-numeric fields make the event malformed
fn millis_field(event: &Value, key: &str) -> Option<u64> {
    match event.get(key) {
        None | Some(Value::Null) => Some(0),
        Some(value) => value
            .as_u64()
            .or_else(|| value.as_f64().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v.round() as u64)),
    }
}

fn seconds_to_ms(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_single_event() {
        let parser = CaptionParser::new();
        let events = parser.parse(r#"{"events":[{"tStartMs":1000,"dDurationMs":500,"segs":[{"utf8":"Hello"}]}]}"#);
        assert_eq!(events, vec![RawCaptionEvent::new(1000, 500, "Hello")]);
    }

    #[test]
    fn test_structured_joins_segs_and_skips_noise() {
        let parser = CaptionParser::new();
        let payload = r#"{"events":[
            {"tStartMs":0,"dDurationMs":4000,"id":1,"wpWinPosId":1},
            {"tStartMs":100,"segs":[{"utf8":"so"},{"utf8":" today\nwe"},{"utf8":"  talk"}]},
            {"tStartMs":2000,"dDurationMs":10,"segs":[{"utf8":"\n"}]},
            {"tStartMs":"bad","dDurationMs":10,"segs":[{"utf8":"broken"}]},
            {"dDurationMs":300,"segs":[{"utf8":"no start"}]}
        ]}"#;

        let events = parser.parse(payload);
        assert_eq!(
            events,
            vec![
                RawCaptionEvent::new(100, 0, "so today we talk"),
                RawCaptionEvent::new(0, 300, "no start"),
            ]
        );
    }

    #[test]
    fn test_timed_xml_single_event() {
        let parser = CaptionParser::new();
        let events = parser.parse(r#"<text start="1.5" dur="2.0">Hi &amp; bye</text>"#);
        assert_eq!(events, vec![RawCaptionEvent::new(1500, 2000, "Hi & bye")]);
    }

    #[test]
    fn test_timed_xml_attributes_and_double_escaping() {
        let parser = CaptionParser::new();
        let payload = r##"<?xml version="1.0" encoding="utf-8" ?><transcript>
            <text dur="1.2" start="0.25">It&amp;#39;s   <font color="#fff">here</font></text>
            <text start="3">no duration</text>
            <text start="5" dur="1">   </text>
        </transcript>"##;

        let events = parser.parse(payload);
        assert_eq!(
            events,
            vec![
                RawCaptionEvent::new(250, 1200, "It's here"),
                RawCaptionEvent::new(3000, 0, "no duration"),
            ]
        );
    }

    #[test]
    fn test_structured_without_events_falls_back_to_xml() {
        let parser = CaptionParser::new();
        assert!(parser.parse(r#"{"wireMagic":"pb3"}"#).is_empty());
        assert!(parser.parse("").is_empty());
        assert!(parser.parse("<html>blocked</html>").is_empty());
    }

    #[test]
    fn test_decode_html_entities() {
        assert_eq!(
            decode_html_entities("&lt;b&gt; &quot;q&quot; &apos;a&#39; &#x2F; &#32;&nbsp;x"),
            "<b> \"q\" 'a' /   x"
        );
        assert_eq!(decode_html_entities("&unknown; &#xZZ;"), "&unknown; &#xZZ;");
    }
}
