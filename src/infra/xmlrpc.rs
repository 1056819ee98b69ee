//! Minimal XML-RPC codec.
//!
//! Encodes `methodCall` documents and decodes `methodResponse` documents into
//! a [`Value`] tree. Struct members keep their wire order.

use std::io::Cursor;
use std::iter::Peekable;
use std::vec::IntoIter;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlRpcError {
    #[error("Failed to encode XML-RPC call: {0}")]
    Encode(String),

    #[error("Malformed XML-RPC response: {0}")]
    Parse(String),

    #[error("Unexpected XML-RPC content: expected {expected}, found {found}")]
    Unexpected { expected: String, found: String },

    #[error("XML-RPC fault {code}: {message}")]
    Fault { code: i64, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    String(String),
    Double(f64),
    DateTime(String),
    Base64(String),
    Array(Vec<Value>),
    Struct(Vec<(String, Value)>),
    Nil,
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::String(s.to_string())
    }

    /// Member `key` of a struct value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "boolean",
            Value::String(_) => "string",
            Value::Double(_) => "double",
            Value::DateTime(_) => "dateTime.iso8601",
            Value::Base64(_) => "base64",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
            Value::Nil => "nil",
        }
    }
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Serializes a call to `method` with positional `params`.
pub fn encode_call(method: &str, params: &[Value]) -> Result<String, XmlRpcError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    open(&mut writer, "methodCall")?;
    text_element(&mut writer, "methodName", method)?;
    open(&mut writer, "params")?;
    for param in params {
        open(&mut writer, "param")?;
        write_value(&mut writer, param)?;
        close(&mut writer, "param")?;
    }
    close(&mut writer, "params")?;
    close(&mut writer, "methodCall")?;

    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| XmlRpcError::Encode(e.to_string()))
}

fn write_value(writer: &mut XmlWriter, value: &Value) -> Result<(), XmlRpcError> {
    open(writer, "value")?;
    match value {
        Value::Int(i) => text_element(writer, "int", &i.to_string())?,
        Value::Bool(b) => text_element(writer, "boolean", if *b { "1" } else { "0" })?,
        Value::String(s) => text_element(writer, "string", s)?,
        Value::Double(d) => text_element(writer, "double", &d.to_string())?,
        Value::DateTime(s) => text_element(writer, "dateTime.iso8601", s)?,
        Value::Base64(s) => text_element(writer, "base64", s)?,
        Value::Nil => emit(writer, Event::Empty(BytesStart::new("nil")))?,
        Value::Array(items) => {
            open(writer, "array")?;
            open(writer, "data")?;
            for item in items {
                write_value(writer, item)?;
            }
            close(writer, "data")?;
            close(writer, "array")?;
        }
        Value::Struct(members) => {
            open(writer, "struct")?;
            for (name, member) in members {
                open(writer, "member")?;
                text_element(writer, "name", name)?;
                write_value(writer, member)?;
                close(writer, "member")?;
            }
            close(writer, "struct")?;
        }
    }
    close(writer, "value")
}

fn emit(writer: &mut XmlWriter, event: Event) -> Result<(), XmlRpcError> {
    writer
        .write_event(event)
        .map_err(|e| XmlRpcError::Encode(e.to_string()))
}

fn open(writer: &mut XmlWriter, tag: &str) -> Result<(), XmlRpcError> {
    emit(writer, Event::Start(BytesStart::new(tag)))
}

fn close(writer: &mut XmlWriter, tag: &str) -> Result<(), XmlRpcError> {
    emit(writer, Event::End(BytesEnd::new(tag)))
}

fn text_element(writer: &mut XmlWriter, tag: &str, text: &str) -> Result<(), XmlRpcError> {
    open(writer, tag)?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    close(writer, tag)
}

/// Parses a `methodResponse`. A `<fault>` comes back as [`XmlRpcError::Fault`].
pub fn decode_response(xml: &str) -> Result<Value, XmlRpcError> {
    let mut parser = Parser {
        tokens: tokenize(xml)?.into_iter().peekable(),
    };

    parser.expect_open("methodResponse")?;
    let value = match parser.tokens.next() {
        Some(Token::Open(tag)) if tag == "params" => {
            parser.expect_open("param")?;
            let value = parser.parse_value()?;
            parser.expect_close("param")?;
            parser.expect_close("params")?;
            value
        }
        Some(Token::Open(tag)) if tag == "fault" => {
            let fault = parser.parse_value()?;
            return Err(XmlRpcError::Fault {
                code: match fault.get("faultCode") {
                    Some(Value::Int(code)) => *code,
                    _ => 0,
                },
                message: fault
                    .get("faultString")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }
        other => return Err(unexpected("<params> or <fault>", other.as_ref())),
    };
    parser.expect_close("methodResponse")?;
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open(String),
    Close(String),
    Text(String),
}

fn describe(token: Option<&Token>) -> String {
    match token {
        Some(Token::Open(tag)) => format!("<{tag}>"),
        Some(Token::Close(tag)) => format!("</{tag}>"),
        Some(Token::Text(text)) => format!("text {text:?}"),
        None => "end of document".to_string(),
    }
}

fn unexpected(expected: &str, found: Option<&Token>) -> XmlRpcError {
    XmlRpcError::Unexpected {
        expected: expected.to_string(),
        found: describe(found),
    }
}

fn tokenize(xml: &str) -> Result<Vec<Token>, XmlRpcError> {
    let mut reader = Reader::from_str(xml);

    let mut tokens = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                tokens.push(Token::Open(String::from_utf8_lossy(e.name().as_ref()).to_string()))
            }
            Ok(Event::End(ref e)) => {
                tokens.push(Token::Close(String::from_utf8_lossy(e.name().as_ref()).to_string()))
            }
            Ok(Event::Empty(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                tokens.push(Token::Open(tag.clone()));
                tokens.push(Token::Close(tag));
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| XmlRpcError::Parse(err.to_string()))?;
                push_text(&mut tokens, &text);
            }
            Ok(Event::CData(ref e)) => push_text(&mut tokens, &String::from_utf8_lossy(e)),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(XmlRpcError::Parse(format!(
                    "at position {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }
    Ok(tokens)
}

// Text is kept verbatim. Whitespace-only runs are layout between tags and are
// dropped, except as the content of a `<string>`.
fn push_text(tokens: &mut Vec<Token>, text: &str) {
    if let Some(Token::Text(previous)) = tokens.last_mut() {
        previous.push_str(text);
        return;
    }
    let in_string = matches!(tokens.last(), Some(Token::Open(tag)) if tag == "string");
    if in_string || !text.trim().is_empty() {
        tokens.push(Token::Text(text.to_string()));
    }
}

struct Parser {
    tokens: Peekable<IntoIter<Token>>,
}

impl Parser {
    fn expect_open(&mut self, tag: &str) -> Result<(), XmlRpcError> {
        match self.tokens.next() {
            Some(Token::Open(found)) if found == tag => Ok(()),
            other => Err(unexpected(&format!("<{tag}>"), other.as_ref())),
        }
    }

    fn expect_close(&mut self, tag: &str) -> Result<(), XmlRpcError> {
        match self.tokens.next() {
            Some(Token::Close(found)) if found == tag => Ok(()),
            other => Err(unexpected(&format!("</{tag}>"), other.as_ref())),
        }
    }

    fn next_is_open(&mut self, tag: &str) -> bool {
        matches!(self.tokens.peek(), Some(Token::Open(found)) if found == tag)
    }

    fn take_text(&mut self) -> String {
        if let Some(Token::Text(_)) = self.tokens.peek() {
            if let Some(Token::Text(text)) = self.tokens.next() {
                return text;
            }
        }
        String::new()
    }

    fn parse_value(&mut self) -> Result<Value, XmlRpcError> {
        self.expect_open("value")?;
        let value = match self.tokens.next() {
            // untyped values are strings
            Some(Token::Close(tag)) if tag == "value" => return Ok(Value::String(String::new())),
            Some(Token::Text(text)) => Value::String(text),
            Some(Token::Open(kind)) => self.parse_typed(&kind)?,
            other => return Err(unexpected("a value", other.as_ref())),
        };
        self.expect_close("value")?;
        Ok(value)
    }

    fn parse_typed(&mut self, kind: &str) -> Result<Value, XmlRpcError> {
        let value = match kind {
            "string" => Value::String(self.take_text()),
            "int" | "i4" | "i8" => {
                let text = self.take_text();
                Value::Int(text.trim().parse().map_err(|_| {
                    XmlRpcError::Parse(format!("invalid <{kind}> value {text:?}"))
                })?)
            }
            "boolean" => match self.take_text().trim() {
                "1" => Value::Bool(true),
                "0" => Value::Bool(false),
                other => {
                    return Err(XmlRpcError::Parse(format!(
                        "invalid <boolean> value {other:?}"
                    )))
                }
            },
            "double" => {
                let text = self.take_text();
                Value::Double(text.trim().parse().map_err(|_| {
                    XmlRpcError::Parse(format!("invalid <double> value {text:?}"))
                })?)
            }
            "dateTime.iso8601" => Value::DateTime(self.take_text()),
            "base64" => Value::Base64(self.take_text()),
            "nil" => Value::Nil,
            "array" => {
                self.expect_open("data")?;
                let mut items = Vec::new();
                while self.next_is_open("value") {
                    items.push(self.parse_value()?);
                }
                self.expect_close("data")?;
                Value::Array(items)
            }
            "struct" => {
                let mut members = Vec::new();
                while self.next_is_open("member") {
                    self.expect_open("member")?;
                    self.expect_open("name")?;
                    let name = self.take_text();
                    self.expect_close("name")?;
                    let member = self.parse_value()?;
                    self.expect_close("member")?;
                    members.push((name, member));
                }
                Value::Struct(members)
            }
            other => {
                return Err(XmlRpcError::Parse(format!(
                    "unsupported value type <{other}>"
                )))
            }
        };
        self.expect_close(kind)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_call() {
        let xml = encode_call(
            "SearchSubtitles",
            &[
                Value::str("token&1"),
                Value::Array(vec![Value::Struct(vec![
                    ("moviehash".to_string(), Value::str("42")),
                    ("moviebytesize".to_string(), Value::str("131072")),
                ])]),
            ],
        )
        .unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<methodName>SearchSubtitles</methodName>"));
        assert!(xml.contains("<param><value><string>token&amp;1</string></value></param>"));
        assert!(xml.contains(
            "<member><name>moviehash</name><value><string>42</string></value></member>\
             <member><name>moviebytesize</name><value><string>131072</string></value></member>"
        ));
    }

    #[test]
    fn test_encoded_call_decodes_as_params() {
        // a call document shares the value grammar, swap the envelope to reuse the decoder
        let params = vec![
            Value::Int(-3),
            Value::Bool(true),
            Value::Nil,
            Value::Struct(vec![("a".to_string(), Value::Array(vec![Value::str("x")]))]),
        ];
        let call = encode_call("Echo", &[Value::Array(params.clone())]).unwrap();
        let response = call
            .replace("<methodCall><methodName>Echo</methodName>", "<methodResponse>")
            .replace("</methodCall>", "</methodResponse>");

        assert_eq!(decode_response(&response).unwrap(), Value::Array(params));
    }

    #[test]
    fn test_decode_struct_response() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<methodResponse>
  <params>
    <param>
      <value>
        <struct>
          <member><name>token</name><value><string>abc123</string></value></member>
          <member><name>status</name><value><string>200 OK</string></value></member>
          <member><name>seconds</name><value><double>0.004</double></value></member>
          <member><name>untyped</name><value>plain</value></member>
          <member><name>empty</name><value></value></member>
        </struct>
      </value>
    </param>
  </params>
</methodResponse>"#;

        let value = decode_response(xml).unwrap();
        assert_eq!(value.get("token").and_then(Value::as_str), Some("abc123"));
        assert_eq!(value.get("status").and_then(Value::as_str), Some("200 OK"));
        assert_eq!(value.get("seconds"), Some(&Value::Double(0.004)));
        assert_eq!(value.get("untyped").and_then(Value::as_str), Some("plain"));
        assert_eq!(value.get("empty").and_then(Value::as_str), Some(""));
        assert_eq!(value.get("missing"), None);
    }

    #[test]
    fn test_decode_fault() {
        let xml = r#"<methodResponse><fault><value><struct>
            <member><name>faultCode</name><value><int>401</int></value></member>
            <member><name>faultString</name><value><string>Unauthorized</string></value></member>
        </struct></value></fault></methodResponse>"#;

        match decode_response(xml) {
            Err(XmlRpcError::Fault { code, message }) => {
                assert_eq!(code, 401);
                assert_eq!(message, "Unauthorized");
            }
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_truncated_document() {
        let xml = "<methodResponse><params><param><value><string>x</string></value>";
        assert!(decode_response(xml).is_err());
    }

    #[test]
    fn test_decode_rejects_bad_int() {
        let xml = "<methodResponse><params><param><value><int>abc</int></value></param></params></methodResponse>";
        assert!(matches!(decode_response(xml), Err(XmlRpcError::Parse(_))));
    }

    #[test]
    fn test_string_whitespace_is_preserved() {
        let xml = "<methodResponse><params><param><value><struct>\n  \
            <member><name>MovieReleaseName</name><value><string> Show.S01E02 </string></value></member>\n  \
            <member><name>Blank</name><value><string>  </string></value></member>\n\
            </struct></value></param></params></methodResponse>";

        let value = decode_response(xml).unwrap();
        assert_eq!(
            value.get("MovieReleaseName").and_then(Value::as_str),
            Some(" Show.S01E02 ")
        );
        assert_eq!(value.get("Blank").and_then(Value::as_str), Some("  "));
    }

    #[test]
    fn test_unescapes_entities() {
        let xml = "<methodResponse><params><param><value><string>Tom &amp; Jerry</string></value></param></params></methodResponse>";
        assert_eq!(decode_response(xml).unwrap(), Value::str("Tom & Jerry"));
    }
}
