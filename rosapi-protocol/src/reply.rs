//! Reply sentences and their assembly into caller-visible replies.
//!
//! A reply is a run of sentences: zero or more `!re` rows followed by the
//! terminating `!done` or `!fatal`. A `!trap` marks the reply as an error
//! but does not end it; the server still sends `!done` afterwards.

use bytes::Bytes;
use std::collections::HashMap;

/// First word of a reply sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyWord {
    /// One row of a multi-row result.
    Re,
    /// End of reply.
    Done,
    /// Recoverable error; the connection stays usable.
    Trap,
    /// Connection-terminating error.
    Fatal,
}

impl ReplyWord {
    /// Parses the first word of a sentence. Unknown words return `None`.
    pub fn parse(word: &[u8]) -> Option<Self> {
        match word {
            b"!re" => Some(ReplyWord::Re),
            b"!done" => Some(ReplyWord::Done),
            b"!trap" => Some(ReplyWord::Trap),
            b"!fatal" => Some(ReplyWord::Fatal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyWord::Re => "!re",
            ReplyWord::Done => "!done",
            ReplyWord::Trap => "!trap",
            ReplyWord::Fatal => "!fatal",
        }
    }
}

/// How a completed reply terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Done,
    Trap,
    Fatal,
}

/// The parsed form of one complete reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    /// One attribute map per `!re` sentence, in arrival order.
    pub rows: Vec<HashMap<String, String>>,
    /// Attributes of the terminating sentence(s). Flat; later duplicate
    /// names overwrite earlier ones.
    pub trailer: HashMap<String, String>,
    pub kind: ReplyKind,
}

impl ParsedReply {
    pub fn is_done(&self) -> bool {
        self.kind == ReplyKind::Done
    }

    pub fn is_trap(&self) -> bool {
        self.kind == ReplyKind::Trap
    }

    /// The server's `message` trailer attribute, when present.
    pub fn message(&self) -> Option<&str> {
        self.trailer.get("message").map(String::as_str)
    }
}

/// Extracts the name and value of an attribute word.
///
/// Attribute words are `=<name>=<value>`: the name contains no `=`, the
/// value may contain any byte (including `=` and newlines). `.tag=<value>`
/// words are surfaced under the literal name `.tag`. Anything else returns
/// `None`.
pub fn parse_attribute(word: &[u8]) -> Option<(String, String)> {
    let text = String::from_utf8_lossy(word);

    if let Some(rest) = text.strip_prefix('=') {
        let (name, value) = rest.split_once('=')?;
        if name.is_empty() {
            return None;
        }
        return Some((name.to_string(), value.to_string()));
    }

    if let Some(value) = text.strip_prefix(".tag=") {
        return Some((".tag".to_string(), value.to_string()));
    }

    None
}

/// Assembles reply sentences into a [`ParsedReply`].
///
/// Feed complete sentences with [`push_sentence`](ReplyBuilder::push_sentence);
/// the finished reply is returned once the terminating `!done` or `!fatal`
/// arrives. The builder resets itself and can be reused for the next reply.
#[derive(Debug, Default)]
pub struct ReplyBuilder {
    rows: Vec<HashMap<String, String>>,
    trailer: HashMap<String, String>,
    trapped: bool,
}

impl ReplyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one sentence. Returns the completed reply on `!done` or
    /// `!fatal`, `None` while more sentences are expected.
    pub fn push_sentence(&mut self, words: &[Bytes]) -> Option<ParsedReply> {
        let Some(first) = words.first() else {
            tracing::warn!("skipping empty reply sentence");
            return None;
        };

        match ReplyWord::parse(first) {
            Some(ReplyWord::Re) => {
                let mut row = HashMap::new();
                collect_attributes(&words[1..], &mut row);
                self.rows.push(row);
                None
            }
            Some(ReplyWord::Trap) => {
                self.trapped = true;
                collect_attributes(&words[1..], &mut self.trailer);
                None
            }
            Some(ReplyWord::Done) => {
                collect_attributes(&words[1..], &mut self.trailer);
                let kind = if self.trapped {
                    ReplyKind::Trap
                } else {
                    ReplyKind::Done
                };
                Some(self.finish(kind))
            }
            Some(ReplyWord::Fatal) => {
                self.collect_fatal(&words[1..]);
                Some(self.finish(ReplyKind::Fatal))
            }
            None => {
                tracing::warn!(
                    word = %String::from_utf8_lossy(first),
                    "ignoring sentence with unknown reply word"
                );
                None
            }
        }
    }

    /// `!fatal` sentences may carry their reason as a bare word rather
    /// than an attribute; surface it under `message`.
    fn collect_fatal(&mut self, words: &[Bytes]) {
        for w in words {
            match parse_attribute(w) {
                Some((name, value)) => {
                    self.trailer.insert(name, value);
                }
                None if !w.is_empty() => {
                    self.trailer
                        .entry("message".to_string())
                        .or_insert_with(|| String::from_utf8_lossy(w).into_owned());
                }
                None => {}
            }
        }
    }

    fn finish(&mut self, kind: ReplyKind) -> ParsedReply {
        self.trapped = false;
        ParsedReply {
            rows: std::mem::take(&mut self.rows),
            trailer: std::mem::take(&mut self.trailer),
            kind,
        }
    }
}

fn collect_attributes(words: &[Bytes], into: &mut HashMap<String, String>) {
    for w in words {
        match parse_attribute(w) {
            Some((name, value)) => {
                into.insert(name, value);
            }
            None => {
                tracing::debug!(
                    word = %String::from_utf8_lossy(w),
                    "discarding malformed attribute word"
                );
            }
        }
    }
}
