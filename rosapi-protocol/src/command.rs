//! Command sentences for the query direction.
//!
//! A command is the ordered word sequence of one request: a command path
//! word (beginning with `/`), then attribute words, query words and an
//! optional tag.

/// Builder for one request sentence.
///
/// ```
/// use rosapi_protocol::Command;
///
/// let cmd = Command::new("/interface/print")
///     .query("?type=ether")
///     .attribute(".proplist", ".id,name");
/// assert_eq!(
///     cmd.words(),
///     &["/interface/print", "?type=ether", "=.proplist=.id,name"]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    words: Vec<String>,
}

impl Command {
    /// Starts a command for the given path, e.g. `/interface/print`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            words: vec![path.into()],
        }
    }

    /// Appends an `=name=value` attribute word.
    pub fn attribute(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.words.push(format!("={}={}", name.as_ref(), value.as_ref()));
        self
    }

    /// Appends a raw query word, e.g. `?type=ether` or `?#|`.
    pub fn query(mut self, word: impl Into<String>) -> Self {
        self.words.push(word.into());
        self
    }

    /// Appends a `.tag=<value>` word. The tag is echoed back verbatim in
    /// the reply; this library does not interpret it.
    pub fn tag(mut self, tag: impl AsRef<str>) -> Self {
        self.words.push(format!(".tag={}", tag.as_ref()));
        self
    }

    /// The words of the request sentence, in send order.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Whether the first word is a well-formed command path.
    pub fn is_well_formed(&self) -> bool {
        self.words
            .first()
            .map(|w| w.starts_with('/') && w.len() > 1)
            .unwrap_or(false)
    }
}
