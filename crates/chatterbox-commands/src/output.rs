//! Rendering of operation results into chat lines
//!
//! An operation returns either plain text lines or a collection of items with a
//! verbose and a compact stringification rule. Compact output concatenates one
//! record per item; consumers split on `;` for records, then on `|` for fields.
//! Delimiters inside field values are escaped with `\`, so [`parse_records`]
//! recovers the exact field values written by [`format_record`].

/// Delimiter between the fields of a compact record
pub const FIELD_DELIMITER: char = '|';

/// Terminator of a compact record
pub const RECORD_TERMINATOR: char = ';';

/// Escapes the next character inside a field value
pub const ESCAPE: char = '\\';

/// How results are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// One human-readable line per item or message
    #[default]
    Verbose,
    /// A single machine-parsable line of delimited records
    Compact,
}

/// A sequence that can be rendered in both modes
pub trait CompactRender: Send + Sync {
    /// One human-readable line per item
    fn verbose_lines(&self) -> Vec<String>;

    /// Concatenated records, in item order
    fn compact_record(&self) -> String;

    /// Number of items
    fn item_count(&self) -> usize;
}

type Formatter<T> = Box<dyn Fn(&T) -> String + Send + Sync>;

/// Typed items plus their verbose and compact stringification rules
pub struct CompactCollection<T> {
    items: Vec<T>,
    verbose: Formatter<T>,
    compact: Formatter<T>,
}

impl<T> CompactCollection<T> {
    /// Create a collection whose compact rule returns each full record, terminator included
    pub fn new<V, C>(items: Vec<T>, verbose: V, compact: C) -> Self
    where
        V: Fn(&T) -> String + Send + Sync + 'static,
        C: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            items,
            verbose: Box::new(verbose),
            compact: Box::new(compact),
        }
    }

    /// Create a collection whose compact rule lists field values in order
    ///
    /// Fields are joined with `|` and terminated with `;`. Delimiter and escape
    /// characters inside field values are escaped, see [`format_record`].
    pub fn with_fields<V, F>(items: Vec<T>, verbose: V, fields: F) -> Self
    where
        V: Fn(&T) -> String + Send + Sync + 'static,
        F: Fn(&T) -> Vec<String> + Send + Sync + 'static,
    {
        Self::new(items, verbose, move |item: &T| format_record(fields(item).as_slice()))
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Render in the given mode
    pub fn render(&self, mode: RenderMode) -> Vec<String>
    where
        T: Send + Sync,
    {
        render_collection(self, mode)
    }
}

impl<T: Send + Sync> CompactRender for CompactCollection<T> {
    fn verbose_lines(&self) -> Vec<String> {
        self.items.iter().map(|item| (self.verbose)(item)).collect()
    }

    fn compact_record(&self) -> String {
        self.items.iter().map(|item| (self.compact)(item)).collect()
    }

    fn item_count(&self) -> usize {
        self.items.len()
    }
}

impl<T> std::fmt::Debug for CompactCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompactCollection")
            .field("items", &self.items.len())
            .finish_non_exhaustive()
    }
}

/// Join field values into one terminated record
///
/// `\`, `|` and `;` inside a value are written as `\\`, `\|` and `\;`.
/// A record always has at least one field; an empty slice writes one empty field.
pub fn format_record<S: AsRef<str>>(fields: &[S]) -> String {
    let mut record = fields
        .iter()
        .map(|field| escape_field(field.as_ref()))
        .collect::<Vec<_>>()
        .join(&FIELD_DELIMITER.to_string());
    record.push(RECORD_TERMINATOR);
    record
}

/// Split compact output back into records of fields
///
/// Unescapes what [`format_record`] escaped. Trailing text without a terminator
/// forms a final record; a dangling escape is kept literally.
pub fn parse_records(compact: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = compact.chars();

    while let Some(c) = chars.next() {
        match c {
            ESCAPE => field.push(chars.next().unwrap_or(ESCAPE)),
            FIELD_DELIMITER => fields.push(std::mem::take(&mut field)),
            RECORD_TERMINATOR => {
                fields.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut fields));
            }
            other => field.push(other),
        }
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push(fields);
    }
    records
}

fn escape_field(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ESCAPE | FIELD_DELIMITER | RECORD_TERMINATOR) {
            escaped.push(ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

fn render_collection(collection: &dyn CompactRender, mode: RenderMode) -> Vec<String> {
    match mode {
        RenderMode::Verbose => collection.verbose_lines(),
        RenderMode::Compact => {
            let record = collection.compact_record();
            if record.is_empty() {
                Vec::new()
            } else {
                vec![record]
            }
        }
    }
}

/// Body of an operation result
pub enum OutputBody {
    /// Plain lines, rendered the same in both modes
    Text(Vec<String>),
    /// A typed sequence
    Collection(Box<dyn CompactRender>),
}

impl std::fmt::Debug for OutputBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputBody::Text(lines) => f.debug_tuple("Text").field(lines).finish(),
            OutputBody::Collection(collection) => f
                .debug_struct("Collection")
                .field("items", &collection.item_count())
                .finish(),
        }
    }
}

/// What an operation returns to the dispatcher
#[derive(Debug)]
pub struct CommandOutput {
    pub body: OutputBody,
    /// Channel-wide messages emitted alongside the response
    pub broadcasts: Vec<String>,
}

impl CommandOutput {
    /// No response
    pub fn empty() -> Self {
        Self::lines(Vec::<String>::new())
    }

    /// A single response line
    pub fn text(line: impl Into<String>) -> Self {
        let line: String = line.into();
        Self::lines([line])
    }

    /// Several response lines
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            body: OutputBody::Text(lines.into_iter().map(Into::into).collect()),
            broadcasts: Vec::new(),
        }
    }

    /// A typed sequence rendered according to the requested mode
    pub fn collection<T: Send + Sync + 'static>(collection: CompactCollection<T>) -> Self {
        Self {
            body: OutputBody::Collection(Box::new(collection)),
            broadcasts: Vec::new(),
        }
    }

    /// Add a channel-wide message
    pub fn with_broadcast(mut self, message: impl Into<String>) -> Self {
        self.broadcasts.push(message.into());
        self
    }

    /// Render the body into response lines
    pub fn render(&self, mode: RenderMode) -> Vec<String> {
        match &self.body {
            OutputBody::Text(lines) => lines.clone(),
            OutputBody::Collection(collection) => render_collection(collection.as_ref(), mode),
        }
    }
}
