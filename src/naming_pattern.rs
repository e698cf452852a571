//! Naming patterns for sequentially renamed files.
//!
//! A naming pattern is a template containing an integer placeholder in
//! brace-format syntax. Rendering it with a 1-based sequence number yields the
//! base name of a destination file.
//!
//! # Examples
//!
//! ```
//! use smartfile::naming_pattern::NamingPattern;
//!
//! let pattern = NamingPattern::parse("img_{:02d}").unwrap();
//! assert_eq!(pattern.render(7), "img_07");
//! assert_eq!(pattern.render(123), "img_123");
//! ```
//!
//! # Placeholder syntax
//!
//! ```text
//! {[0][:[[fill]align][sign][#][0][width][grouping][type]]}
//! ```
//!
//! `{{` and `}}` produce literal braces. Supported types are `d`, `n`, `b`,
//! `o`, `x` and `X`; omitting the type renders decimal.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static FORMAT_SPEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<fill>.)?(?P<align>[<>=^]))?(?P<sign>[-+ ])?(?P<alt>#)?(?P<zero>0)?(?P<width>[0-9]+)?(?P<grouping>[,_])?(?:\.(?P<precision>[0-9]+))?(?P<kind>.)?$",
    )
    .expect("format spec grammar is a valid regex")
});

/// Errors produced while parsing a naming pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// A `{` without a matching `}`.
    UnmatchedOpenBrace,
    /// A single `}` outside of a placeholder.
    UnmatchedCloseBrace,
    /// More than one automatically numbered placeholder (`{}{}`).
    TooManyPlaceholders,
    /// A manual field index other than 0.
    FieldOutOfRange(usize),
    /// A named field such as `{count}`.
    NamedField(String),
    /// Automatic (`{}`) and manual (`{0}`) numbering used together.
    MixedNumbering,
    /// Conversion flags such as `{!r}`.
    ConversionNotSupported(String),
    /// A placeholder nested inside a format specification.
    NestedPlaceholder,
    /// A format specification that does not match the grammar.
    InvalidSpec(String),
    /// A precision, which integers do not accept.
    PrecisionNotAllowed,
    /// A presentation type that is not an integer type.
    UnsupportedType(char),
    /// A grouping separator that cannot be combined with the presentation type.
    InvalidGrouping { separator: char, kind: char },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmatchedOpenBrace => write!(f, "single '{{' encountered in pattern"),
            Self::UnmatchedCloseBrace => write!(f, "single '}}' encountered in pattern"),
            Self::TooManyPlaceholders => {
                write!(f, "pattern has more than one placeholder to fill")
            }
            Self::FieldOutOfRange(index) => {
                write!(f, "placeholder index {} out of range, only 0 is available", index)
            }
            Self::NamedField(name) => write!(f, "named placeholder '{}' is not supported", name),
            Self::MixedNumbering => write!(
                f,
                "cannot switch between automatic and manual placeholder numbering"
            ),
            Self::ConversionNotSupported(conversion) => {
                write!(f, "conversion '{}' is not supported", conversion)
            }
            Self::NestedPlaceholder => write!(f, "nested placeholders are not supported"),
            Self::InvalidSpec(spec) => write!(f, "invalid format specifier '{}'", spec),
            Self::PrecisionNotAllowed => {
                write!(f, "precision not allowed in integer format specifier")
            }
            Self::UnsupportedType(kind) => {
                write!(f, "unknown format code '{}' for an integer", kind)
            }
            Self::InvalidGrouping { separator, kind } => {
                write!(f, "cannot specify '{}' with '{}'", separator, kind)
            }
        }
    }
}

impl std::error::Error for PatternError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
    AfterSign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Radix {
    Binary,
    Octal,
    Decimal,
    LowerHex,
    UpperHex,
}

impl Radix {
    fn digits(self, n: u64) -> String {
        match self {
            Radix::Binary => format!("{:b}", n),
            Radix::Octal => format!("{:o}", n),
            Radix::Decimal => n.to_string(),
            Radix::LowerHex => format!("{:x}", n),
            Radix::UpperHex => format!("{:X}", n),
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Radix::Binary => "0b",
            Radix::Octal => "0o",
            Radix::Decimal => "",
            Radix::LowerHex => "0x",
            Radix::UpperHex => "0X",
        }
    }

    fn group_size(self) -> usize {
        match self {
            Radix::Decimal => 3,
            _ => 4,
        }
    }
}

/// A parsed integer placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NumberFormat {
    fill: char,
    align: Align,
    sign: Option<char>,
    alternate: bool,
    width: usize,
    grouping: Option<char>,
    radix: Radix,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: Align::Right,
            sign: None,
            alternate: false,
            width: 0,
            grouping: None,
            radix: Radix::Decimal,
        }
    }
}

impl NumberFormat {
    fn parse(spec: &str) -> Result<Self, PatternError> {
        if spec.is_empty() {
            return Ok(Self::default());
        }
        if spec.contains('{') {
            return Err(PatternError::NestedPlaceholder);
        }

        let caps = FORMAT_SPEC
            .captures(spec)
            .ok_or_else(|| PatternError::InvalidSpec(spec.to_string()))?;

        if caps.name("precision").is_some() {
            return Err(PatternError::PrecisionNotAllowed);
        }

        let kind = caps
            .name("kind")
            .and_then(|m| m.as_str().chars().next());
        let radix = match kind {
            None | Some('d') | Some('n') => Radix::Decimal,
            Some('b') => Radix::Binary,
            Some('o') => Radix::Octal,
            Some('x') => Radix::LowerHex,
            Some('X') => Radix::UpperHex,
            Some(other) => return Err(PatternError::UnsupportedType(other)),
        };

        let grouping = caps.name("grouping").and_then(|m| m.as_str().chars().next());
        if let (Some(separator), Some(kind)) = (grouping, kind) {
            let allowed = match separator {
                ',' => kind == 'd',
                _ => kind != 'n',
            };
            if !allowed {
                return Err(PatternError::InvalidGrouping { separator, kind });
            }
        }

        let zero = caps.name("zero").is_some();
        let explicit_fill = caps.name("fill").and_then(|m| m.as_str().chars().next());
        let explicit_align = caps.name("align").map(|m| match m.as_str() {
            "<" => Align::Left,
            "^" => Align::Center,
            "=" => Align::AfterSign,
            _ => Align::Right,
        });

        let width = match caps.name("width") {
            Some(m) => m
                .as_str()
                .parse()
                .map_err(|_| PatternError::InvalidSpec(spec.to_string()))?,
            None => 0,
        };

        Ok(Self {
            fill: explicit_fill.unwrap_or(if zero { '0' } else { ' ' }),
            align: explicit_align.unwrap_or(if zero { Align::AfterSign } else { Align::Right }),
            sign: caps
                .name("sign")
                .and_then(|m| m.as_str().chars().next())
                .filter(|&c| c != '-'),
            alternate: caps.name("alt").is_some(),
            width,
            grouping,
            radix,
        })
    }

    fn render(&self, n: u64) -> String {
        let mut prefix = String::new();
        if let Some(sign) = self.sign {
            prefix.push(sign);
        }
        if self.alternate {
            prefix.push_str(self.radix.prefix());
        }

        let mut digits = self.radix.digits(n);
        if let Some(separator) = self.grouping {
            digits = group_digits(&digits, separator, self.radix.group_size());
        }

        let len = prefix.chars().count() + digits.chars().count();
        let padding = self.width.saturating_sub(len);
        let pad = |count: usize| -> String { std::iter::repeat_n(self.fill, count).collect() };

        match self.align {
            Align::Left => format!("{}{}{}", prefix, digits, pad(padding)),
            Align::Right => format!("{}{}{}", pad(padding), prefix, digits),
            Align::AfterSign => format!("{}{}{}", prefix, pad(padding), digits),
            Align::Center => {
                let left = padding / 2;
                format!("{}{}{}{}", pad(left), prefix, digits, pad(padding - left))
            }
        }
    }
}

fn group_digits(digits: &str, separator: char, size: usize) -> String {
    let count = digits.len();
    let mut grouped = String::with_capacity(count + count / size);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (count - i) % size == 0 {
            grouped.push(separator);
        }
        grouped.push(c);
    }
    grouped
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Number(NumberFormat),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Numbering {
    Automatic,
    Manual,
}

/// A validated naming pattern, ready to render sequence numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPattern {
    template: String,
    segments: Vec<Segment>,
}

impl NamingPattern {
    /// Parses a template such as `"photo_{:03d}"`.
    ///
    /// A template without any placeholder is accepted and always renders to
    /// its literal text.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] when braces are unbalanced, when the
    /// template needs more than the single sequence number, or when a format
    /// specifier is not a valid integer format.
    pub fn parse(template: &str) -> Result<Self, PatternError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut numbering = None;
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(PatternError::UnmatchedCloseBrace),
                '{' => {
                    let mut field = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        field.push(c);
                    }
                    if !closed {
                        return Err(PatternError::UnmatchedOpenBrace);
                    }

                    let (name, spec) = field.split_once(':').unwrap_or((field.as_str(), ""));
                    if let Some((_, conversion)) = name.split_once('!') {
                        return Err(PatternError::ConversionNotSupported(conversion.to_string()));
                    }

                    let current = if name.is_empty() {
                        if numbering == Some(Numbering::Automatic) {
                            return Err(PatternError::TooManyPlaceholders);
                        }
                        Numbering::Automatic
                    } else {
                        match name.parse::<usize>() {
                            Ok(0) => Numbering::Manual,
                            Ok(index) => return Err(PatternError::FieldOutOfRange(index)),
                            Err(_) => return Err(PatternError::NamedField(name.to_string())),
                        }
                    };
                    if numbering.is_some_and(|previous| previous != current) {
                        return Err(PatternError::MixedNumbering);
                    }
                    numbering = Some(current);

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Number(NumberFormat::parse(spec)?));
                }
                c => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    /// Renders the pattern for a sequence number.
    pub fn render(&self, sequence: usize) -> String {
        let n = sequence as u64;
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.clone(),
                Segment::Number(format) => format.render(n),
            })
            .collect()
    }

    /// Returns the template this pattern was parsed from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns true if the pattern contains at least one placeholder.
    pub fn has_placeholder(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, Segment::Number(_)))
    }
}

impl FromStr for NamingPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NamingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}
