//! Loads a program image from its conventional text form: comma-separated
//! decimal integers with no internal whitespace.
//!
//! ```text
//! 109,1,204,-1,1001,100,1,100,99
//! ```

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::{FromStr, Split};

use color_eyre::eyre::eyre;

use super::{Cell, Memory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    EmptyToken,
    InvalidInteger,
}

impl fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadErrorKind::EmptyToken => f.write_str("empty token"),
            LoadErrorKind::InvalidInteger => f.write_str("failed to parse token as integer"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    kind: LoadErrorKind,
    context: Option<Cow<'static, str>>,
    token_nr: usize,
}

impl LoadError {
    fn new<C, S>(kind: LoadErrorKind, context: C, token_nr: usize) -> Self
    where
        C: Into<Option<S>>,
        S: Into<Cow<'static, str>>,
    {
        Self {
            kind,
            context: context.into().map(|inner| inner.into()),
            token_nr,
        }
    }

    pub fn kind(&self) -> LoadErrorKind {
        self.kind
    }

    /// One-based position of the offending token in the image text.
    pub fn token_nr(&self) -> usize {
        self.token_nr
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(
                f,
                "error [token: {}]: {} - {}",
                self.token_nr, self.kind, context
            )
        } else {
            write!(f, "error [token: {}]: {}", self.token_nr, self.kind)
        }
    }
}

impl error::Error for LoadError {}

pub type Result<T, E = LoadError> = std::result::Result<T, E>;

/// Parses one comma-separated image text into a [`Memory`].
#[derive(Debug, Clone)]
pub struct Loader<'a> {
    tokens: Split<'a, char>,
    token_nr: usize,
    image: Vec<Cell>,
}

impl<'a> Loader<'a> {
    /// Creates a new loader for `text`. Surrounding whitespace (a trailing
    /// newline from a file, say) is ignored; whitespace inside the image is
    /// not.
    pub fn new(text: &'a str) -> Self {
        Self {
            tokens: text.trim().split(','),
            token_nr: 0,
            image: Vec::new(),
        }
    }

    /// Consumes `self` and tries to parse the whole image.
    ///
    /// # Errors
    ///
    /// All errors which may occur are collected and returned at the end.
    pub fn parse(mut self) -> Result<Memory, Vec<LoadError>> {
        let mut errors = Vec::new();

        while let Some(res) = self.parse_next_token() {
            if let Err(err) = res {
                log::error!("{}", err);
                errors.push(err);
            }
        }

        if errors.is_empty() {
            Ok(Memory::new(self.image))
        } else {
            Err(errors)
        }
    }

    /// Tries to parse the next token of the image as one memory cell.
    fn parse_next_token(&mut self) -> Option<Result<()>> {
        let token = self.tokens.next()?;
        self.token_nr += 1;

        if token.is_empty() {
            return Some(Err(LoadError::new(
                LoadErrorKind::EmptyToken,
                "a cell needs to have a value set",
                self.token_nr,
            )));
        }

        match token.parse::<Cell>() {
            Ok(cell) => {
                self.image.push(cell);
                Some(Ok(()))
            }
            Err(_) => Some(Err(LoadError::new(
                LoadErrorKind::InvalidInteger,
                format!("`{}`", token),
                self.token_nr,
            ))),
        }
    }
}

impl FromStr for Memory {
    type Err = Vec<LoadError>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Loader::new(s).parse()
    }
}

impl Memory {
    /// Reads and parses an image file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> color_eyre::eyre::Result<Self> {
        let text = fs::read_to_string(path)?;
        text.parse().map_err(|errors: Vec<LoadError>| {
            let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
            eyre!("failed to load image: {}", details.join("; "))
        })
    }
}
