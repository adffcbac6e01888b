//! Text scenario format: configuration header followed by object placements.
//!
//! ```text
//! RABBIT_PROC FOX_PROC FOX_FOOD GENERATIONS ROWS COLS N
//! KIND row col        (N times, KIND is ROCK, RABBIT or FOX)
//! ```
//!
//! Tokens are whitespace separated and may be split across lines freely.
//! Everything is validated here so the engine can treat coordinates and
//! dimensions as trusted.

use crate::{CellKind, EcosystemConfig, Error, Position, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::Read;
use std::str::FromStr;
use tracing::debug;

/// One initial object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub kind: CellKind,
    pub position: Position,
}

impl Placement {
    pub fn new(kind: CellKind, row: usize, col: usize) -> Self {
        Self {
            kind,
            position: Position::new(row, col),
        }
    }
}

/// A validated starting point for a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub config: EcosystemConfig,
    /// Applied in order; a later placement on the same cell replaces an earlier one
    pub placements: Vec<Placement>,
}

impl Scenario {
    pub fn new(config: EcosystemConfig, placements: Vec<Placement>) -> Result<Self> {
        config.validate()?;
        // Line numbers refer to where each placement would sit in the text form.
        for (i, placement) in placements.iter().enumerate() {
            let Position { row, col } = placement.position;
            if row >= config.rows || col >= config.cols {
                return Err(Error::OutOfBounds {
                    line: i + 2,
                    row: i64::try_from(row).unwrap_or(i64::MAX),
                    col: i64::try_from(col).unwrap_or(i64::MAX),
                    rows: config.rows,
                    cols: config.cols,
                });
            }
            if placement.kind == CellKind::Empty {
                return Err(Error::UnknownKind {
                    line: i + 2,
                    token: CellKind::Empty.token().to_string(),
                });
            }
        }
        Ok(Self { config, placements })
    }

    pub fn parse(input: &str) -> Result<Self> {
        let mut tokens = Tokens::new(input);

        let rabbit_procreation = tokens.next_parsed("rabbit procreation age")?;
        let fox_procreation = tokens.next_parsed("fox procreation age")?;
        let fox_starvation = tokens.next_parsed("fox starvation age")?;
        let generations = tokens.next_parsed("generation count")?;
        let rows = tokens.next_parsed("row count")?;
        let cols = tokens.next_parsed("column count")?;
        let count: usize = tokens.next_parsed("object count")?;

        let config = EcosystemConfig {
            rabbit_procreation,
            fox_procreation,
            fox_starvation,
            generations,
            rows,
            cols,
        };
        config.validate()?;

        // The count comes from untrusted input, so don't preallocate from it.
        let mut placements = Vec::with_capacity(count.min(config.cell_count()));
        for _ in 0..count {
            let (line, token) = tokens.next_token("object kind")?;
            let kind = CellKind::from_token(token).ok_or_else(|| Error::UnknownKind {
                line,
                token: token.to_string(),
            })?;
            let row: i64 = tokens.next_parsed("object row")?;
            let col: i64 = tokens.next_parsed("object column")?;

            let index = |value: i64, limit: usize| {
                usize::try_from(value).ok().filter(|&v| v < limit)
            };
            let (Some(r), Some(c)) = (index(row, rows), index(col, cols)) else {
                return Err(Error::OutOfBounds {
                    line,
                    row,
                    col,
                    rows,
                    cols,
                });
            };
            placements.push(Placement::new(kind, r, c));
        }

        debug!(
            rows,
            cols,
            generations,
            objects = placements.len(),
            "Parsed scenario"
        );

        Ok(Self { config, placements })
    }

    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let mut input = String::new();
        reader.read_to_string(&mut input)?;
        Self::parse(&input)
    }

    /// Render back to the text format accepted by [`Scenario::parse`].
    pub fn to_input_string(&self) -> String {
        let c = &self.config;
        let mut out = format!(
            "{} {} {} {} {} {} {}\n",
            c.rabbit_procreation,
            c.fox_procreation,
            c.fox_starvation,
            c.generations,
            c.rows,
            c.cols,
            self.placements.len()
        );
        for placement in &self.placements {
            // Writing into a String cannot fail.
            let _ = writeln!(out, "{} {}", placement.kind, placement.position);
        }
        out
    }
}

impl FromStr for Scenario {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Whitespace tokenizer that remembers 1-based line numbers for errors.
struct Tokens<'a> {
    inner: Box<dyn Iterator<Item = (usize, &'a str)> + 'a>,
    last_line: usize,
}

impl<'a> Tokens<'a> {
    fn new(input: &'a str) -> Self {
        let inner = input
            .lines()
            .enumerate()
            .flat_map(|(i, line)| line.split_whitespace().map(move |t| (i + 1, t)));
        Self {
            inner: Box::new(inner),
            last_line: 1,
        }
    }

    fn next_token(&mut self, what: &str) -> Result<(usize, &'a str)> {
        match self.inner.next() {
            Some((line, token)) => {
                self.last_line = line;
                Ok((line, token))
            }
            None => Err(Error::parse(
                self.last_line,
                format!("unexpected end of input, expected {what}"),
            )),
        }
    }

    fn next_parsed<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let (line, token) = self.next_token(what)?;
        token.parse().map_err(|_| {
            Error::parse(line, format!("expected {what}, found {token:?}"))
        })
    }
}
