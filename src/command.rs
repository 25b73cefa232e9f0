//! # Command Protocol
//!
//! One command per line:
//!
//! ```text
//! <file> B
//! <file> [R <x> <y> <w> <h>] <scale> [<y scale>]
//! ```
//!
//! `B` runs the benchmark on the file. Otherwise the region defaults to the whole
//! image and a single factor applies to both axes. Parsing only checks the shape of
//! the line; [`Command::prepare`] validates the values against the loaded image
//! and reports failures with the protocol's status numbers.

use std::fmt;
use std::str::FromStr;

use sg_scale::geometry::{Rect, ScaleFactor, ScaleRequest, Size};

use crate::error::CommandError;

/// Usage text printed by the interactive console.
pub const HELP: &str = "\
Enter command in this format <filename> (B | [R <x> <y> <w> <h>] <scale factor>)
B starts benchmark, no other parameters are allowed
R selects the part of the picture to scale
Scale factor is one or two numbers in range {-4, -3, -2, -1, 1, 2, 3, 4}
If two numbers are specified they are x and y scaling factors respectively";

/// Requested region, as typed. Validated by [`Command::prepare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Benchmark,
    Scale {
        region: Option<Region>,
        x_scale: i32,
        y_scale: i32,
    },
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub file: String,
    pub action: Action,
}

fn syntax(line: &str, reason: impl Into<String>) -> CommandError {
    CommandError::Syntax {
        line: line.trim().to_string(),
        reason: reason.into(),
    }
}

fn number<T: FromStr>(line: &str, token: Option<&str>, what: &str) -> Result<T, CommandError> {
    let token = token.ok_or_else(|| syntax(line, format!("missing {}", what)))?;
    token
        .parse()
        .map_err(|_| syntax(line, format!("{} '{}' is not an integer", what, token)))
}

impl Command {
    /// Parses one line of the protocol.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut tokens = line.split_whitespace().peekable();
        let file = tokens
            .next()
            .ok_or_else(|| syntax(line, "missing file name"))?
            .to_string();

        let action = match tokens.peek().copied() {
            Some("B") => {
                tokens.next();
                Action::Benchmark
            }
            _ => {
                let region = if tokens.peek() == Some(&"R") {
                    tokens.next();
                    Some(Region {
                        x: number(line, tokens.next(), "x")?,
                        y: number(line, tokens.next(), "y")?,
                        w: number(line, tokens.next(), "width")?,
                        h: number(line, tokens.next(), "height")?,
                    })
                } else {
                    None
                };
                let x_scale = number(line, tokens.next(), "scale factor")?;
                let y_scale = match tokens.next() {
                    Some(token) => number(line, Some(token), "y scale factor")?,
                    None => x_scale,
                };
                Action::Scale {
                    region,
                    x_scale,
                    y_scale,
                }
            }
        };

        if let Some(extra) = tokens.next() {
            return Err(syntax(line, format!("unexpected '{}'", extra)));
        }
        Ok(Self { file, action })
    }

    pub fn is_benchmark(&self) -> bool {
        self.action == Action::Benchmark
    }

    /// Validates the command against a loaded image of `source` size.
    ///
    /// Checks run in protocol order: x factor (6), y factor (7), start point (8),
    /// end point (9). A region whose end does not lie strictly past its start fails
    /// the end-point check.
    pub fn prepare(&self, source: Size) -> Result<ScaleRequest, CommandError> {
        let Action::Scale {
            region,
            x_scale,
            y_scale,
        } = self.action
        else {
            return Err(CommandError::Syntax {
                line: self.to_string(),
                reason: "benchmark commands carry no scale request".to_string(),
            });
        };

        let xs = ScaleFactor::new(x_scale).ok_or(CommandError::InvalidXScale { value: x_scale })?;
        let ys = ScaleFactor::new(y_scale).ok_or(CommandError::InvalidYScale { value: y_scale })?;

        let (sw, sh) = (i64::from(source.w), i64::from(source.h));
        let Region { x, y, w, h } = region.unwrap_or(Region {
            x: 0,
            y: 0,
            w: sw,
            h: sh,
        });
        if x < 0 || x >= sw || y < 0 || y >= sh {
            return Err(CommandError::InvalidStart { x, y });
        }
        let (x_end, y_end) = (x.saturating_add(w), y.saturating_add(h));
        if x_end <= x || x_end > sw || y_end <= y || y_end > sh {
            return Err(CommandError::InvalidEnd { x_end, y_end });
        }

        // Bounds above guarantee every field fits in u32.
        let rect = Rect {
            x: x as u32,
            y: y as u32,
            w: w as u32,
            h: h as u32,
        };
        ScaleRequest::new(source, rect, xs, ys)
            .map_err(|_| CommandError::InvalidEnd { x_end, y_end })
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file)?;
        match self.action {
            Action::Benchmark => write!(f, " B"),
            Action::Scale {
                region,
                x_scale,
                y_scale,
            } => {
                if let Some(Region { x, y, w, h }) = region {
                    write!(f, " R {} {} {} {}", x, y, w, h)?;
                }
                write!(f, " {} {}", x_scale, y_scale)
            }
        }
    }
}
