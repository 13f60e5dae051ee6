//! Allocation formula parser.
//!
//! Grammar:
//!
//! ```text
//! formula := "flat" | term ("+" term)*
//! term    := [number "*"] exposure ["@" number]
//! exposure:= "risk" | "hedge" | "tilt" | "signal" | "secondary_signal" | "cash"
//! ```
//!
//! `0.9*risk@3 + 0.2*hedge@3`, `0.5*hedge@2 + 0.5*cash`, `cash`, `flat`.

use crate::domain::allocation::{Allocation, Exposure, Sleeve};
use crate::domain::error::ParseError;
use crate::domain::frame::AssetRole;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn consume_char(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>, position: usize) -> ParseError {
        ParseError {
            message: message.into(),
            position,
        }
    }

    fn found(&self) -> String {
        self.peek()
            .map(|c| format!("'{c}'"))
            .unwrap_or_else(|| "end of input".to_string())
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(self.error(format!("expected number, found {}", self.found()), start));
        }

        self.input[start..self.pos]
            .parse::<f64>()
            .map_err(|e| self.error(format!("invalid number: {e}"), start))
    }

    fn parse_word(&mut self) -> (usize, &'a str) {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        (start, &self.input[start..self.pos])
    }

    fn parse_exposure(&mut self) -> Result<Exposure, ParseError> {
        let (start, word) = self.parse_word();
        if word.is_empty() {
            return Err(self.error(format!("expected asset, found {}", self.found()), start));
        }
        match word.to_lowercase().as_str() {
            "cash" => Ok(Exposure::Cash),
            other => AssetRole::ALL
                .iter()
                .find(|r| r.config_key() == other)
                .map(|&r| Exposure::Asset(r))
                .ok_or_else(|| self.error(format!("unknown asset '{word}'"), start)),
        }
    }

    fn parse_term(&mut self) -> Result<Sleeve, ParseError> {
        self.skip_whitespace();
        let weight = match self.peek() {
            Some(ch) if ch.is_ascii_digit() || ch == '.' => {
                let w = self.parse_number()?;
                if !self.consume_char('*') {
                    return Err(self.error(
                        format!("expected '*' after weight, found {}", self.found()),
                        self.pos,
                    ));
                }
                w
            }
            _ => 1.0,
        };

        let exposure = self.parse_exposure()?;

        let leverage_pos = {
            self.skip_whitespace();
            self.pos
        };
        let leverage = if self.consume_char('@') {
            let lev = self.parse_number()?;
            if exposure == Exposure::Cash {
                return Err(self.error("cash cannot be leveraged", leverage_pos));
            }
            lev
        } else {
            1.0
        };

        Ok(Sleeve {
            exposure,
            weight,
            leverage,
        })
    }

    fn parse_formula(&mut self) -> Result<Allocation, ParseError> {
        self.skip_whitespace();
        if self.remaining().trim().eq_ignore_ascii_case("flat") {
            self.pos = self.input.len();
            return Ok(Allocation::flat());
        }

        let mut sleeves = vec![self.parse_term()?];
        while self.consume_char('+') {
            sleeves.push(self.parse_term()?);
        }

        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error(format!("unexpected {}", self.found()), self.pos));
        }
        Ok(Allocation { sleeves })
    }
}

/// Parse an allocation formula.
pub fn parse(input: &str) -> Result<Allocation, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError {
            message: "empty allocation".to_string(),
            position: 0,
        });
    }
    Parser::new(input).parse_formula()
}
