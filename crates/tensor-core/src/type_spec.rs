// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Parser for the textual type form (`tensor<float>(x{},y[3])`).

use crate::{CellType, Dimension, TensorError, ValueType};

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), TensorError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{c}'")))
        }
    }

    fn ident(&mut self) -> Result<&'a str, TensorError> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error("expected identifier".into()));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn number(&mut self) -> Result<Option<usize>, TensorError> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if len == 0 {
            return Ok(None);
        }
        self.pos += len;
        rest[..len]
            .parse()
            .map(Some)
            .map_err(|_| self.error("dimension size out of range".into()))
    }

    fn error(&self, detail: String) -> TensorError {
        TensorError::InvalidTypeSpec {
            spec: self.src.to_string(),
            detail: format!("{detail} at offset {}", self.pos),
        }
    }

    fn dimension(&mut self) -> Result<Dimension, TensorError> {
        let name = self.ident()?;
        if self.eat('{') {
            self.expect('}')?;
            return Ok(Dimension::mapped(name));
        }
        self.expect('[')?;
        let size = self.number()?;
        self.expect(']')?;
        Ok(match size {
            Some(size) => Dimension::indexed(name, size),
            None => Dimension::unbound(name),
        })
    }

    fn value_type(&mut self) -> Result<ValueType, TensorError> {
        match self.ident()? {
            "double" => Ok(ValueType::double()),
            "error" => Ok(ValueType::error_type()),
            "tensor" => {
                let mut cell_type = CellType::Double;
                if self.eat('<') {
                    let name = self.ident()?;
                    cell_type = CellType::from_name(name)
                        .ok_or_else(|| self.error(format!("unknown cell type '{name}'")))?;
                    self.expect('>')?;
                }
                self.expect('(')?;
                let mut dims = Vec::new();
                if !self.eat(')') {
                    loop {
                        dims.push(self.dimension()?);
                        if self.eat(')') {
                            break;
                        }
                        self.expect(',')?;
                    }
                }
                let ty = ValueType::make(cell_type, dims);
                if ty.is_error() {
                    return Err(self.error("invalid dimension list".into()));
                }
                Ok(ty)
            }
            other => Err(self.error(format!("unknown type '{other}'"))),
        }
    }
}

/// Parses a type spec; trailing input is rejected.
pub fn parse(spec: &str) -> Result<ValueType, TensorError> {
    let mut parser = Parser::new(spec);
    let ty = parser.value_type()?;
    parser.skip_ws();
    if !parser.rest().is_empty() {
        return Err(parser.error("trailing characters".into()));
    }
    Ok(ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        assert!(parse("double").unwrap().is_double());
        assert!(parse("error").unwrap().is_error());
        assert!(parse("tensor()").unwrap().is_double());

        let ty = parse("tensor<int8>( y[3] , x{} )").unwrap();
        assert_eq!(ty.cell_type(), CellType::Int8);
        assert_eq!(ty.dimension_names(), vec!["x", "y"]);

        let unbound = parse("tensor(x[])").unwrap();
        assert!(!unbound.is_bound());
    }

    #[test]
    fn test_display_round_trip() {
        for spec in [
            "double",
            "tensor(x[3])",
            "tensor<float>(x{},y{})",
            "tensor<bfloat16>(a{},b[2],c[7])",
            "tensor(x[])",
        ] {
            assert_eq!(parse(spec).unwrap().to_string(), spec);
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("tensor<int16>(x[3])").is_err());
        assert!(parse("tensor(x[3]").is_err());
        assert!(parse("tensor(x[0])").is_err());
        assert!(parse("tensor(x[2],x{})").is_err());
        assert!(parse("tensor(x[2]) junk").is_err());
        assert!(parse("matrix(x[2])").is_err());
        assert!(ValueType::from_spec("tensor(x[").is_error());
    }
}
