//! Parser for the circuit DSL.

use std::collections::HashMap;

use super::ast::*;
use super::lexer::{parse_value, Lexer, Token, TokenKind};
use crate::error::{Result, SplitFactorError};

/// Parser for circuit DSL.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Create a new parser with the given lexer.
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self> {
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    /// Parse the entire circuit description.
    pub fn parse(&mut self) -> Result<CircuitAst> {
        let mut ast = CircuitAst::new();

        while self.current.kind != TokenKind::Eof {
            match &self.current.kind {
                TokenKind::Newline => {
                    self.advance()?;
                    continue;
                }
                TokenKind::Directive => self.parse_directive(&mut ast)?,
                TokenKind::Identifier => {
                    let node = self.parse_node()?;
                    ast.nodes.push(node);
                }
                _ => {
                    return Err(SplitFactorError::parse(
                        self.current.line,
                        format!("unexpected token: {:?}", self.current.text),
                    ));
                }
            }

            self.end_of_line()?;
        }

        Ok(ast)
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.current.kind == kind {
            let tok = self.current.clone();
            self.advance()?;
            Ok(tok)
        } else {
            Err(SplitFactorError::parse(
                self.current.line,
                format!("expected {:?}, got {:?}", kind, self.current.kind),
            ))
        }
    }

    fn at_line_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Newline | TokenKind::Eof)
    }

    fn end_of_line(&mut self) -> Result<()> {
        match self.current.kind {
            TokenKind::Newline => self.advance(),
            TokenKind::Eof => Ok(()),
            _ => Err(SplitFactorError::parse(
                self.current.line,
                format!("unexpected trailing token: {:?}", self.current.text),
            )),
        }
    }

    /// A node name: bare identifier or quoted string.
    fn expect_name(&mut self) -> Result<String> {
        match self.current.kind {
            TokenKind::Identifier | TokenKind::Str => {
                let text = self.current.text.clone();
                self.advance()?;
                Ok(text)
            }
            _ => Err(SplitFactorError::parse(
                self.current.line,
                format!("expected name, got {:?}", self.current.text),
            )),
        }
    }

    fn expect_number(&mut self) -> Result<f64> {
        let tok = self.expect(TokenKind::Number)?;
        parse_value(&tok.text)
            .ok_or_else(|| SplitFactorError::parse(tok.line, format!("invalid number: {}", tok.text)))
    }

    fn expect_integer<T: std::str::FromStr>(&mut self) -> Result<T> {
        let tok = self.expect(TokenKind::Number)?;
        tok.text
            .parse::<T>()
            .map_err(|_| SplitFactorError::parse(tok.line, format!("invalid integer: {}", tok.text)))
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        let tok = self.expect(TokenKind::Identifier)?;
        if tok.text.eq_ignore_ascii_case(keyword) {
            Ok(())
        } else {
            Err(SplitFactorError::parse(
                tok.line,
                format!("expected '{}', got '{}'", keyword, tok.text),
            ))
        }
    }

    /// Flow ids until the next identifier or end of line.
    fn parse_flow_list(&mut self) -> Result<Vec<u32>> {
        let mut ids = Vec::new();
        while self.current.kind == TokenKind::Number {
            ids.push(self.expect_integer::<u32>()?);
        }
        Ok(ids)
    }

    /// `key=value` pairs until end of line.
    fn parse_params(&mut self) -> Result<HashMap<String, f64>> {
        let mut params = HashMap::new();
        while !self.at_line_end() {
            let key = self.expect(TokenKind::Identifier)?.text;
            self.expect(TokenKind::Equals)?;
            let value = self.expect_number()?;
            params.insert(key.to_lowercase(), value);
        }
        Ok(params)
    }

    fn parse_directive(&mut self, ast: &mut CircuitAst) -> Result<()> {
        let directive = self.current.text.clone();
        let line = self.current.line;
        self.advance()?;

        match directive.to_lowercase().as_str() {
            ".flow" => {
                let id = self.expect_integer::<u32>()?;
                let name = self.expect_name()?;
                ast.flow_names.insert(id, name);
            }
            ".feed" => {
                let flow = self.expect_integer::<u32>()?;
                let mass = self.expect_number()?;
                let grade = self.expect_number()?;
                ast.feeds.push(FeedDef {
                    flow,
                    mass,
                    grade,
                    line,
                });
            }
            ".discharge" => {
                let ids = self.parse_flow_list()?;
                if ids.is_empty() {
                    return Err(SplitFactorError::parse(line, ".discharge needs at least one flow id"));
                }
                ast.discharge.extend(ids);
            }
            ".passes" => ast.passes = Some(self.expect_integer::<usize>()?),
            ".trials" => ast.montecarlo.trials = Some(self.expect_integer::<usize>()?),
            ".seed" => ast.montecarlo.seed = Some(self.expect_integer::<u64>()?),
            ".grade" => {
                ast.montecarlo.grade_min = Some(self.expect_number()?);
                ast.montecarlo.grade_max = Some(self.expect_number()?);
            }
            ".grade_min" => ast.montecarlo.grade_min = Some(self.expect_number()?),
            ".grade_max" => ast.montecarlo.grade_max = Some(self.expect_number()?),
            ".ceiling" => ast.montecarlo.ceiling = Some(self.expect_number()?),
            ".vary" => {
                let node = self.expect_name()?;
                let mut ranges = Vec::new();
                while !self.at_line_end() {
                    let param = self.expect(TokenKind::Identifier)?.text;
                    let low = self.expect_number()?;
                    let high = self.expect_number()?;
                    ranges.push((param, low, high));
                }
                ast.montecarlo.vary.push(VaryDef { node, ranges, line });
            }
            ".selectivity" => {
                let node = self.expect_name()?;
                let min = self.expect_number()?;
                let max = self.expect_number()?;
                ast.montecarlo.selectivity = Some(SelectivityDef {
                    node,
                    min,
                    max,
                    line,
                });
            }
            ".scenario" => {
                let id = self.expect_integer::<u32>()?;
                let node = self.expect_name()?;
                let params = self.parse_params()?;
                ast.scenarios.push(ScenarioDef {
                    id,
                    node,
                    params,
                    line,
                });
            }
            _ => {
                return Err(SplitFactorError::parse(
                    line,
                    format!("unknown directive: {}", directive),
                ));
            }
        }

        Ok(())
    }

    /// `<kind> <name> in <ids> out <ids> [key=value ...]`
    fn parse_node(&mut self) -> Result<NodeDef> {
        let line = self.current.line;
        let kind = self.expect(TokenKind::Identifier)?.text;
        let name = self.expect_name()?;

        self.expect_keyword("in")?;
        let inputs = self.parse_flow_list()?;
        self.expect_keyword("out")?;
        let outputs = self.parse_flow_list()?;
        let params = self.parse_params()?;

        Ok(NodeDef {
            kind,
            name,
            inputs,
            outputs,
            params,
            line,
        })
    }
}
