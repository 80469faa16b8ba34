//! CSS selector subset: parsing and right-to-left matching.

use domgraft_protocols::{DomError, NodeId};

use crate::tree::{ElementData, Tree};

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<ComplexSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ComplexSelector {
    /// Left to right; `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Filter {
    Id(String),
    Class(String),
    Attribute { name: String, test: Option<(AttrOp, String)> },
    Not(Box<Compound>),
    FirstChild,
    LastChild,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Includes,
    Prefix,
    Suffix,
    Substring,
    DashMatch,
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, DomError> {
        let mut parser = Parser {
            source: input,
            chars: input.chars().collect(),
            pos: 0,
        };
        parser.parse_list()
    }

    pub(crate) fn matches(&self, tree: &Tree, node: NodeId) -> bool {
        self.selectors.iter().any(|s| s.matches(tree, node))
    }
}

impl ComplexSelector {
    fn matches(&self, tree: &Tree, node: NodeId) -> bool {
        self.matches_at(tree, node, self.compounds.len() - 1)
    }

    fn matches_at(&self, tree: &Tree, node: NodeId, index: usize) -> bool {
        if !self.compounds[index].matches(tree, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        let next = index - 1;
        match self.combinators[next] {
            Combinator::Child => tree
                .parent_element(node)
                .is_some_and(|parent| self.matches_at(tree, parent, next)),
            Combinator::Descendant => {
                let mut current = tree.parent_element(node);
                while let Some(ancestor) = current {
                    if self.matches_at(tree, ancestor, next) {
                        return true;
                    }
                    current = tree.parent_element(ancestor);
                }
                false
            }
            Combinator::NextSibling => tree
                .previous_element_sibling(node)
                .is_some_and(|sibling| self.matches_at(tree, sibling, next)),
            Combinator::SubsequentSibling => {
                let mut current = tree.previous_element_sibling(node);
                while let Some(sibling) = current {
                    if self.matches_at(tree, sibling, next) {
                        return true;
                    }
                    current = tree.previous_element_sibling(sibling);
                }
                false
            }
        }
    }
}

impl Compound {
    fn matches(&self, tree: &Tree, node: NodeId) -> bool {
        let Some(element) = tree.element(node) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if element.tag != *tag {
                return false;
            }
        }
        self.filters
            .iter()
            .all(|filter| filter.matches(tree, node, element))
    }
}

impl Filter {
    fn matches(&self, tree: &Tree, node: NodeId, element: &ElementData) -> bool {
        match self {
            Filter::Id(id) => element.attributes.get("id") == Some(id),
            Filter::Class(class) => element
                .attributes
                .get("class")
                .is_some_and(|value| value.split_whitespace().any(|c| c == class)),
            Filter::Attribute { name, test } => match (element.attributes.get(name), test) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(actual), Some((op, expected))) => op.test(actual, expected),
            },
            Filter::Not(inner) => !inner.matches(tree, node),
            Filter::FirstChild => tree.is_first_element_child(node),
            Filter::LastChild => tree.is_last_element_child(node),
            Filter::Empty => tree.children(node).is_empty(),
        }
    }
}

impl AttrOp {
    fn test(&self, actual: &str, expected: &str) -> bool {
        match self {
            AttrOp::Equals => actual == expected,
            AttrOp::Includes => actual.split_whitespace().any(|word| word == expected),
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttrOp::Substring => !expected.is_empty() && actual.contains(expected),
            AttrOp::DashMatch => {
                actual == expected
                    || actual
                        .strip_prefix(expected)
                        .is_some_and(|rest| rest.starts_with('-'))
            }
        }
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: impl Into<String>) -> DomError {
        DomError::invalid_selector(
            self.source,
            format!("{} at offset {}", reason.into(), self.pos),
        )
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn expect(&mut self, expected: char) -> Result<(), DomError> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    /// Returns whether any whitespace was consumed.
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_list(&mut self) -> Result<SelectorList, DomError> {
        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            selectors.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some(',') => {
                    self.bump();
                }
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            }
        }
        Ok(SelectorList { selectors })
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, DomError> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_whitespace = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => Combinator::Child,
                Some('+') => Combinator::NextSibling,
                Some('~') => Combinator::SubsequentSibling,
                Some(_) if had_whitespace => Combinator::Descendant,
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            };
            if combinator != Combinator::Descendant {
                self.bump();
                self.skip_whitespace();
            }
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }
        Ok(ComplexSelector {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound, DomError> {
        let mut compound = Compound::default();
        let mut parsed_any = false;

        match self.peek() {
            Some('*') => {
                self.bump();
                parsed_any = true;
            }
            Some(c) if is_ident_start(c) => {
                compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
                parsed_any = true;
            }
            _ => {}
        }

        loop {
            let filter = match self.peek() {
                Some('#') => {
                    self.bump();
                    Filter::Id(self.parse_ident()?)
                }
                Some('.') => {
                    self.bump();
                    Filter::Class(self.parse_ident()?)
                }
                Some('[') => {
                    self.bump();
                    self.parse_attribute()?
                }
                Some(':') => {
                    self.bump();
                    self.parse_pseudo()?
                }
                _ => break,
            };
            compound.filters.push(filter);
            parsed_any = true;
        }

        if !parsed_any {
            return Err(self.error("expected a selector"));
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String, DomError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected an identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_attribute(&mut self) -> Result<Filter, DomError> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        if self.peek() == Some(']') {
            self.bump();
            return Ok(Filter::Attribute { name, test: None });
        }

        let op = match self.bump() {
            Some('=') => AttrOp::Equals,
            Some(c @ ('~' | '^' | '$' | '*' | '|')) => {
                self.expect('=')?;
                match c {
                    '~' => AttrOp::Includes,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    '*' => AttrOp::Substring,
                    _ => AttrOp::DashMatch,
                }
            }
            Some(c) => return Err(self.error(format!("unexpected '{}' in attribute selector", c))),
            None => return Err(self.error("unterminated attribute selector")),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let start = self.pos;
                while self.peek().is_some_and(|c| c != quote) {
                    self.pos += 1;
                }
                let value: String = self.chars[start..self.pos].iter().collect();
                self.expect(quote)?;
                value
            }
            _ => self.parse_ident()?,
        };
        self.skip_whitespace();
        self.expect(']')?;

        Ok(Filter::Attribute {
            name,
            test: Some((op, value)),
        })
    }

    fn parse_pseudo(&mut self) -> Result<Filter, DomError> {
        let name = self.parse_ident()?.to_ascii_lowercase();
        match name.as_str() {
            "first-child" => Ok(Filter::FirstChild),
            "last-child" => Ok(Filter::LastChild),
            "empty" => Ok(Filter::Empty),
            "not" => {
                self.expect('(')?;
                self.skip_whitespace();
                let inner = self.parse_compound()?;
                self.skip_whitespace();
                self.expect(')')?;
                Ok(Filter::Not(Box::new(inner)))
            }
            other => Err(self.error(format!("unsupported pseudo-class ':{}'", other))),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '-'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}
