//! Style sheet parsing on `cssparser`.
//!
//! Comments are dropped and whitespace is collapsed in selector, prelude
//! and value text. A rule or declaration that fails to parse is discarded
//! without affecting the ones around it.

use cssparser::{
    parse_important, AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput,
    ParserState, QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser, StyleSheetParser, Token,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A parsed style sheet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stylesheet {
    pub rules: Vec<CssRule>,
}

impl Stylesheet {
    pub fn parse(text: &str) -> Self {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        Self {
            rules: rule_list(&mut parser),
        }
    }

    /// Number of top-level rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Normalized text of every top-level rule, one per line.
    pub fn css_text(&self) -> String {
        self.rules
            .iter()
            .map(CssRule::css_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CssRule {
    Style(StyleRule),
    Group(GroupRule),
    Other(AtRule),
}

impl CssRule {
    pub fn css_text(&self) -> String {
        match self {
            CssRule::Style(rule) => rule.css_text(),
            CssRule::Group(group) => group.css_text(),
            CssRule::Other(other) => other.text.clone(),
        }
    }
}

/// `selector { declarations }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRule {
    pub selector: String,
    pub declarations: Vec<Declaration>,
}

impl StyleRule {
    /// Normalized rule text: `selector { prop: value; }`.
    pub fn css_text(&self) -> String {
        if self.declarations.is_empty() {
            return format!("{} {{ }}", self.selector);
        }
        let body: Vec<String> = self.declarations.iter().map(Declaration::css_text).collect();
        format!("{} {{ {} }}", self.selector, body.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    pub fn css_text(&self) -> String {
        if self.important {
            format!("{}: {} !important;", self.property, self.value)
        } else {
            format!("{}: {};", self.property, self.value)
        }
    }

    pub fn is_custom_property(&self) -> bool {
        self.property.starts_with("--")
    }
}

/// Conditional group rule kinds whose nested rules are searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupKind {
    Media,
    Supports,
    Container,
    Layer,
    Document,
}

impl GroupKind {
    fn from_keyword(name: &str) -> Option<Self> {
        match name {
            "media" => Some(GroupKind::Media),
            "supports" => Some(GroupKind::Supports),
            "container" => Some(GroupKind::Container),
            "layer" => Some(GroupKind::Layer),
            "document" | "-moz-document" => Some(GroupKind::Document),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            GroupKind::Media => "media",
            GroupKind::Supports => "supports",
            GroupKind::Container => "container",
            GroupKind::Layer => "layer",
            GroupKind::Document => "document",
        }
    }

    /// Label used when annotating a source with the group condition.
    pub fn label(&self) -> &'static str {
        match self {
            GroupKind::Media => "Media",
            GroupKind::Supports => "Supports",
            GroupKind::Container => "Container",
            GroupKind::Layer => "Layer",
            GroupKind::Document => "Document",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRule {
    pub kind: GroupKind,
    pub condition: String,
    pub rules: Vec<CssRule>,
}

impl GroupRule {
    pub fn css_text(&self) -> String {
        let nested: Vec<String> = self.rules.iter().map(CssRule::css_text).collect();
        let head = if self.condition.is_empty() {
            format!("@{}", self.kind.keyword())
        } else {
            format!("@{} {}", self.kind.keyword(), self.condition)
        };
        if nested.is_empty() {
            format!("{} {{ }}", head)
        } else {
            format!("{} {{ {} }}", head, nested.join(" "))
        }
    }
}

/// Any other at-rule, kept verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtRule {
    pub name: String,
    pub text: String,
}

/// Parse a declaration block body (`a: b; c: d !important`).
///
/// Nested rules are skipped.
pub fn parse_declarations(block: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(block);
    let mut parser = Parser::new(&mut input);
    declaration_list(&mut parser)
}

fn rule_list(input: &mut Parser<'_, '_>) -> Vec<CssRule> {
    let mut parser = RuleParser;
    StyleSheetParser::new(input, &mut parser)
        .filter_map(|result| match result {
            Ok(rule) => Some(rule),
            Err((_, text)) => {
                debug!(rule = %collapse_whitespace(text), "dropping malformed css rule");
                None
            }
        })
        .collect()
}

fn declaration_list(input: &mut Parser<'_, '_>) -> Vec<Declaration> {
    let mut parser = DeclarationListParser;
    let body: RuleBodyParser<'_, '_, '_, _, Declaration, ()> =
        RuleBodyParser::new(input, &mut parser);
    body.filter_map(Result::ok).collect()
}

/// Top-level and group-level rules.
struct RuleParser;

/// Lowercase at-rule name and its normalized prelude.
struct AtPrelude {
    name: String,
    text: String,
}

impl AtPrelude {
    fn head(&self) -> String {
        if self.text.is_empty() {
            format!("@{}", self.name)
        } else {
            format!("@{} {}", self.name, self.text)
        }
    }
}

impl<'i> QualifiedRuleParser<'i> for RuleParser {
    type Prelude = String;
    type QualifiedRule = CssRule;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<String, ParseError<'i, ()>> {
        let selector = normalized_text(input);
        if selector.is_empty() {
            return Err(input.new_custom_error(()));
        }
        Ok(selector)
    }

    fn parse_block<'t>(
        &mut self,
        selector: String,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<CssRule, ParseError<'i, ()>> {
        Ok(CssRule::Style(StyleRule {
            selector,
            declarations: declaration_list(input),
        }))
    }
}

impl<'i> AtRuleParser<'i> for RuleParser {
    type Prelude = AtPrelude;
    type AtRule = CssRule;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<AtPrelude, ParseError<'i, ()>> {
        Ok(AtPrelude {
            name: name.to_ascii_lowercase(),
            text: normalized_text(input),
        })
    }

    fn rule_without_block(
        &mut self,
        prelude: AtPrelude,
        _start: &ParserState,
    ) -> Result<CssRule, ()> {
        Ok(CssRule::Other(AtRule {
            text: format!("{};", prelude.head()),
            name: prelude.name,
        }))
    }

    fn parse_block<'t>(
        &mut self,
        prelude: AtPrelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<CssRule, ParseError<'i, ()>> {
        let rule = match GroupKind::from_keyword(&prelude.name) {
            Some(kind) => CssRule::Group(GroupRule {
                kind,
                condition: prelude.text,
                rules: rule_list(input),
            }),
            None => CssRule::Other(AtRule {
                text: format!("{} {{ {} }}", prelude.head(), normalized_text(input)),
                name: prelude.name,
            }),
        };
        Ok(rule)
    }
}

/// Declarations of a style rule body or a `style` attribute.
struct DeclarationListParser;

impl<'i> DeclarationParser<'i> for DeclarationListParser {
    type Declaration = Declaration;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Declaration, ParseError<'i, ()>> {
        let mut value = String::new();
        let mut important = false;
        loop {
            let bang = input.try_parse(|i| {
                parse_important(i)?;
                i.expect_exhausted()
            });
            if bang.is_ok() {
                important = true;
                break;
            }
            if !push_token(input, &mut value) {
                break;
            }
        }

        let value = collapse_whitespace(&value);
        if value.is_empty() {
            return Err(input.new_custom_error(()));
        }
        let property = if name.starts_with("--") {
            String::from(&*name)
        } else {
            name.to_ascii_lowercase()
        };
        Ok(Declaration {
            property,
            value,
            important,
        })
    }
}

impl<'i> QualifiedRuleParser<'i> for DeclarationListParser {
    type Prelude = ();
    type QualifiedRule = Declaration;
    type Error = ();
}

impl<'i> AtRuleParser<'i> for DeclarationListParser {
    type Prelude = ();
    type AtRule = Declaration;
    type Error = ();
}

impl<'i> RuleBodyItemParser<'i, Declaration, ()> for DeclarationListParser {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        true
    }
}

/// Source text of the rest of `input`, comments dropped and whitespace
/// collapsed.
fn normalized_text(input: &mut Parser<'_, '_>) -> String {
    let mut text = String::new();
    while push_token(input, &mut text) {}
    collapse_whitespace(&text)
}

/// Append the source text of the next token, a nested block whole. A
/// comment becomes a single space. Returns false at the end of the input.
fn push_token(input: &mut Parser<'_, '_>, text: &mut String) -> bool {
    let start = input.position();
    let opens_block = match input.next_including_whitespace_and_comments() {
        Err(_) => return false,
        Ok(Token::Comment(_)) => {
            text.push(' ');
            return true;
        }
        Ok(token) => matches!(
            token,
            Token::Function(_)
                | Token::ParenthesisBlock
                | Token::SquareBracketBlock
                | Token::CurlyBracketBlock
        ),
    };
    if opens_block {
        let _: Result<(), ParseError<()>> = input.parse_nested_block(|nested| {
            while nested.next_including_whitespace_and_comments().is_ok() {}
            Ok(())
        });
    }
    text.push_str(input.slice_from(start));
    true
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_style_rules_and_groups() {
        let sheet = Stylesheet::parse(
            r#"
/* header */
.card, .panel { color: red; margin : 0 auto !important }
@import url("x.css");
@media (max-width: 600px) {
  .card { padding: 4px; }
  @supports (display: grid) { .grid { display: grid; } }
}
@font-face { font-family: "X"; src: url(x.woff); }
a[href$=".pdf"]::after { content: "{pdf}"; }
"#,
        );

        assert_eq!(sheet.rule_count(), 5);
        let CssRule::Style(first) = &sheet.rules[0] else {
            panic!("expected style rule");
        };
        assert_eq!(first.selector, ".card, .panel");
        assert_eq!(
            first.css_text(),
            ".card, .panel { color: red; margin: 0 auto !important; }"
        );
        assert!(first.declarations[1].important);

        assert!(matches!(&sheet.rules[1], CssRule::Other(r) if r.name == "import"));

        let CssRule::Group(media) = &sheet.rules[2] else {
            panic!("expected media group");
        };
        assert_eq!(media.kind, GroupKind::Media);
        assert_eq!(media.condition, "(max-width: 600px)");
        assert_eq!(media.rules.len(), 2);
        assert!(matches!(&media.rules[1], CssRule::Group(g) if g.kind == GroupKind::Supports));

        assert!(matches!(&sheet.rules[3], CssRule::Other(r) if r.name == "font-face"));

        let CssRule::Style(last) = &sheet.rules[4] else {
            panic!("expected style rule");
        };
        assert_eq!(last.selector, r#"a[href$=".pdf"]::after"#);
        assert_eq!(last.declarations[0].value, r#""{pdf}""#);
    }

    #[test]
    fn test_malformed_rules_are_dropped() {
        let sheet = Stylesheet::parse("{ color: red; } .ok { color: blue; } @media { .a { } ");
        assert_eq!(sheet.rule_count(), 2);
        assert_eq!(sheet.rules[0].css_text(), ".ok { color: blue; }");
        assert_eq!(sheet.rules[1].css_text(), "@media { .a { } }");
    }

    #[test]
    fn test_unclosed_block_ends_with_input() {
        let sheet = Stylesheet::parse(".ok { color: blue; } .tail { color: red;");
        assert_eq!(sheet.rule_count(), 2);
        assert_eq!(sheet.rules[1].css_text(), ".tail { color: red; }");
    }

    #[test]
    fn test_comments_and_nested_rules() {
        let sheet = Stylesheet::parse(
            "/* a */ .x /* b */ > .y { color: /* c */ red; &:focus { outline: none; } margin: 0 }",
        );
        let CssRule::Style(rule) = &sheet.rules[0] else {
            panic!("expected style rule");
        };
        assert_eq!(rule.selector, ".x > .y");
        assert_eq!(rule.css_text(), ".x > .y { color: red; margin: 0; }");
    }

    #[test]
    fn test_declarations() {
        let decls = parse_declarations(
            "COLOR: Red; --Brand-Color: #333; background: url('a;b.png'); ; bad; width:",
        );
        assert_eq!(decls.len(), 3);
        assert_eq!(decls[0].property, "color");
        assert_eq!(decls[0].value, "Red");
        assert_eq!(decls[1].property, "--Brand-Color");
        assert!(decls[1].is_custom_property());
        assert_eq!(decls[2].value, "url('a;b.png')");
    }
}
