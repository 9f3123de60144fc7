//! Endpoint template parser
//!
//! Grammar:
//!
//! ```text
//! template  := path ["?" query]
//! path      := segment ("/" segment)*
//! segment   := literal | variable [suffix]
//! query     := pair ("&" pair)*
//! pair      := key ["=" (literal | variable [suffix])]
//! variable  := "{" name flag* [":" default] "}"
//! flag      := "?"            optional
//!            | ","            split
//! ```
//!
//! Separators only count outside braces, so names may contain `&` and `/`.
//! A backslash escapes the following character anywhere in the template.

use super::types::{EndpointTemplate, TemplateComponent};
use crate::error::{Error, Result};

/// A character of the template with its escape status
#[derive(Debug, Clone, Copy)]
struct Tok {
    pos: usize,
    ch: char,
    escaped: bool,
}

impl Tok {
    fn is(&self, c: char) -> bool {
        !self.escaped && self.ch == c
    }
}

/// Parse an endpoint template string
pub fn parse(template: &str) -> Result<EndpointTemplate> {
    let toks = tokenize(template)?;
    check_braces(template, &toks)?;

    let (path_toks, query_toks) = match find_outside_braces(&toks, '?') {
        Some(idx) => (&toks[..idx], Some(&toks[idx + 1..])),
        None => (&toks[..], None),
    };

    let mut parsed = EndpointTemplate::default();

    for segment in split_outside_braces(path_toks, '/') {
        if segment.is_empty() {
            continue;
        }
        parsed.path.push(parse_part(template, segment)?);
    }

    if let Some(query_toks) = query_toks {
        for pair in split_outside_braces(query_toks, '&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = match find_outside_braces(pair, '=') {
                Some(idx) => (&pair[..idx], &pair[idx + 1..]),
                None => (pair, &pair[pair.len()..]),
            };
            let name = text(key);
            if name.is_empty() {
                return Err(Error::template_syntax(
                    template,
                    pair[0].pos,
                    "query parameter without a name",
                ));
            }
            let component = if value.is_empty() {
                TemplateComponent::literal("")
            } else {
                parse_part(template, value)?
            };
            parsed.set_query(name, component);
        }
    }

    Ok(parsed)
}

/// Split the raw template into tokens, resolving backslash escapes
fn tokenize(template: &str) -> Result<Vec<Tok>> {
    let mut toks = Vec::with_capacity(template.len());
    let mut chars = template.char_indices();

    while let Some((pos, ch)) = chars.next() {
        if ch == '\\' {
            let (_, next) = chars
                .next()
                .ok_or_else(|| Error::template_syntax(template, pos, "dangling escape"))?;
            toks.push(Tok {
                pos,
                ch: next,
                escaped: true,
            });
        } else {
            toks.push(Tok {
                pos,
                ch,
                escaped: false,
            });
        }
    }

    Ok(toks)
}

/// Reject nested, unopened or unclosed braces
fn check_braces(template: &str, toks: &[Tok]) -> Result<()> {
    let mut open: Option<usize> = None;

    for tok in toks {
        if tok.is('{') {
            if open.is_some() {
                return Err(Error::template_syntax(template, tok.pos, "nested '{'"));
            }
            open = Some(tok.pos);
        } else if tok.is('}') {
            if open.is_none() {
                return Err(Error::template_syntax(template, tok.pos, "unmatched '}'"));
            }
            open = None;
        }
    }

    match open {
        Some(pos) => Err(Error::template_syntax(template, pos, "unclosed '{'")),
        None => Ok(()),
    }
}

fn find_outside_braces(toks: &[Tok], sep: char) -> Option<usize> {
    let mut inside = false;
    for (idx, tok) in toks.iter().enumerate() {
        if tok.is('{') {
            inside = true;
        } else if tok.is('}') {
            inside = false;
        } else if !inside && tok.is(sep) {
            return Some(idx);
        }
    }
    None
}

fn split_outside_braces(toks: &[Tok], sep: char) -> Vec<&[Tok]> {
    let mut parts = Vec::new();
    let mut rest = toks;
    while let Some(idx) = find_outside_braces(rest, sep) {
        parts.push(&rest[..idx]);
        rest = &rest[idx + 1..];
    }
    parts.push(rest);
    parts
}

fn text(toks: &[Tok]) -> String {
    toks.iter().map(|t| t.ch).collect()
}

/// Parse a path segment or query value
fn parse_part(template: &str, toks: &[Tok]) -> Result<TemplateComponent> {
    let Some(first) = toks.first() else {
        return Ok(TemplateComponent::literal(""));
    };

    if !first.is('{') {
        if let Some(brace) = toks.iter().find(|t| t.is('{')) {
            return Err(Error::template_syntax(
                template,
                brace.pos,
                "a variable must start its segment",
            ));
        }
        return Ok(TemplateComponent::literal(text(toks)));
    }

    // Braces are balanced and never nested, so the first '}' closes.
    let close = toks
        .iter()
        .position(|t| t.is('}'))
        .ok_or_else(|| Error::template_syntax(template, first.pos, "unclosed '{'"))?;

    let mut component = parse_variable(template, first.pos, &toks[1..close])?;

    let suffix = &toks[close + 1..];
    if let Some(brace) = suffix.iter().find(|t| t.is('{')) {
        return Err(Error::template_syntax(
            template,
            brace.pos,
            "only one variable is allowed per segment",
        ));
    }
    if !suffix.is_empty() {
        component.extension_suffix = Some(text(suffix));
    }

    Ok(component)
}

/// Parse the inside of `{...}`
fn parse_variable(template: &str, open_pos: usize, inner: &[Tok]) -> Result<TemplateComponent> {
    let name_end = inner
        .iter()
        .position(|t| t.is('?') || t.is(',') || t.is(':'))
        .unwrap_or(inner.len());

    let name = text(&inner[..name_end]);
    if name.trim().is_empty() {
        return Err(Error::template_syntax(
            template,
            open_pos,
            "variable name is empty",
        ));
    }

    let mut component = TemplateComponent::variable(name);
    let mut optional = false;
    let mut idx = name_end;

    while idx < inner.len() {
        let tok = inner[idx];
        if tok.is('?') {
            optional = true;
        } else if tok.is(',') {
            component.split = true;
        } else if tok.is(':') {
            let default = &inner[idx + 1..];
            if default.iter().any(|t| t.is(',')) {
                component.split = true;
            }
            component.default_value = Some(text(default));
            break;
        } else {
            return Err(Error::template_syntax(
                template,
                tok.pos,
                format!("unexpected '{}' after variable name", tok.ch),
            ));
        }
        idx += 1;
    }

    component.required = !optional && component.default_value.is_none();
    Ok(component)
}
