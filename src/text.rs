// Pipeline text codec
//
// Grammar:
//
//   pipeline    := anchor "(" passList ")"
//   passList    := element ("," element)*
//   element     := anchor "(" passList ")" | passArg ["{" optionList "}"]
//   optionList  := option ("," option)*
//   option      := key "=" value
//   anchor      := identifier (dialect-qualified, dot-separated) | "any"
//
// Printing (the `Display` impls in `manager`) is the exact inverse: options
// are always rendered in declaration order and no whitespace is emitted, so
// `print(parse(s)) == s` for canonically formatted `s`.

use thiserror::Error;

use crate::diag::DiagnosticSink;
use crate::manager::OpPassManager;
use crate::registry::{PassRegistry, RegistryEntry};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("malformed pass pipeline")]
    MalformedPipeline,

    #[error("'{0}' does not refer to a registered pass or pass pipeline")]
    UnknownPassOrPipeline(String),
}

/// Parses a full anchored pipeline description into a fresh pipeline.
///
/// The entire text must be wrapped as `anchor(passList)`. All diagnostic
/// text is routed through `sink`.
pub fn parse_pipeline(
    text: &str,
    registry: &PassRegistry,
    sink: &mut dyn DiagnosticSink,
) -> Result<OpPassManager, PipelineError> {
    let mut cursor = Cursor::new(text);
    cursor.skip_whitespace();
    let anchor = cursor.take_token();
    cursor.skip_whitespace();
    if anchor.is_empty() || !cursor.eat('(') {
        sink.report("expected pass pipeline to be wrapped with the anchor operation type");
        return Err(PipelineError::MalformedPipeline);
    }

    let mut pipeline = OpPassManager::new(anchor);
    parse_pass_list(&mut cursor, &mut pipeline, registry, sink)?;
    if !cursor.eat(')') {
        sink.report("expected ')' to close the pipeline anchor");
        return Err(PipelineError::MalformedPipeline);
    }
    cursor.skip_whitespace();
    if !cursor.at_end() {
        sink.report("unexpected characters after the pipeline");
        return Err(PipelineError::MalformedPipeline);
    }
    Ok(pipeline)
}

/// Parses `text` as a bare pass-list and appends it to `pipeline`. Used by
/// `OpPassManager::add_pipeline`, which stages the append so a parse error
/// leaves the target untouched.
pub(crate) fn parse_pass_list_into(
    pipeline: &mut OpPassManager,
    text: &str,
    registry: &PassRegistry,
    sink: &mut dyn DiagnosticSink,
) -> Result<(), PipelineError> {
    let mut cursor = Cursor::new(text);
    parse_pass_list(&mut cursor, pipeline, registry, sink)?;
    cursor.skip_whitespace();
    if !cursor.at_end() {
        sink.report("unexpected characters after the pass list");
        return Err(PipelineError::MalformedPipeline);
    }
    Ok(())
}

fn parse_pass_list(
    cursor: &mut Cursor<'_>,
    pipeline: &mut OpPassManager,
    registry: &PassRegistry,
    sink: &mut dyn DiagnosticSink,
) -> Result<(), PipelineError> {
    cursor.skip_whitespace();
    // An empty list is valid: empty managers print as `anchor()` and must
    // parse back.
    if cursor.at_end() || cursor.peek() == Some(')') {
        return Ok(());
    }
    loop {
        parse_element(cursor, pipeline, registry, sink)?;
        cursor.skip_whitespace();
        if !cursor.eat(',') {
            return Ok(());
        }
    }
}

fn parse_element(
    cursor: &mut Cursor<'_>,
    pipeline: &mut OpPassManager,
    registry: &PassRegistry,
    sink: &mut dyn DiagnosticSink,
) -> Result<(), PipelineError> {
    cursor.skip_whitespace();
    let token = cursor.take_token();
    if token.is_empty() {
        sink.report("expected a pass argument or a nested anchor");
        return Err(PipelineError::MalformedPipeline);
    }
    cursor.skip_whitespace();

    // A parenthesized token is a nested scope. Nested scopes parsed from
    // text always append as written, so sibling scopes with the same anchor
    // survive a print/parse round trip.
    if cursor.eat('(') {
        let mut nested = OpPassManager::new(token);
        parse_pass_list(cursor, &mut nested, registry, sink)?;
        if !cursor.eat(')') {
            sink.report("expected ')' to close a nested pipeline");
            return Err(PipelineError::MalformedPipeline);
        }
        pipeline.push_nested(nested);
        return Ok(());
    }

    match registry.get(token) {
        None => {
            sink.report(&format!(
                "'{token}' does not refer to a registered pass or pass pipeline"
            ));
            Err(PipelineError::UnknownPassOrPipeline(token.to_string()))
        }
        Some(RegistryEntry::Pass(factory)) => {
            let mut pass = factory();
            if cursor.eat('{') {
                parse_options(cursor, pass.as_mut(), sink)?;
            }
            pipeline.add_pass(pass).map_err(|err| {
                sink.report(&err.to_string());
                PipelineError::MalformedPipeline
            })
        }
        Some(RegistryEntry::Pipeline(builder)) => builder(pipeline).map_err(|err| {
            sink.report(&err.to_string());
            PipelineError::MalformedPipeline
        }),
    }
}

fn parse_options(
    cursor: &mut Cursor<'_>,
    pass: &mut dyn crate::pass::Pass,
    sink: &mut dyn DiagnosticSink,
) -> Result<(), PipelineError> {
    loop {
        cursor.skip_whitespace();
        let key = cursor.take_token();
        if key.is_empty() {
            sink.report("expected an option key");
            return Err(PipelineError::MalformedPipeline);
        }
        cursor.skip_whitespace();
        if !cursor.eat('=') {
            sink.report(&format!("expected '=' after option '{key}'"));
            return Err(PipelineError::MalformedPipeline);
        }
        let value = cursor.take_option_value();
        if let Err(err) = pass.set_option(key, value) {
            sink.report(&format!("in pass '{}': {err}", pass.argument()));
            return Err(PipelineError::MalformedPipeline);
        }
        cursor.skip_whitespace();
        if cursor.eat(',') {
            continue;
        }
        if cursor.eat('}') {
            return Ok(());
        }
        sink.report("expected ',' or '}' in option list");
        return Err(PipelineError::MalformedPipeline);
    }
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.text[start..self.pos]
    }

    /// A pass argument, anchor, or option key: alphanumerics plus `-`, `_`
    /// and the `.` of dialect-qualified names.
    fn take_token(&mut self) -> &'a str {
        self.take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    }

    /// An option value: everything up to the next structural delimiter.
    fn take_option_value(&mut self) -> &'a str {
        self.take_while(|c| !matches!(c, ',' | '}' | '{' | '(' | ')'))
    }
}
