//! Built-in providers used by the demo binary and the test suite.
//!
//! Two tools: `add` sums two numbers, `calculator` evaluates an infix
//! arithmetic expression with standard precedence. Resources and prompts
//! are small static tables. Real deployments substitute their own
//! implementations of the provider traits.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::{
    ContentBlock, PromptContent, PromptDescriptor, PromptMessage, PromptProvider,
    ResourceContents, ResourceDescriptor, ResourceProvider, ToolDescriptor, ToolOutput,
    ToolProvider,
};
use crate::protocol::jsonrpc::dispatcher::RequestContext;
use crate::protocol::jsonrpc::error::JsonRpcError;

/// Formats a numeric result the way the calculator reports it: integers
/// without a fractional part, everything else as-is.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// The built-in tool set.
#[derive(Debug, Default)]
pub struct BuiltinTools;

#[async_trait]
impl ToolProvider for BuiltinTools {
    fn list(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor {
                name: "add".to_string(),
                description: "Add two numbers".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "a": {"type": "number"},
                        "b": {"type": "number"}
                    },
                    "required": ["a", "b"]
                }),
            },
            ToolDescriptor {
                name: "calculator".to_string(),
                description: "Evaluate an arithmetic expression".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "expression": {"type": "string"}
                    },
                    "required": ["expression"]
                }),
            },
        ]
    }

    async fn call(
        &self,
        name: &str,
        arguments: Value,
        _ctx: &RequestContext,
    ) -> Result<ToolOutput, JsonRpcError> {
        match name {
            "add" => {
                let a = number_arg(&arguments, "a")?;
                let b = number_arg(&arguments, "b")?;
                Ok(ToolOutput::text(format_number(a + b)))
            }
            "calculator" => {
                let expression = arguments
                    .get("expression")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        JsonRpcError::invalid_params("expression must be a string")
                    })?;
                match eval_expression(expression) {
                    Ok(result) => Ok(ToolOutput::text(format_number(result))),
                    Err(msg) => Ok(ToolOutput::error(msg)),
                }
            }
            other => Err(JsonRpcError::invalid_params(format!(
                "Unknown tool: {}",
                other
            ))),
        }
    }
}

fn number_arg(arguments: &Value, key: &str) -> Result<f64, JsonRpcError> {
    arguments
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| JsonRpcError::invalid_params(format!("{} must be a number", key)))
}

/// Evaluates `+ - * /` infix arithmetic with parentheses.
///
/// Recursive descent, two precedence levels. Errors are reported as plain
/// strings because a bad expression is a tool-level failure, not a
/// protocol error.
fn eval_expression(input: &str) -> Result<f64, String> {
    let tokens = tokenize(input)?;
    let mut pos = 0;
    let value = parse_sum(&tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err(format!("Unexpected token at position {}", pos));
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Open,
    Close,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid number: {}", literal))?;
                tokens.push(Token::Number(value));
            }
            other => return Err(format!("Invalid character: {}", other)),
        }
    }

    Ok(tokens)
}

fn parse_sum(tokens: &[Token], pos: &mut usize) -> Result<f64, String> {
    let mut left = parse_product(tokens, pos)?;
    while let Some(op) = tokens.get(*pos) {
        match op {
            Token::Plus => {
                *pos += 1;
                left += parse_product(tokens, pos)?;
            }
            Token::Minus => {
                *pos += 1;
                left -= parse_product(tokens, pos)?;
            }
            _ => break,
        }
    }
    Ok(left)
}

fn parse_product(tokens: &[Token], pos: &mut usize) -> Result<f64, String> {
    let mut left = parse_atom(tokens, pos)?;
    while let Some(op) = tokens.get(*pos) {
        match op {
            Token::Star => {
                *pos += 1;
                left *= parse_atom(tokens, pos)?;
            }
            Token::Slash => {
                *pos += 1;
                let right = parse_atom(tokens, pos)?;
                if right == 0.0 {
                    return Err("Division by zero".to_string());
                }
                left /= right;
            }
            _ => break,
        }
    }
    Ok(left)
}

fn parse_atom(tokens: &[Token], pos: &mut usize) -> Result<f64, String> {
    match tokens.get(*pos) {
        Some(Token::Number(n)) => {
            *pos += 1;
            Ok(*n)
        }
        Some(Token::Minus) => {
            *pos += 1;
            Ok(-parse_atom(tokens, pos)?)
        }
        Some(Token::Open) => {
            *pos += 1;
            let value = parse_sum(tokens, pos)?;
            match tokens.get(*pos) {
                Some(Token::Close) => {
                    *pos += 1;
                    Ok(value)
                }
                _ => Err("Missing closing parenthesis".to_string()),
            }
        }
        _ => Err("Expected a number".to_string()),
    }
}

/// A static in-memory resource table.
#[derive(Debug)]
pub struct StaticResources {
    entries: Vec<(ResourceDescriptor, String)>,
    subscriptions: Mutex<HashSet<String>>,
}

impl StaticResources {
    /// Creates a resource table from (uri, name, mime type, text) entries.
    pub fn new(entries: Vec<(&str, &str, &str, &str)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(uri, name, mime, text)| {
                    (
                        ResourceDescriptor {
                            uri: uri.to_string(),
                            name: name.to_string(),
                            mime_type: mime.to_string(),
                        },
                        text.to_string(),
                    )
                })
                .collect(),
            subscriptions: Mutex::new(HashSet::new()),
        }
    }

    /// The sample table the demo binary serves.
    pub fn sample() -> Self {
        Self::new(vec![(
            "memo://server/readme",
            "Server readme",
            "text/plain",
            "Makai MCP protocol engine demo resource.",
        )])
    }

    fn find(&self, uri: &str) -> Option<&(ResourceDescriptor, String)> {
        self.entries.iter().find(|(d, _)| d.uri == uri)
    }
}

#[async_trait]
impl ResourceProvider for StaticResources {
    fn list(&self) -> Vec<ResourceDescriptor> {
        self.entries.iter().map(|(d, _)| d.clone()).collect()
    }

    async fn read(&self, uri: &str) -> Result<ResourceContents, JsonRpcError> {
        match self.find(uri) {
            Some((descriptor, text)) => Ok(ResourceContents {
                uri: descriptor.uri.clone(),
                mime_type: descriptor.mime_type.clone(),
                text: text.clone(),
            }),
            None => Err(JsonRpcError::invalid_params(format!(
                "Unknown resource: {}",
                uri
            ))),
        }
    }

    async fn subscribe(&self, uri: &str) -> Result<(), JsonRpcError> {
        if self.find(uri).is_none() {
            return Err(JsonRpcError::invalid_params(format!(
                "Unknown resource: {}",
                uri
            )));
        }
        self.subscriptions.lock().insert(uri.to_string());
        Ok(())
    }

    async fn unsubscribe(&self, uri: &str) -> Result<(), JsonRpcError> {
        self.subscriptions.lock().remove(uri);
        Ok(())
    }
}

/// A static prompt table.
#[derive(Debug, Default)]
pub struct StaticPrompts;

#[async_trait]
impl PromptProvider for StaticPrompts {
    fn list(&self) -> Vec<PromptDescriptor> {
        vec![PromptDescriptor {
            name: "summarize".to_string(),
            description: "Summarize the given text".to_string(),
        }]
    }

    async fn get(&self, name: &str, arguments: Value) -> Result<PromptContent, JsonRpcError> {
        match name {
            "summarize" => {
                let text = arguments
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                Ok(PromptContent {
                    description: "Summarize the given text".to_string(),
                    messages: vec![PromptMessage {
                        role: "user".to_string(),
                        content: ContentBlock::text(format!(
                            "Please summarize the following text:\n\n{}",
                            text
                        )),
                    }],
                })
            }
            other => Err(JsonRpcError::invalid_params(format!(
                "Unknown prompt: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn ctx() -> RequestContext {
        RequestContext::default()
    }

    #[tokio::test]
    async fn test_add_tool() {
        let tools = BuiltinTools;
        let output = tools
            .call("add", json!({"a": 10, "b": 20}), &ctx())
            .await
            .unwrap();
        assert_eq!(output.content, vec![ContentBlock::text("30")]);
        assert!(!output.is_error);
    }

    #[tokio::test]
    async fn test_add_tool_rejects_missing_args() {
        let tools = BuiltinTools;
        let err = tools.call("add", json!({"a": 10}), &ctx()).await.unwrap_err();
        assert_eq!(err.code, -32602);
    }

    #[tokio::test]
    async fn test_calculator_precedence() {
        let tools = BuiltinTools;
        let output = tools
            .call("calculator", json!({"expression": "2 + 3 * 4"}), &ctx())
            .await
            .unwrap();
        assert_eq!(output.content, vec![ContentBlock::text("14")]);
    }

    #[test_case("(2 + 3) * 4 / 2", "10")]
    #[test_case("-3 + 5", "2")]
    #[test_case("10 / 4", "2.5")]
    #[test_case("2 * (3 + 4) - 1", "13")]
    #[test_case("  7  ", "7")]
    fn test_eval_expression(expression: &str, expected: &str) {
        assert_eq!(format_number(eval_expression(expression).unwrap()), expected);
    }

    #[test_case("2 +"; "dangling operator")]
    #[test_case("(1 + 2"; "unclosed parenthesis")]
    #[test_case("1 $ 2"; "invalid character")]
    #[test_case(""; "empty expression")]
    fn test_eval_expression_rejects(expression: &str) {
        assert!(eval_expression(expression).is_err());
    }

    #[tokio::test]
    async fn test_calculator_division_by_zero_is_tool_error() {
        let tools = BuiltinTools;
        let output = tools
            .call("calculator", json!({"expression": "1 / 0"}), &ctx())
            .await
            .unwrap();
        assert!(output.is_error);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_invalid_params() {
        let tools = BuiltinTools;
        let err = tools.call("nope", json!({}), &ctx()).await.unwrap_err();
        assert_eq!(err.code, -32602);
    }

    #[tokio::test]
    async fn test_resource_read_and_subscribe() {
        let resources = StaticResources::sample();
        let listed = resources.list();
        assert_eq!(listed.len(), 1);

        let contents = resources.read(&listed[0].uri).await.unwrap();
        assert!(contents.text.contains("demo resource"));

        resources.subscribe(&listed[0].uri).await.unwrap();
        resources.unsubscribe(&listed[0].uri).await.unwrap();

        let err = resources.read("memo://missing").await.unwrap_err();
        assert_eq!(err.code, -32602);
    }

    #[tokio::test]
    async fn test_prompt_expansion() {
        let prompts = StaticPrompts;
        let content = prompts
            .get("summarize", json!({"text": "hello"}))
            .await
            .unwrap();
        assert_eq!(content.messages.len(), 1);
        match &content.messages[0].content {
            ContentBlock::Text { text } => assert!(text.contains("hello")),
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(30.0), "30");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-4.0), "-4");
    }
}
