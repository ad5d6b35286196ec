//! Positional and flag resolution over the token stream
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Rejections for optional arguments are swallowed instead of thrown
//! - 1.1.0: Single same-named option argument collapses to its value
//! - 1.0.0: Initial resolver with async transformer

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::future::Future;

use super::error::ArgumentError;
use super::lexer::{tokenize, Token, TokenKind};
use super::schema::{ArgumentSpec, OptionSpec, OptionValue, ParseResult, Schema};

/// Converts raw argument text into a domain value
///
/// `Ok(None)` means no value was produced; the argument is left unset and
/// this is not treated as an error.
#[async_trait]
pub trait Transformer<T: Send>: Send + Sync {
    async fn transform(&self, raw: &str, argument: &str, option: Option<&str>) -> Result<Option<T>>;
}

/// Pass-through transformer producing the raw text
pub struct Identity;

#[async_trait]
impl Transformer<String> for Identity {
    async fn transform(
        &self,
        raw: &str,
        _argument: &str,
        _option: Option<&str>,
    ) -> Result<Option<String>> {
        Ok(Some(raw.to_string()))
    }
}

#[async_trait]
impl<T, F, Fut> Transformer<T> for F
where
    T: Send + 'static,
    F: Fn(String, String, Option<String>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<T>>> + Send + 'static,
{
    async fn transform(&self, raw: &str, argument: &str, option: Option<&str>) -> Result<Option<T>> {
        (self)(raw.to_string(), argument.to_string(), option.map(str::to_string)).await
    }
}

/// Parse `input` against `schema` with the identity transformer
pub async fn parse_raw(input: &str, schema: &Schema) -> Result<ParseResult<String>, ArgumentError> {
    parse(input, schema, &Identity).await
}

/// Parse `input` against `schema`, coercing every value through `transformer`
///
/// Transforms are awaited one at a time in token order. Any error aborts the
/// whole parse.
pub async fn parse<T, X>(
    input: &str,
    schema: &Schema,
    transformer: &X,
) -> Result<ParseResult<T>, ArgumentError>
where
    T: Send,
    X: Transformer<T> + ?Sized,
{
    let resolver = Resolver {
        tokens: tokenize(input),
        schema,
        cursor: 0,
    };
    resolver.run(transformer).await
}

struct Resolver<'a> {
    tokens: Vec<Token>,
    schema: &'a Schema,
    cursor: usize,
}

impl Resolver<'_> {
    async fn run<T, X>(mut self, transformer: &X) -> Result<ParseResult<T>, ArgumentError>
    where
        T: Send,
        X: Transformer<T> + ?Sized,
    {
        let schema = self.schema;
        let mut out = ParseResult::default();
        let mut next_arg = 0;

        while let Some(token) = self.tokens.get(self.cursor).cloned() {
            match token.kind {
                TokenKind::ShortFlagCluster => {
                    self.cursor += 1;
                    for letter in token.value.chars() {
                        let option = schema
                            .option_by_short(letter)
                            .ok_or(ArgumentError::UnknownShortFlag(letter))?;
                        let value = self.consume_option(option, transformer).await?;
                        out.options.insert(option.name.clone(), value);
                    }
                }
                TokenKind::LongFlag => {
                    self.cursor += 1;
                    let option = schema
                        .option_by_name(&token.value)
                        .ok_or_else(|| ArgumentError::UnknownFlag(token.value.clone()))?;
                    let value = self.consume_option(option, transformer).await?;
                    out.options.insert(option.name.clone(), value);
                }
                TokenKind::Arg => {
                    let Some(spec) = schema.args.get(next_arg) else {
                        self.cursor += 1;
                        continue;
                    };
                    // An unset positional leaves the token for the next spec
                    if let Some(value) = apply(transformer, spec, None, &token.value).await? {
                        out.args.insert(spec.name.clone(), value);
                        self.cursor += 1;
                    }
                    next_arg += 1;
                }
                TokenKind::Rest => {
                    out.rest = Some(token.value);
                    self.cursor += 1;
                }
                TokenKind::Whitespace => self.cursor += 1,
            }
        }

        if let Some(option) = schema
            .options
            .iter()
            .find(|opt| opt.required && !out.options.contains_key(&opt.name))
        {
            return Err(ArgumentError::MissingOption(option.name.clone()));
        }

        if let Some(arg) = schema
            .args
            .iter()
            .find(|arg| arg.required && !out.args.contains_key(&arg.name))
        {
            return Err(ArgumentError::MissingArgument(arg.name.clone()));
        }

        Ok(out)
    }

    async fn consume_option<T, X>(
        &mut self,
        option: &OptionSpec,
        transformer: &X,
    ) -> Result<OptionValue<T>, ArgumentError>
    where
        T: Send,
        X: Transformer<T> + ?Sized,
    {
        if option.args.is_empty() {
            return Ok(OptionValue::Flag);
        }

        let mut values = HashMap::new();

        for spec in &option.args {
            let raw = match self.tokens.get(self.cursor) {
                Some(token) if token.kind == TokenKind::Arg => token.value.clone(),
                _ => {
                    if spec.required {
                        return Err(ArgumentError::MissingOptionArgument {
                            argument: spec.name.clone(),
                            option: option.name.clone(),
                        });
                    }
                    self.cursor += 1;
                    continue;
                }
            };

            let value = apply(transformer, spec, Some(&option.name), &raw).await?;
            self.cursor += 1;

            if let Some(value) = value {
                values.insert(spec.name.clone(), value);
            }
        }

        if option.collapses() {
            let value = values.into_values().next();
            return Ok(value.map_or_else(|| OptionValue::Args(HashMap::new()), OptionValue::Value));
        }

        Ok(OptionValue::Args(values))
    }
}

/// Run the transformer, swallowing rejections for optional arguments
async fn apply<T, X>(
    transformer: &X,
    spec: &ArgumentSpec,
    option: Option<&str>,
    raw: &str,
) -> Result<Option<T>, ArgumentError>
where
    T: Send,
    X: Transformer<T> + ?Sized,
{
    match transformer.transform(raw, &spec.name, option).await {
        Ok(value) => Ok(value),
        Err(cause) if spec.required => Err(ArgumentError::Transform {
            argument: spec.name.clone(),
            option: option.map(str::to_string),
            cause,
        }),
        Err(cause) => {
            debug!("Ignoring rejected optional argument `{}`: {cause}", spec.name);
            Ok(None)
        }
    }
}
