//! Binds user-supplied tokens to a command's declared parameters.

use std::collections::BTreeMap;

use crate::descriptor::{ArgKind, Bindings, Parameter};
use crate::error::DispatchError;
use crate::handler::RESERVED_PARAMETERS;
use crate::token::Token;

/// Match `positional` and `keyword` tokens against `parameters`.
///
/// Positional tokens pair with parameters in declaration order. Keywords
/// then fill parameters by name. Parameters left unbound must have a
/// default or be optional. Defaults are not filled here.
pub fn bind(
    parameters: &[Parameter],
    positional: &[Token],
    keyword: &BTreeMap<String, Token>,
) -> Result<Bindings, DispatchError> {
    let mut bindings = Bindings::new();

    for (index, token) in positional.iter().enumerate() {
        let Some(parameter) = parameters.get(index) else {
            return Err(DispatchError::SuperfluousArguments {
                first: token.to_string(),
            });
        };
        bindings.insert(parameter.name, coerce(parameter, token)?);
    }

    for (name, token) in keyword {
        if RESERVED_PARAMETERS.contains(&name.as_str()) {
            return Err(DispatchError::IllegalArgument { name: name.clone() });
        }
        if bindings.contains(name) {
            return Err(DispatchError::DuplicateArgument { name: name.clone() });
        }
        let Some(parameter) = parameters.iter().find(|p| p.name == name.as_str()) else {
            return Err(DispatchError::UnknownArgument { name: name.clone() });
        };
        bindings.insert(parameter.name, coerce(parameter, token)?);
    }

    if let Some(missing) = parameters
        .iter()
        .find(|p| p.is_required() && !bindings.contains(p.name))
    {
        return Err(DispatchError::MissingArgument {
            name: missing.name.to_string(),
            kind: missing.kind,
        });
    }

    Ok(bindings)
}

/// Check one token against one parameter.
fn coerce(parameter: &Parameter, token: &Token) -> Result<Token, DispatchError> {
    match (parameter.kind, token) {
        (ArgKind::Flag(literals), Token::Flag(name)) => {
            if literals.contains(&name.as_str()) {
                Ok(token.clone())
            } else {
                Err(DispatchError::InvalidEnumLiteral {
                    name: parameter.name.to_string(),
                    literals: literals.to_vec(),
                })
            }
        }
        (kind, token) if kind.token_kind() == token.kind() => Ok(token.clone()),
        (kind, token) => Err(DispatchError::TypeMismatch {
            name: parameter.name.to_string(),
            expected: kind,
            actual: token.kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    const STYLES: &[&str] = &["plain", "bold"];

    fn params() -> Vec<Parameter> {
        vec![
            Parameter::required("text", ArgKind::Str),
            Parameter::required("count", ArgKind::Number),
            Parameter::optional("style", ArgKind::Flag(STYLES)),
            Parameter::with_default("target", ArgKind::Word, Token::Word("room".into())),
        ]
    }

    fn s(text: &str) -> Token {
        Token::Str(text.to_string())
    }

    fn no_keywords() -> BTreeMap<String, Token> {
        BTreeMap::new()
    }

    #[test]
    fn test_required_positionals_bind() {
        let bindings = bind(&params(), &[s("hi"), Token::Number(2.0)], &no_keywords()).unwrap();
        assert_eq!(bindings.get("text"), Some(&s("hi")));
        assert_eq!(bindings.get("count"), Some(&Token::Number(2.0)));
        assert!(!bindings.contains("style"));
        assert!(!bindings.contains("target"));
    }

    #[test]
    fn test_missing_names_last_required() {
        let err = bind(&params(), &[s("hi")], &no_keywords()).unwrap_err();
        assert_eq!(
            err,
            DispatchError::MissingArgument {
                name: "count".into(),
                kind: ArgKind::Number,
            }
        );
        assert_eq!(
            err.to_string(),
            "Argument `count` not provided, expected a value of type **NUMBER**."
        );
    }

    #[test]
    fn test_superfluous() {
        let tokens = [
            s("hi"),
            Token::Number(2.0),
            Token::Flag("bold".into()),
            Token::Word("x".into()),
            Token::Number(9.0),
        ];
        let err = bind(&params(), &tokens, &no_keywords()).unwrap_err();
        assert_eq!(
            err,
            DispatchError::SuperfluousArguments { first: "9".into() }
        );
    }

    #[test]
    fn test_enum_literals() {
        let ok = bind(
            &params(),
            &[s("hi"), Token::Number(1.0), Token::Flag("bold".into())],
            &no_keywords(),
        )
        .unwrap();
        assert_eq!(ok.get("style"), Some(&Token::Flag("bold".into())));

        let err = bind(
            &params(),
            &[s("hi"), Token::Number(1.0), Token::Flag("Bold".into())],
            &no_keywords(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DispatchError::InvalidEnumLiteral {
                name: "style".into(),
                literals: vec!["plain", "bold"],
            }
        );

        let err = bind(
            &params(),
            &[s("hi"), Token::Number(1.0), s("bold")],
            &no_keywords(),
        )
        .unwrap_err();
        assert!(matches!(err, DispatchError::TypeMismatch { .. }));
    }

    #[test]
    fn test_type_mismatch() {
        let err = bind(&params(), &[Token::Word("hi".into())], &no_keywords()).unwrap_err();
        assert_eq!(
            err,
            DispatchError::TypeMismatch {
                name: "text".into(),
                expected: ArgKind::Str,
                actual: TokenKind::Word,
            }
        );
    }

    #[test]
    fn test_keywords() {
        let mut keyword = BTreeMap::new();
        keyword.insert("count".to_string(), Token::Number(3.0));
        keyword.insert("style".to_string(), Token::Flag("plain".into()));
        let bindings = bind(&params(), &[s("hi")], &keyword).unwrap();
        assert_eq!(bindings.get("count"), Some(&Token::Number(3.0)));
        assert_eq!(bindings.get("style"), Some(&Token::Flag("plain".into())));
    }

    #[test]
    fn test_keyword_errors() {
        let positional = [s("hi"), Token::Number(1.0)];

        let mut keyword = BTreeMap::new();
        keyword.insert("text".to_string(), s("again"));
        assert_eq!(
            bind(&params(), &positional, &keyword).unwrap_err(),
            DispatchError::DuplicateArgument {
                name: "text".into()
            }
        );

        let mut keyword = BTreeMap::new();
        keyword.insert("colour".to_string(), s("red"));
        assert_eq!(
            bind(&params(), &positional, &keyword).unwrap_err(),
            DispatchError::UnknownArgument {
                name: "colour".into()
            }
        );

        for reserved in ["event", "current_user"] {
            let mut keyword = BTreeMap::new();
            keyword.insert(reserved.to_string(), s("x"));
            assert_eq!(
                bind(&params(), &positional, &keyword).unwrap_err(),
                DispatchError::IllegalArgument {
                    name: reserved.into()
                }
            );
        }
    }

    #[test]
    fn test_no_parameters() {
        assert!(bind(&[], &[], &no_keywords()).unwrap().is_empty());
        let err = bind(&[], &[Token::Flag("x".into())], &no_keywords()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Superfluous arguments supplied starting at `x`."
        );
    }
}
