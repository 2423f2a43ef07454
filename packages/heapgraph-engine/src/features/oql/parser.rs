// Query parser - select <expr> [from [instanceof] <class> [<ident>] [where <expr>]]
//
// Whitespace-tokenized single pass, case-sensitive keywords. Text whose
// first token is not `select` is not an error; it is a raw expression the
// executor evaluates directly.

use serde::{Deserialize, Serialize};

use crate::errors::QueryError;

/// Immutable parsed query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub select_expr: String,
    /// Candidate class; `None` runs the select expression once, unscoped.
    pub class_name: Option<String>,
    /// Match subclasses too.
    pub is_instanceof: bool,
    /// Bound variable name; present iff `class_name` is.
    pub identifier: Option<String>,
    pub where_expr: Option<String>,
}

/// Parse query text. Returns `Ok(None)` when the text is not a structured
/// query (raw-expression fallback), and a [`QueryError`] sub-kind for each
/// malformed structured query.
pub fn parse_query(text: &str) -> Result<Option<Query>, QueryError> {
    let mut tokens = text.split_whitespace();
    let Some(first) = tokens.next() else {
        return Err(QueryError::NoSelectClause);
    };
    if first != "select" {
        return Ok(None);
    }

    let mut select_parts: Vec<&str> = Vec::new();
    let mut from_seen = false;
    for token in tokens.by_ref() {
        if token == "from" {
            from_seen = true;
            break;
        }
        select_parts.push(token);
    }
    if select_parts.is_empty() {
        return Err(QueryError::EmptySelect);
    }
    let select_expr = select_parts.join(" ");

    if !from_seen {
        return Ok(Some(Query {
            select_expr,
            class_name: None,
            is_instanceof: false,
            identifier: None,
            where_expr: None,
        }));
    }

    let mut is_instanceof = false;
    let mut class_token = tokens.next().ok_or(QueryError::FromNoClassName)?;
    if class_token == "instanceof" {
        is_instanceof = true;
        class_token = tokens.next().ok_or(QueryError::InstanceofNoClassName)?;
    }

    let identifier = tokens.next().ok_or(QueryError::NoIdentifier)?;
    if identifier == "where" {
        // the identifier cannot be elided by jumping straight to `where`
        return Err(QueryError::NoIdentifier);
    }

    let where_expr = match tokens.next() {
        None => None,
        Some("where") => {
            let parts: Vec<&str> = tokens.collect();
            if parts.is_empty() {
                return Err(QueryError::EmptyWhere);
            }
            Some(parts.join(" "))
        }
        Some(other) => return Err(QueryError::ExpectingWhere(other.to_string())),
    };

    Ok(Some(Query {
        select_expr,
        class_name: Some(class_token.to_string()),
        is_instanceof,
        identifier: Some(identifier.to_string()),
        where_expr,
    }))
}
