//! Query value type.
//!
//! Queries reach this crate already parsed: a combining operator over a
//! list of terms, each with its within-query frequency (wqf).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::TermCount;

/// How the terms of a query combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueryOperator {
    /// A document matches if it contains any term.
    #[default]
    Or,
    /// A document matches only if it contains every term.
    And,
}

/// A term of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTerm {
    /// The term text, already normalized.
    pub term: String,
    /// Within-query frequency.
    pub wqf: TermCount,
}

/// A flat query over terms.
///
/// Adding a term that is already present raises its wqf instead of adding
/// a second entry, so [`Query::terms`] lists unique terms in the order they
/// first appeared.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Query {
    operator: QueryOperator,
    terms: Vec<QueryTerm>,
}

impl Query {
    /// Create an empty query with the given operator.
    pub fn new(operator: QueryOperator) -> Self {
        Query {
            operator,
            terms: Vec::new(),
        }
    }

    /// A single-term query.
    pub fn term<S: Into<String>>(term: S) -> Self {
        let mut query = Query::new(QueryOperator::Or);
        query.add_term(term, 1);
        query
    }

    /// OR over `terms`.
    pub fn or<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Query::from_terms(QueryOperator::Or, terms)
    }

    /// AND over `terms`.
    pub fn and<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Query::from_terms(QueryOperator::And, terms)
    }

    fn from_terms<I, S>(operator: QueryOperator, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut query = Query::new(operator);
        for term in terms {
            query.add_term(term, 1);
        }
        query
    }

    /// Add `wqf` occurrences of a term.
    pub fn add_term<S: Into<String>>(&mut self, term: S, wqf: TermCount) {
        let term = term.into();
        match self.terms.iter_mut().find(|t| t.term == term) {
            Some(existing) => existing.wqf += wqf,
            None => self.terms.push(QueryTerm { term, wqf }),
        }
    }

    /// Builder form of [`Query::add_term`].
    pub fn with_term<S: Into<String>>(mut self, term: S, wqf: TermCount) -> Self {
        self.add_term(term, wqf);
        self
    }

    /// The combining operator.
    pub fn operator(&self) -> QueryOperator {
        self.operator
    }

    /// Unique terms in query order.
    pub fn terms(&self) -> &[QueryTerm] {
        &self.terms
    }

    /// Whether `term` is part of the query.
    pub fn contains_term(&self, term: &str) -> bool {
        self.terms.iter().any(|t| t.term == term)
    }

    /// Query length: the sum of all wqfs.
    pub fn length(&self) -> TermCount {
        self.terms.iter().map(|t| t.wqf).sum()
    }

    /// Whether the query has no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Get a human-readable description of this query.
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = match self.operator {
            QueryOperator::Or => " OR ",
            QueryOperator::And => " AND ",
        };
        let parts: Vec<String> = self
            .terms
            .iter()
            .map(|t| {
                if t.wqf == 1 {
                    t.term.clone()
                } else {
                    format!("{}#{}", t.term, t.wqf)
                }
            })
            .collect();
        write!(f, "Query({})", parts.join(sep))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_terms_raise_wqf() {
        let query = Query::or(["rust", "search", "rust"]);
        assert_eq!(query.terms().len(), 2);
        assert_eq!(query.terms()[0].term, "rust");
        assert_eq!(query.terms()[0].wqf, 2);
        assert_eq!(query.length(), 3);
    }

    #[test]
    fn test_description() {
        let query = Query::and(["a", "b"]).with_term("a", 1);
        assert_eq!(query.operator(), QueryOperator::And);
        assert_eq!(query.description(), "Query(a#2 AND b)");
        assert!(query.contains_term("b"));
        assert!(!Query::new(QueryOperator::Or).contains_term("b"));
        assert!(Query::default().is_empty());
    }
}
