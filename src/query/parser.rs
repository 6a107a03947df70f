use chrono::{DateTime, Utc};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0, multispace1, satisfy},
    combinator::{all_consuming, map, map_res, opt, peek, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
};
use serde::{Deserialize, Serialize};
use crate::core::config::IndexConfig;
use crate::core::error::{Error, Result};
use crate::core::types::FieldValue;
use crate::query::ast::{ALL_FIELDS, BoolQuery, FuzzyQuery, PhraseQuery, PrefixQuery, Query, RangeQuery, TermQuery, WildcardQuery};

/// Query parser for Lucene-style query strings
#[derive(Debug, Clone)]
pub struct QueryParser {
    pub default_field: String,
    pub default_operator: BooleanOperator,
    pub allow_wildcards: bool,
    pub fuzzy_prefix_length: u8,
    pub max_clause_count: usize,
    pub max_depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Conjunction {
    None,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modifier {
    None,
    Required,
    Prohibited,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Occur {
    Must,
    Should,
    MustNot,
}

/// Syntax tree before field names and term kinds are resolved
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Word { text: String, fuzzy: Option<u8> },
    Phrase { text: String, slop: u32 },
    Range { lower: Option<String>, upper: Option<String>, include_lower: bool, include_upper: bool },
    Group(Vec<Item>),
    Field(String, Box<Node>),
    Boosted(Box<Node>, f32),
}

#[derive(Debug, Clone, PartialEq)]
struct Item {
    conj: Conjunction,
    modifier: Modifier,
    node: Node,
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryParser {
    pub fn new() -> Self {
        QueryParser {
            default_field: ALL_FIELDS.to_string(),
            default_operator: BooleanOperator::Or,
            allow_wildcards: true,
            fuzzy_prefix_length: 0,
            max_clause_count: 1024,
            max_depth: 32,
        }
    }

    pub fn from_config(config: &IndexConfig) -> Self {
        QueryParser {
            default_field: config.default_field.clone(),
            default_operator: config.default_operator,
            fuzzy_prefix_length: config.fuzzy_prefix_length.min(u8::MAX as usize) as u8,
            ..QueryParser::new()
        }
    }

    /// Parse a query string into Query AST
    /// Examples:
    /// - "rust programming" -> OR query on the default field
    /// - "rust AND programming", "+rust -java" -> required / prohibited clauses
    /// - "title:rust", "title:(rust OR go)" -> field queries
    /// - "\"exact phrase\"~1" -> phrase query with slop
    /// - "price:[10 TO 100]", "price:{* TO 5}" -> range query
    /// - "rust~1" -> fuzzy query, "rus*" -> prefix, "r?st" -> wildcard
    /// - "rust^2" -> boosted clause, "*:*" -> match all
    pub fn parse(&self, input: &str) -> Result<Query> {
        if input.trim().is_empty() {
            return Ok(Query::MatchAll);
        }

        let (_, items) = all_consuming(delimited(multispace0, items, multispace0))
            .parse(input)
            .map_err(|e| Error::query_syntax(format!("cannot parse '{}': {}", input, e)))?;

        let query = self.build(items, &self.default_field)?;
        self.validate(&query, 0)?;
        Ok(query)
    }

    fn build(&self, items: Vec<Item>, field: &str) -> Result<Query> {
        if items.is_empty() {
            return Err(Error::query_syntax("empty clause group"));
        }

        let default_occur = match self.default_operator {
            BooleanOperator::And => Occur::Must,
            BooleanOperator::Or => Occur::Should,
        };

        let mut clauses: Vec<(Occur, Query)> = Vec::with_capacity(items.len());
        for item in items {
            // A conjunction also rewrites the clause before it.
            if let Some(last) = clauses.last_mut() {
                match item.conj {
                    Conjunction::And if last.0 == Occur::Should => last.0 = Occur::Must,
                    Conjunction::Or if self.default_operator == BooleanOperator::And && last.0 == Occur::Must => {
                        last.0 = Occur::Should
                    }
                    _ => {}
                }
            }

            let occur = match (item.modifier, item.conj) {
                (Modifier::Required, _) => Occur::Must,
                (Modifier::Prohibited, _) => Occur::MustNot,
                (Modifier::None, Conjunction::And) => Occur::Must,
                (Modifier::None, Conjunction::Or) => Occur::Should,
                (Modifier::None, Conjunction::None) => default_occur,
            };
            clauses.push((occur, self.build_node(item.node, field)?));
        }

        if clauses.len() == 1 && clauses[0].0 != Occur::MustNot {
            if let Some((_, query)) = clauses.pop() {
                return Ok(query);
            }
        }

        let mut bool_query = BoolQuery::new();
        for (occur, query) in clauses {
            match occur {
                Occur::Must => bool_query.must.push(query),
                Occur::Should => bool_query.should.push(query),
                Occur::MustNot => bool_query.must_not.push(query),
            }
        }
        Ok(Query::Bool(bool_query))
    }

    fn build_node(&self, node: Node, field: &str) -> Result<Query> {
        match node {
            Node::Group(items) => self.build(items, field),
            Node::Field(name, inner) => {
                if name == "*" {
                    match *inner {
                        Node::Word { ref text, fuzzy: None } if text == "*" => Ok(Query::MatchAll),
                        other => self.build_node(other, ALL_FIELDS),
                    }
                } else {
                    self.build_node(*inner, &name)
                }
            }
            Node::Boosted(inner, boost) => Ok(self.build_node(*inner, field)?.with_boost(boost)),
            Node::Phrase { text, slop } => {
                let phrase: Vec<String> = text.split_whitespace().map(String::from).collect();
                if phrase.is_empty() {
                    return Err(Error::query_syntax("empty phrase"));
                }
                Ok(Query::Phrase(PhraseQuery { field: field.to_string(), phrase, slop, boost: None }))
            }
            Node::Range { lower, upper, include_lower, include_upper } => {
                let mut range = RangeQuery {
                    field: field.to_string(),
                    gt: None,
                    gte: None,
                    lt: None,
                    lte: None,
                    boost: None,
                };
                if let Some(lower) = lower {
                    let bound = parse_field_value(&lower);
                    if include_lower { range.gte = Some(bound) } else { range.gt = Some(bound) }
                }
                if let Some(upper) = upper {
                    let bound = parse_field_value(&upper);
                    if include_upper { range.lte = Some(bound) } else { range.lt = Some(bound) }
                }
                Ok(Query::Range(range))
            }
            Node::Word { text, fuzzy } => Ok(self.word_query(field, text, fuzzy)),
        }
    }

    fn word_query(&self, field: &str, text: String, fuzzy: Option<u8>) -> Query {
        let field = field.to_string();

        if let Some(max_edits) = fuzzy {
            return Query::Fuzzy(FuzzyQuery {
                field,
                term: text,
                max_edits: Some(max_edits.min(2)),
                prefix_length: Some(self.fuzzy_prefix_length),
                boost: None,
            });
        }

        if text == "*" {
            return Query::MatchAll;
        }

        if self.allow_wildcards && text.contains(['*', '?']) {
            if let Some(stem) = text.strip_suffix('*') {
                if !stem.contains(['*', '?']) {
                    return Query::Prefix(PrefixQuery { field, prefix: stem.to_string(), boost: None });
                }
            }
            return Query::Wildcard(WildcardQuery { field, pattern: text, boost: None });
        }

        Query::Term(TermQuery { field, value: text, boost: None })
    }

    fn validate(&self, query: &Query, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(Error::query_syntax(format!("query nesting exceeds {}", self.max_depth)));
        }
        if let Query::Bool(bool_query) = query {
            if bool_query.clause_count() > self.max_clause_count {
                return Err(Error::query_syntax(format!(
                    "boolean query has {} clauses, max is {}",
                    bool_query.clause_count(), self.max_clause_count
                )));
            }
            for clause in bool_query.must.iter()
                .chain(&bool_query.should)
                .chain(&bool_query.must_not)
                .chain(&bool_query.filter)
            {
                self.validate(clause, depth + 1)?;
            }
        }
        Ok(())
    }
}

fn parse_field_value(s: &str) -> FieldValue {
    if let Ok(num) = s.parse::<f64>() {
        FieldValue::Number(num)
    } else if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        FieldValue::Date(date.with_timezone(&Utc))
    } else {
        FieldValue::Text(s.to_string())
    }
}

fn is_term_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '"' | '^' | ':' | '~' | '\\')
}

/// Operator keyword; only counts when it stands alone.
fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    terminated(tag(word), peek(satisfy(|c: char| c.is_whitespace() || c == '(' || c == '"')))
}

fn conjunction(input: &str) -> IResult<&str, Conjunction> {
    alt((
        value(Conjunction::And, alt((keyword("AND"), keyword("&&")))),
        value(Conjunction::Or, alt((keyword("OR"), keyword("||")))),
    ))
    .parse(input)
}

fn modifier(input: &str) -> IResult<&str, Modifier> {
    alt((
        value(Modifier::Required, char('+')),
        value(Modifier::Prohibited, char('-')),
        value(Modifier::Prohibited, terminated(keyword("NOT"), multispace0)),
        value(Modifier::Prohibited, char('!')),
    ))
    .parse(input)
}

fn items(input: &str) -> IResult<&str, Vec<Item>> {
    many0(preceded(multispace0, item)).parse(input)
}

fn item(input: &str) -> IResult<&str, Item> {
    let (input, conj) = opt(terminated(conjunction, multispace0)).parse(input)?;
    let (input, modifier) = opt(modifier).parse(input)?;
    let (input, node) = boosted_clause(input)?;
    Ok((input, Item {
        conj: conj.unwrap_or(Conjunction::None),
        modifier: modifier.unwrap_or(Modifier::None),
        node,
    }))
}

fn boosted_clause(input: &str) -> IResult<&str, Node> {
    let (input, node) = clause(input)?;
    let (input, boost) = opt(preceded(char('^'), boost_value)).parse(input)?;
    Ok((input, match boost {
        Some(boost) => Node::Boosted(Box::new(node), boost),
        None => node,
    }))
}

fn boost_value(input: &str) -> IResult<&str, f32> {
    map_res(recognize(pair(digit1, opt(pair(char('.'), digit1)))), |s: &str| s.parse::<f32>())
        .parse(input)
}

fn clause(input: &str) -> IResult<&str, Node> {
    alt((group, fielded, value_node)).parse(input)
}

fn group(input: &str) -> IResult<&str, Node> {
    map(delimited(char('('), items, preceded(multispace0, char(')'))), Node::Group).parse(input)
}

fn field_name(input: &str) -> IResult<&str, &str> {
    terminated(
        take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | '*')),
        char(':'),
    )
    .parse(input)
}

fn fielded(input: &str) -> IResult<&str, Node> {
    let (input, field) = field_name(input)?;
    let (input, node) = alt((group, value_node)).parse(input)?;
    Ok((input, Node::Field(field.to_string(), Box::new(node))))
}

fn value_node(input: &str) -> IResult<&str, Node> {
    alt((phrase, range, word)).parse(input)
}

fn phrase(input: &str) -> IResult<&str, Node> {
    let (input, text) = delimited(char('"'), take_while(|c: char| c != '"'), char('"')).parse(input)?;
    let (input, slop) = opt(preceded(char('~'), digit1)).parse(input)?;
    let slop = slop.and_then(|d: &str| d.parse().ok()).unwrap_or(0);
    Ok((input, Node::Phrase { text: text.to_string(), slop }))
}

fn range_bound(input: &str) -> IResult<&str, Option<String>> {
    map(
        take_while1(|c: char| !c.is_whitespace() && !matches!(c, ']' | '}')),
        |s: &str| if s == "*" { None } else { Some(s.to_string()) },
    )
    .parse(input)
}

fn range(input: &str) -> IResult<&str, Node> {
    let (input, open) = alt((char('['), char('{'))).parse(input)?;
    let (input, lower) = preceded(multispace0, range_bound).parse(input)?;
    let (input, _) = delimited(multispace1, tag("TO"), multispace1).parse(input)?;
    let (input, upper) = range_bound(input)?;
    let (input, close) = preceded(multispace0, alt((char(']'), char('}')))).parse(input)?;
    Ok((input, Node::Range {
        lower,
        upper,
        include_lower: open == '[',
        include_upper: close == ']',
    }))
}

fn word(input: &str) -> IResult<&str, Node> {
    let (input, text) = take_while1(is_term_char).parse(input)?;
    let (input, fuzzy) = opt(preceded(char('~'), opt(digit1))).parse(input)?;
    let fuzzy = fuzzy.map(|digits: Option<&str>| {
        digits.and_then(|d| d.parse::<u8>().ok()).unwrap_or(2)
    });
    Ok((input, Node::Word { text: text.to_string(), fuzzy }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    fn parser() -> QueryParser {
        QueryParser {
            default_field: "body".to_string(),
            ..QueryParser::new()
        }
    }

    #[test]
    fn test_single_term_uses_default_field() {
        assert_eq!(parser().parse("lucene").unwrap(), Query::term("body", "lucene"));
    }

    #[test]
    fn test_empty_query_matches_all() {
        assert_eq!(parser().parse("   ").unwrap(), Query::MatchAll);
        assert_eq!(parser().parse("*:*").unwrap(), Query::MatchAll);
    }

    #[test]
    fn test_fielded_terms_default_to_or() {
        let query = parser().parse("title:lucene spark").unwrap();
        let expected = BoolQuery::new()
            .with_should(Query::term("title", "lucene"))
            .with_should(Query::term("body", "spark"));
        assert_eq!(query, Query::Bool(expected));
    }

    #[test]
    fn test_and_promotes_previous_clause() {
        let query = parser().parse("lucene AND spark").unwrap();
        let expected = BoolQuery::new()
            .with_must(Query::term("body", "lucene"))
            .with_must(Query::term("body", "spark"));
        assert_eq!(query, Query::Bool(expected));
    }

    #[test]
    fn test_modifiers_and_not() {
        let query = parser().parse("+lucene -solr NOT elastic").unwrap();
        let expected = BoolQuery::new()
            .with_must(Query::term("body", "lucene"))
            .with_must_not(Query::term("body", "solr"))
            .with_must_not(Query::term("body", "elastic"));
        assert_eq!(query, Query::Bool(expected));
    }

    #[test]
    fn test_field_group() {
        let query = parser().parse("title:(lucene OR spark)").unwrap();
        let expected = BoolQuery::new()
            .with_should(Query::term("title", "lucene"))
            .with_should(Query::term("title", "spark"));
        assert_eq!(query, Query::Bool(expected));
    }

    #[test]
    fn test_phrase_with_slop() {
        match parser().parse("title:\"big data\"~2").unwrap() {
            Query::Phrase(p) => {
                assert_eq!(p.field, "title");
                assert_eq!(p.phrase, vec!["big", "data"]);
                assert_eq!(p.slop, 2);
            }
            other => panic!("expected phrase, got {:?}", other),
        }
    }

    #[test]
    fn test_prefix_wildcard_fuzzy() {
        assert_eq!(parser().parse("luc*").unwrap(), Query::prefix("body", "luc"));
        assert!(matches!(parser().parse("l?c*ne").unwrap(), Query::Wildcard(_)));
        match parser().parse("lucine~1").unwrap() {
            Query::Fuzzy(f) => assert_eq!(f.max_edits, Some(1)),
            other => panic!("expected fuzzy, got {:?}", other),
        }
        match parser().parse("lucine~").unwrap() {
            Query::Fuzzy(f) => assert_eq!(f.max_edits, Some(2)),
            other => panic!("expected fuzzy, got {:?}", other),
        }
    }

    #[test]
    fn test_range_bounds() {
        match parser().parse("price:[10 TO 100}").unwrap() {
            Query::Range(r) => {
                assert_eq!(r.gte, Some(FieldValue::Number(10.0)));
                assert_eq!(r.lt, Some(FieldValue::Number(100.0)));
                assert!(r.gt.is_none() && r.lte.is_none());
            }
            other => panic!("expected range, got {:?}", other),
        }
        match parser().parse("price:{* TO 5]").unwrap() {
            Query::Range(r) => {
                assert!(r.gt.is_none() && r.gte.is_none());
                assert_eq!(r.lte, Some(FieldValue::Number(5.0)));
            }
            other => panic!("expected range, got {:?}", other),
        }
    }

    #[test]
    fn test_boost() {
        let query = parser().parse("lucene^2.5").unwrap();
        assert_eq!(query.boost(), 2.5);
    }

    #[test]
    fn test_syntax_errors() {
        for bad in ["(lucene", "\"open phrase", "title:", "lucene)", "()", "price:[1 TO"] {
            let err = parser().parse(bad).unwrap_err();
            assert_eq!(err.kind, ErrorKind::QuerySyntax, "input {:?}", bad);
        }
    }
}
