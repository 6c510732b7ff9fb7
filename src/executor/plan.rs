//! Query planning
//!
//! Maps a normalized query onto one operation from a closed set. Planning is
//! pure: it never touches the database, so every routing rule is testable
//! without a cluster.

use mongodb::bson::{Bson, Document};
use tracing::debug;

use crate::error::{ExecutionError, ParseError, Result};
use crate::parser::{
    self, ExpressionConverter, MethodCall, NormalizedQuery, ParsedQuery, QueryNormalizer,
};

/// Maximum documents returned by a scoped `find`
pub const FIND_RESULT_CAP: i64 = 20;

/// Options applied to a `find`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

impl From<FindOptions> for mongodb::options::FindOptions {
    fn from(options: FindOptions) -> Self {
        let mut driver = mongodb::options::FindOptions::default();
        driver.projection = options.projection;
        driver.sort = options.sort;
        driver.skip = options.skip;
        driver.limit = options.limit;
        driver
    }
}

/// One executable operation
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPlan {
    Find {
        collection: String,
        filter: Document,
        options: FindOptions,
    },
    FindOne {
        collection: String,
        filter: Document,
        projection: Option<Document>,
    },
    Aggregate {
        collection: String,
        pipeline: Vec<Document>,
    },
    CountDocuments {
        collection: String,
        filter: Document,
    },
    EstimatedDocumentCount {
        collection: String,
    },
    Distinct {
        collection: String,
        field: String,
        filter: Document,
    },
}

impl QueryPlan {
    /// Target collection
    pub fn collection(&self) -> &str {
        match self {
            QueryPlan::Find { collection, .. }
            | QueryPlan::FindOne { collection, .. }
            | QueryPlan::Aggregate { collection, .. }
            | QueryPlan::CountDocuments { collection, .. }
            | QueryPlan::EstimatedDocumentCount { collection }
            | QueryPlan::Distinct { collection, .. } => collection,
        }
    }

    /// Operation name as written in shell syntax
    pub fn operation(&self) -> &'static str {
        match self {
            QueryPlan::Find { .. } => "find",
            QueryPlan::FindOne { .. } => "findOne",
            QueryPlan::Aggregate { .. } => "aggregate",
            QueryPlan::CountDocuments { .. } => "countDocuments",
            QueryPlan::EstimatedDocumentCount { .. } => "estimatedDocumentCount",
            QueryPlan::Distinct { .. } => "distinct",
        }
    }
}

/// Builds a [`QueryPlan`] from a raw query string
pub struct QueryPlanner;

impl QueryPlanner {
    /// Plan a raw query against `default_collection`.
    ///
    /// A `db.<name>.` prefix in the query overrides `default_collection`.
    pub fn plan(raw: &str, default_collection: &str) -> Result<QueryPlan> {
        let normalized = QueryNormalizer::normalize(raw);

        match normalized {
            NormalizedQuery::Pipeline(text) => Ok(QueryPlan::Aggregate {
                collection: default_collection.to_string(),
                pipeline: parser::parse_pipeline(&text)?,
            }),
            NormalizedQuery::Scoped { collection, call } => {
                if collection != default_collection {
                    debug!(
                        "Query names collection '{}', overriding request collection '{}'",
                        collection, default_collection
                    );
                }
                Self::plan_scoped(collection, &call)
            }
            NormalizedQuery::Bare(text) => match parser::parse_query(&text)? {
                ParsedQuery::Pipeline(pipeline) => Ok(QueryPlan::Aggregate {
                    collection: default_collection.to_string(),
                    pipeline,
                }),
                ParsedQuery::Filter(filter) => Ok(QueryPlan::Find {
                    collection: default_collection.to_string(),
                    filter,
                    options: FindOptions::default(),
                }),
            },
        }
    }

    /// Plan `<method>(...)(.<modifier>(...))*` against a named collection
    fn plan_scoped(collection: String, call: &str) -> Result<QueryPlan> {
        let mut calls = parser::parse_method_chain(call)?.into_iter();
        // parse_method_chain never returns an empty chain
        let Some(base) = calls.next() else {
            return Err(ParseError::InvalidMethodCall(call.to_string()).into());
        };
        let modifiers: Vec<MethodCall> = calls.collect();

        let args = &base.arguments;
        let plan = match base.name.as_str() {
            "find" => {
                ArgParser::max_args(&base, 2)?;
                let filter = ArgParser::get_doc_arg(args, 0)?;
                let projection = ArgParser::get_doc_arg(args, 1)?;
                let mut options = FindOptions {
                    projection: (!projection.is_empty()).then_some(projection),
                    limit: Some(FIND_RESULT_CAP),
                    ..Default::default()
                };
                for modifier in &modifiers {
                    Self::apply_find_modifier(&mut options, modifier)?;
                }
                return Ok(QueryPlan::Find {
                    collection,
                    filter,
                    options,
                });
            }
            "findOne" => {
                ArgParser::max_args(&base, 2)?;
                let projection = ArgParser::get_doc_arg(args, 1)?;
                QueryPlan::FindOne {
                    collection,
                    filter: ArgParser::get_doc_arg(args, 0)?,
                    projection: (!projection.is_empty()).then_some(projection),
                }
            }
            "aggregate" => {
                ArgParser::max_args(&base, 1)?;
                QueryPlan::Aggregate {
                    collection,
                    pipeline: ArgParser::get_doc_array_arg(args, 0)?,
                }
            }
            "countDocuments" => {
                ArgParser::max_args(&base, 1)?;
                QueryPlan::CountDocuments {
                    collection,
                    filter: ArgParser::get_doc_arg(args, 0)?,
                }
            }
            "estimatedDocumentCount" => {
                ArgParser::max_args(&base, 0)?;
                QueryPlan::EstimatedDocumentCount { collection }
            }
            "distinct" => {
                ArgParser::max_args(&base, 2)?;
                QueryPlan::Distinct {
                    collection,
                    field: ArgParser::get_string_arg(args, 0)?,
                    filter: ArgParser::get_doc_arg(args, 1)?,
                }
            }
            other => {
                return Err(ExecutionError::UnsupportedOperation(format!(
                    "{other} (supported: find, findOne, aggregate, countDocuments, estimatedDocumentCount, distinct)"
                ))
                .into());
            }
        };

        // Only find accepts chained modifiers
        if let Some(modifier) = modifiers.first() {
            return Err(ExecutionError::UnsupportedOperation(format!(
                "{}() cannot be chained after {}()",
                modifier.name, base.name
            ))
            .into());
        }

        Ok(plan)
    }

    fn apply_find_modifier(options: &mut FindOptions, modifier: &MethodCall) -> Result<()> {
        let args = &modifier.arguments;
        ArgParser::max_args(modifier, 1)?;

        match modifier.name.as_str() {
            "sort" => options.sort = Some(ArgParser::get_doc_arg(args, 0)?),
            "project" | "projection" => {
                let projection = ArgParser::get_doc_arg(args, 0)?;
                options.projection = (!projection.is_empty()).then_some(projection);
            }
            "skip" => {
                let skip = ArgParser::get_integer_arg(args, 0)?;
                if skip < 0 {
                    return Err(ExecutionError::InvalidParameters(
                        "skip() requires a non-negative number".to_string(),
                    )
                    .into());
                }
                options.skip = Some(skip as u64);
            }
            "limit" => {
                let requested = ArgParser::get_integer_arg(args, 0)?.unsigned_abs();
                // 0 means "no limit" to the server, which the cap turns into the cap itself
                let limit = match requested {
                    0 => FIND_RESULT_CAP,
                    n => n.min(FIND_RESULT_CAP.unsigned_abs()) as i64,
                };
                options.limit = Some(limit);
            }
            other => {
                return Err(ExecutionError::UnsupportedOperation(format!(
                    "{other}() (find supports sort, limit, skip, project)"
                ))
                .into());
            }
        }

        Ok(())
    }
}

/// Argument extraction for method calls
struct ArgParser;

impl ArgParser {
    fn max_args(call: &MethodCall, max: usize) -> Result<()> {
        if call.arguments.len() > max {
            return Err(ExecutionError::InvalidParameters(format!(
                "{}() accepts at most {max} argument(s), got {}",
                call.name,
                call.arguments.len()
            ))
            .into());
        }
        Ok(())
    }

    /// Document at index; missing means empty
    fn get_doc_arg(args: &[parser::Expr], index: usize) -> Result<Document> {
        let Some(expr) = args.get(index) else {
            return Ok(Document::new());
        };
        match ExpressionConverter::expr_to_bson(expr)? {
            Bson::Document(doc) => Ok(doc),
            other => Err(ParseError::InvalidQuery(format!(
                "argument {index} must be an object, found {}",
                parser::bson_type_name(&other)
            ))
            .into()),
        }
    }

    /// Pipeline at index; missing means empty
    fn get_doc_array_arg(args: &[parser::Expr], index: usize) -> Result<Vec<Document>> {
        let Some(expr) = args.get(index) else {
            return Ok(Vec::new());
        };
        match ExpressionConverter::expr_to_bson(expr)? {
            Bson::Array(items) => parser::stages_from_array(items),
            other => Err(ParseError::InvalidPipeline(format!(
                "argument {index} must be an array of stages, found {}",
                parser::bson_type_name(&other)
            ))
            .into()),
        }
    }

    fn get_string_arg(args: &[parser::Expr], index: usize) -> Result<String> {
        match args.get(index) {
            Some(parser::Expr::String(s)) => Ok(s.clone()),
            Some(_) => Err(ParseError::InvalidQuery(format!(
                "argument {index} must be a string"
            ))
            .into()),
            None => Err(ParseError::InvalidQuery(format!("missing argument {index}")).into()),
        }
    }

    fn get_integer_arg(args: &[parser::Expr], index: usize) -> Result<i64> {
        match args.get(index) {
            Some(parser::Expr::Number(n))
                if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64 =>
            {
                Ok(*n as i64)
            }
            Some(_) => Err(ParseError::InvalidQuery(format!(
                "argument {index} must be a 64-bit integer"
            ))
            .into()),
            None => Err(ParseError::InvalidQuery(format!("missing argument {index}")).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchLabError;
    use mongodb::bson::doc;

    fn plan(raw: &str) -> QueryPlan {
        QueryPlanner::plan(raw, "movies").unwrap()
    }

    #[test]
    fn test_bare_filter_is_uncapped_find() {
        assert_eq!(
            plan(r#"{"title": "The Matrix"}"#),
            QueryPlan::Find {
                collection: "movies".to_string(),
                filter: doc! { "title": "The Matrix" },
                options: FindOptions::default(),
            }
        );
    }

    #[test]
    fn test_blank_query_is_find_all() {
        for raw in ["", "   ", "\n;"] {
            assert_eq!(
                plan(raw),
                QueryPlan::Find {
                    collection: "movies".to_string(),
                    filter: Document::new(),
                    options: FindOptions::default(),
                }
            );
        }
    }

    #[test]
    fn test_pipeline_literal_is_aggregate() {
        assert_eq!(
            plan(r#"[{"$match":{"year":1999}},{"$count":"total"}]"#),
            QueryPlan::Aggregate {
                collection: "movies".to_string(),
                pipeline: vec![doc! { "$match": { "year": 1999 } }, doc! { "$count": "total" }],
            }
        );
    }

    #[test]
    fn test_pipeline_literals_never_plan_find() {
        let pipelines = [
            "[]",
            "[{$limit: 1}]",
            "[{ $search: { index: 'fulltextsearch', text: { query: 'dragon', path: 'title' } } }, { $project: { title: 1 } }]",
            "[{$vectorSearch: {index: 'vectorsearch', path: 'embeddings', queryVector: [0.1, -0.2], numCandidates: 10, limit: 3}}];",
        ];
        for raw in pipelines {
            assert!(
                matches!(plan(raw), QueryPlan::Aggregate { .. }),
                "{raw} should plan an aggregation"
            );
        }
    }

    #[test]
    fn test_scoped_find_is_capped_and_uses_named_collection() {
        assert_eq!(
            plan(r#"db.books.find({"genres":"Fantasy"})"#),
            QueryPlan::Find {
                collection: "books".to_string(),
                filter: doc! { "genres": "Fantasy" },
                options: FindOptions {
                    limit: Some(FIND_RESULT_CAP),
                    ..Default::default()
                },
            }
        );
    }

    #[test]
    fn test_scoped_find_with_projection() {
        match plan("db.books.find({year: {$gt: 2000}}, {title: 1, _id: 0})") {
            QueryPlan::Find { options, .. } => {
                assert_eq!(options.projection, Some(doc! { "title": 1, "_id": 0 }));
            }
            other => panic!("Expected find, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_projection_is_dropped() {
        match plan("db.books.find({}, {})") {
            QueryPlan::Find { options, .. } => assert_eq!(options.projection, None),
            other => panic!("Expected find, got {other:?}"),
        }
    }

    #[test]
    fn test_limit_never_exceeds_cap() {
        for (raw, expected) in [
            ("db.books.find().limit(5)", 5),
            ("db.books.find().limit(500)", FIND_RESULT_CAP),
            ("db.books.find().limit(0)", FIND_RESULT_CAP),
            ("db.books.find().limit(-3)", 3),
            ("db.books.find().limit(-9223372036854775808)", FIND_RESULT_CAP),
            ("db.books.find().limit(9007199254740993)", FIND_RESULT_CAP),
        ] {
            match plan(raw) {
                QueryPlan::Find { options, .. } => assert_eq!(options.limit, Some(expected), "{raw}"),
                other => panic!("Expected find, got {other:?}"),
            }
        }

        for raw in [
            "db.books.find().limit(-1e30)",
            "db.books.find().limit(1e30)",
            "db.books.find().limit(Infinity)",
            "db.books.find().skip(1e30)",
        ] {
            assert!(
                matches!(QueryPlanner::plan(raw, "movies"), Err(SearchLabError::Parse(_))),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_find_options_reach_driver_options() {
        let QueryPlan::Find { options, .. } =
            plan("db.books.find({}, {title: 1}).sort({year: -1}).skip(10).limit(5)")
        else {
            panic!("Expected find");
        };

        let driver = mongodb::options::FindOptions::from(options);
        assert_eq!(driver.projection, Some(doc! { "title": 1 }));
        assert_eq!(driver.sort, Some(doc! { "year": -1 }));
        assert_eq!(driver.skip, Some(10));
        assert_eq!(driver.limit, Some(5));

        let driver = mongodb::options::FindOptions::from(FindOptions::default());
        assert!(driver.projection.is_none() && driver.sort.is_none());
        assert!(driver.skip.is_none() && driver.limit.is_none());
    }

    #[test]
    fn test_find_modifiers() {
        match plan("db.books.find({}).sort({year: -1}).skip(10).project({title: 1})") {
            QueryPlan::Find { options, .. } => {
                assert_eq!(options.sort, Some(doc! { "year": -1 }));
                assert_eq!(options.skip, Some(10));
                assert_eq!(options.projection, Some(doc! { "title": 1 }));
                assert_eq!(options.limit, Some(FIND_RESULT_CAP));
            }
            other => panic!("Expected find, got {other:?}"),
        }
    }

    #[test]
    fn test_scoped_aggregate() {
        assert_eq!(
            plan("db.books.aggregate([{$sample: {size: 3}}]);"),
            QueryPlan::Aggregate {
                collection: "books".to_string(),
                pipeline: vec![doc! { "$sample": { "size": 3 } }],
            }
        );
    }

    #[test]
    fn test_other_supported_operations() {
        assert_eq!(
            plan("db.books.countDocuments({genres: 'Fantasy'})"),
            QueryPlan::CountDocuments {
                collection: "books".to_string(),
                filter: doc! { "genres": "Fantasy" },
            }
        );
        assert_eq!(
            plan("db.books.estimatedDocumentCount()"),
            QueryPlan::EstimatedDocumentCount {
                collection: "books".to_string()
            }
        );
        assert_eq!(
            plan("db.books.distinct('genres')"),
            QueryPlan::Distinct {
                collection: "books".to_string(),
                field: "genres".to_string(),
                filter: Document::new(),
            }
        );
        assert!(matches!(
            plan("db.books.findOne({title: 'Dune'})"),
            QueryPlan::FindOne { projection: None, .. }
        ));
    }

    #[test]
    fn test_unsupported_operation_is_rejected() {
        for raw in [
            "db.books.drop()",
            "db.books.deleteMany({})",
            "db.books.insertOne({title: 'x'})",
        ] {
            let err = QueryPlanner::plan(raw, "movies").unwrap_err();
            assert!(
                matches!(err, SearchLabError::Execution(ExecutionError::UnsupportedOperation(_))),
                "{raw}: {err}"
            );
        }
    }

    #[test]
    fn test_modifiers_only_after_find() {
        let err = QueryPlanner::plan("db.books.aggregate([]).limit(5)", "movies").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported operation: limit() cannot be chained after aggregate()"
        );
        let err = QueryPlanner::plan("db.books.find().explain()", "movies").unwrap_err();
        assert!(err.to_string().contains("explain()"));
    }

    #[test]
    fn test_invalid_method_call() {
        let err = QueryPlanner::plan("db.books.find", "movies").unwrap_err();
        assert!(matches!(
            err,
            SearchLabError::Parse(ParseError::InvalidMethodCall(_))
        ));
    }

    #[test]
    fn test_argument_shape_errors() {
        assert!(QueryPlanner::plan("db.books.find([1])", "movies").is_err());
        assert!(QueryPlanner::plan("db.books.aggregate({$match: {}})", "movies").is_err());
        assert!(QueryPlanner::plan("db.books.distinct(5)", "movies").is_err());
        assert!(QueryPlanner::plan("db.books.find().limit('5')", "movies").is_err());
        assert!(QueryPlanner::plan("db.books.find({}, {}, {})", "movies").is_err());
    }

    #[test]
    fn test_bare_pipeline_is_aggregate_on_default_collection() {
        match QueryPlanner::plan("[{$limit: 2}]", "books").unwrap() {
            QueryPlan::Aggregate { collection, .. } => assert_eq!(collection, "books"),
            other => panic!("Expected aggregate, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_accessors() {
        let plan = plan("db.books.distinct('year')");
        assert_eq!(plan.collection(), "books");
        assert_eq!(plan.operation(), "distinct");
    }
}
