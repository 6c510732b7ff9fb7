//! Interactive exercises
//!
//! Exercises are declared in TOML:
//!
//! ```toml
//! [[exercise]]
//! title = "Find a movie"
//! description = "Find The Matrix by title"
//! initial_query = '{"title": "The Matrix"}'
//! expected_result = [{ title = "The Matrix" }]
//! hint = "Match on the title field"
//! solution = '{"title": "The Matrix"}'
//! collection = "movies"
//! ```
//!
//! Running one posts the query to a search-lab server and compares the
//! result with `expected_result`.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{ConfigError, ExecutionError, Result};
use crate::formatter::{Colorizer, JsonFormatter};
use crate::server::{ExecuteRequest, ExecuteResponse};

/// Shown instead of the server's message when it has no database
pub const NOT_CONNECTED_HINT: &str = "Please connect to MongoDB first. Make sure your .env file is configured with MONGODB_USERNAME, MONGODB_PASSWORD, and MONGODB_LOCATION.";

/// One exercise
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Exercise {
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub initial_query: String,

    /// Compared structurally with the returned `result`
    #[serde(default)]
    pub expected_result: Option<Value>,

    #[serde(default)]
    pub hint: String,

    #[serde(default)]
    pub solution: String,

    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_collection() -> String {
    "movies".to_string()
}

/// Exercises loaded from one file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExerciseSet {
    #[serde(default, rename = "exercise")]
    pub exercises: Vec<Exercise>,
}

impl ExerciseSet {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Find by 1-based position or case-insensitive title
    pub fn find(&self, name: &str) -> Option<&Exercise> {
        if let Ok(position) = name.parse::<usize>() {
            return position
                .checked_sub(1)
                .and_then(|index| self.exercises.get(index));
        }
        self.exercises
            .iter()
            .find(|exercise| exercise.title.eq_ignore_ascii_case(name.trim()))
    }
}

/// Outcome of comparing a result with the expectation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed,
    /// No expectation to compare with
    Unchecked,
}

impl Verdict {
    pub fn check(expected: Option<&Value>, actual: &Value) -> Self {
        match expected {
            None => Verdict::Unchecked,
            Some(expected) if expected == actual => Verdict::Passed,
            Some(_) => Verdict::Failed,
        }
    }
}

/// Result of running one exercise
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseOutcome {
    pub query: String,
    pub result: Option<Value>,
    pub count: Option<usize>,
    pub error: Option<String>,
    pub verdict: Verdict,
}

impl ExerciseOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.verdict != Verdict::Failed
    }
}

/// Client for a running search-lab server
pub struct ExerciseClient {
    http: reqwest::Client,
    base_url: String,
}

impl ExerciseClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// POST a query; server-reported failures become `QueryFailed` with the
    /// server's detail, or its error when there is no detail
    pub async fn execute(&self, query: &str, collection: &str) -> Result<ExecuteResponse> {
        let url = format!("{}/api/search/execute", self.base_url);
        let request = ExecuteRequest {
            query: Some(query.to_string()),
            collection: Some(collection.to_string()),
        };

        debug!("POST {} ({} chars, collection '{}')", url, query.len(), collection);
        let response = self.http.post(&url).json(&request).send().await?;

        if response.status().is_success() {
            return Ok(response.json::<ExecuteResponse>().await?);
        }

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body["details"]
            .as_str()
            .or_else(|| body["error"].as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));

        Err(ExecutionError::QueryFailed(message).into())
    }

    /// Run an exercise with `query`, or its initial query when `None`
    pub async fn run(&self, exercise: &Exercise, query: Option<&str>) -> ExerciseOutcome {
        let query = query.unwrap_or(&exercise.initial_query).trim().to_string();

        match self.execute(&query, &exercise.collection).await {
            Ok(response) => ExerciseOutcome {
                verdict: Verdict::check(exercise.expected_result.as_ref(), &response.result),
                query,
                count: Some(response.count),
                result: Some(response.result),
                error: None,
            },
            Err(err) => ExerciseOutcome {
                query,
                result: None,
                count: None,
                error: Some(describe_failure(&err.to_string())),
                verdict: Verdict::Failed,
            },
        }
    }
}

/// Replace a not-connected failure with setup instructions
pub fn describe_failure(message: &str) -> String {
    if message.contains("Not connected to database") {
        NOT_CONNECTED_HINT.to_string()
    } else {
        message
            .strip_prefix("Query failed: ")
            .unwrap_or(message)
            .to_string()
    }
}

/// Terminal rendering of an exercise and its outcome
pub struct ExerciseReport<'a> {
    pub exercise: &'a Exercise,
    pub outcome: &'a ExerciseOutcome,
    pub show_solution: bool,
}

impl ExerciseReport<'_> {
    pub fn render(&self, colorizer: &Colorizer, json: &JsonFormatter) -> String {
        let exercise = self.exercise;
        let outcome = self.outcome;
        let mut lines = vec![colorizer.heading(&exercise.title)];

        if !exercise.description.is_empty() {
            lines.push(exercise.description.clone());
        }
        lines.push(colorizer.dim(&format!(
            "collection: {}  query: {}",
            exercise.collection, outcome.query
        )));
        lines.push(String::new());

        match (&outcome.result, &outcome.error) {
            (_, Some(error)) => lines.push(colorizer.error(error)),
            (Some(result), None) => {
                lines.push(json.format(result));
                if let Some(count) = outcome.count {
                    lines.push(colorizer.dim(&format!("{count} result(s)")));
                }
            }
            (None, None) => {}
        }

        lines.push(match outcome.verdict {
            Verdict::Passed => colorizer.success("Correct! The result matches the expected output."),
            Verdict::Failed if outcome.error.is_none() => {
                colorizer.failure("Not quite. The result differs from the expected output.")
            }
            Verdict::Failed => colorizer.failure("The query did not run."),
            Verdict::Unchecked => colorizer.dim("No expected result to check against."),
        });

        if outcome.verdict == Verdict::Failed && !exercise.hint.is_empty() {
            lines.push(colorizer.warning(&format!("Hint: {}", exercise.hint)));
        }

        if self.show_solution && !exercise.solution.is_empty() {
            lines.push(String::new());
            lines.push(colorizer.heading("Solution:"));
            lines.push(exercise.solution.clone());
        }

        lines.join("\n")
    }
}
