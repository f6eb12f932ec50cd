//! Oracle adapters backed by a free-text [`TextGenerator`].
//!
//! Each adapter owns its prompt and the parsing of the reply; nothing here
//! retries. Unparsable replies degrade to the documented fallback instead of
//! erroring, except for path scoring where a missing rating is an error.

use kg_types::{
    fill_prompt, DecisionOracle, MergeOracle, NodeContext, OracleError, PathScore,
    PathScoreRequest, PathScorer, Relationship, TextGenerator, WalkStep,
};
use regex::Regex;
use std::sync::OnceLock;

pub const DEFAULT_WALK_GOAL: &str = "Explore the graph in the most meaningful way";

const MERGE_SIMILARITY_PROMPT: &str = r#"Two nodes of a knowledge graph may name the same concept.

Node 1: "{node_1}"
Relationships of node 1:
{relationships_1}

Node 2: "{node_2}"
Relationships of node 2:
{relationships_2}

On a scale from 0 (different concepts) to 1 (the same concept), how similar are these nodes?
Answer with a single number."#;

const MERGE_NAME_PROMPT: &str = r#"These knowledge-graph nodes name the same concept: {nodes}

Suggest one clear name for the concept. Answer with the name only."#;

const WALK_PROMPT: &str = r#"You are walking through a knowledge graph and must choose the next node to visit.

Current node: {current_node}

{path}

{neighbors}

Goal: {goal}

Prefer nodes that stand for substantive concepts, findings or phenomena over methods,
instruments, procedures or administrative terms. Revisiting a node is allowed.

Answer on one line in the form:
NEXT_NODE: <node name>"#;

const PATH_SCORE_PROMPT: &str = r#"Rate the scientific quality of the relationships in this knowledge-graph extract
between "{start_node}" and "{end_node}" on a scale from 1 (trivial or wrong) to 5
(insightful, non-obvious, research-advancing).

The graph is written as "(node_1)-[:relationship]->(node_2),\n(node_2)-[:relationship]->(node_3)...":

{graph_str}

Answer in the following format:
rating=<rating>
<justification>"#;

fn number_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"0\.\d+|\d+\.\d+|\d+").expect("valid number pattern"))
}

fn next_node_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:NEXT_NODE:|Next node:)[ \t]*([^\r\n]+)").expect("valid next-node pattern")
    })
}

fn rating_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)rating\s*=\s*(\d+(?:\.\d+)?)").expect("valid rating pattern")
    })
}

/// First number in the reply, clamped to [0, 1]; 0.0 when there is none.
pub fn parse_similarity_score(reply: &str) -> f64 {
    number_pattern()
        .find(reply)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|score| score.clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

/// Node named after `NEXT_NODE:` with surrounding quotes and trailing dots removed.
pub fn parse_next_node(reply: &str) -> Option<String> {
    let caps = next_node_pattern().captures(reply)?;
    let name = caps
        .get(1)?
        .as_str()
        .trim()
        .trim_end_matches('.')
        .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '*'))
        .trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// `rating=<n>` followed by free-text justification.
pub fn parse_rating(reply: &str) -> Result<PathScore, OracleError> {
    let caps = rating_pattern()
        .captures(reply)
        .ok_or_else(|| OracleError::Other(format!("no rating in reply: {:?}", reply)))?;
    let whole = caps.get(0).ok_or(OracleError::EmptyResponse)?;
    let score = caps[1]
        .parse::<f64>()
        .map_err(|e| OracleError::Other(e.to_string()))?;
    Ok(PathScore {
        score,
        justification: reply[whole.end()..].trim().to_string(),
    })
}

fn format_relationships(relationships: &[Relationship]) -> String {
    if relationships.is_empty() {
        return "None".to_string();
    }
    relationships
        .iter()
        .map(|r| format!("- {} {} {}", r.source, r.relation, r.target))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Node-equivalence oracle asking a text generator for a similarity number.
pub struct LlmMergeOracle<G: TextGenerator> {
    generator: G,
}

impl<G: TextGenerator> LlmMergeOracle<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }
}

impl<G: TextGenerator> MergeOracle for LlmMergeOracle<G> {
    fn similarity(&self, a: &NodeContext, b: &NodeContext) -> Result<f64, OracleError> {
        let prompt = fill_prompt(
            MERGE_SIMILARITY_PROMPT,
            &[
                ("node_1", a.name.as_str()),
                ("relationships_1", format_relationships(&a.relationships).as_str()),
                ("node_2", b.name.as_str()),
                ("relationships_2", format_relationships(&b.relationships).as_str()),
            ],
        );
        let reply = self.generator.generate(&prompt)?;
        let score = parse_similarity_score(&reply);
        tracing::debug!(a = %a.name, b = %b.name, score, "merge similarity");
        Ok(score)
    }

    fn suggest_name(&self, group: &[String]) -> Result<Option<String>, OracleError> {
        let nodes = group
            .iter()
            .map(|n| format!("\"{}\"", n))
            .collect::<Vec<_>>()
            .join(", ");
        let reply = self
            .generator
            .generate(&fill_prompt(MERGE_NAME_PROMPT, &[("nodes", nodes.as_str())]))?;
        let name = reply.lines().next().unwrap_or("").trim();
        Ok((!name.is_empty()).then(|| name.to_string()))
    }
}

/// Guided-walk oracle: renders the step into a prompt and parses `NEXT_NODE:`.
pub struct LlmDecisionOracle<G: TextGenerator> {
    generator: G,
    prompt: String,
    goal: String,
}

impl<G: TextGenerator> LlmDecisionOracle<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            prompt: WALK_PROMPT.to_string(),
            goal: DEFAULT_WALK_GOAL.to_string(),
        }
    }

    /// Custom template; `{current_node}`, `{path}`, `{neighbors}` and `{goal}` are substituted.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    fn render(&self, step: &WalkStep) -> String {
        fill_prompt(
            &self.prompt,
            &[
                ("current_node", step.current_node.as_str()),
                ("path", step.path_description.as_str()),
                ("neighbors", step.describe_neighbors().as_str()),
                ("goal", self.goal.as_str()),
            ],
        )
    }
}

impl<G: TextGenerator> DecisionOracle for LlmDecisionOracle<G> {
    fn decide(&self, step: &WalkStep) -> Result<Option<String>, OracleError> {
        let reply = self.generator.generate(&self.render(step))?;
        let choice = parse_next_node(&reply);
        if choice.is_none() {
            tracing::warn!(node = %step.current_node, "no NEXT_NODE in oracle reply");
        }
        Ok(choice)
    }
}

/// Path-quality oracle parsing `rating=<n>` replies.
pub struct LlmPathScorer<G: TextGenerator> {
    generator: G,
    prompt: String,
}

impl<G: TextGenerator> LlmPathScorer<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            prompt: PATH_SCORE_PROMPT.to_string(),
        }
    }

    /// Custom template; `{start_node}`, `{end_node}` and `{graph_str}` are substituted.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

impl<G: TextGenerator> PathScorer for LlmPathScorer<G> {
    fn score(&self, request: &PathScoreRequest) -> Result<PathScore, OracleError> {
        let prompt = fill_prompt(
            &self.prompt,
            &[
                ("start_node", request.start_node.as_str()),
                ("end_node", request.end_node.as_str()),
                ("graph_str", request.graph_str.as_str()),
            ],
        );
        parse_rating(&self.generator.generate(&prompt)?)
    }
}
