//! Machining-analysis orchestration: prompt rendering, the model call and reply parsing.
//!
//! Two contracts share the inference client:
//!
//! - [`analyze_drawing`] asks for a structured JSON result (`features` plus a
//!   `machining_plan`) for an image URL and/or extracted drawing text;
//! - [`report`] asks for a free-text machining report of extracted PDF text.
//!
//! Prompts are `minijinja` templates compiled into the binary.

use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::db::models::analyses::ProcessType;
use crate::errors::{Error, Result};
use crate::inference::{ChatMessage, CompletionOptions, InferenceClient};

const SYSTEM_INSTRUCTION: &str = "Você é um especialista em usinagem CNC. Sempre retorne respostas em formato JSON válido.";

const CONNECTION_TEST_PROMPT: &str = "Teste de conexão com a DeepInfra";

pub const ANALYSIS_OPTIONS: CompletionOptions = CompletionOptions {
    max_tokens: 3000,
    temperature: 0.3,
    json_mode: true,
};

pub const REPORT_OPTIONS: CompletionOptions = CompletionOptions {
    max_tokens: 1500,
    temperature: 0.2,
    json_mode: false,
};

pub const CONNECTION_TEST_OPTIONS: CompletionOptions = CompletionOptions {
    max_tokens: 100,
    temperature: 0.2,
    json_mode: false,
};

/// Structured result of a drawing analysis, as returned by the model.
///
/// Parsing is lenient: every field has a default, and the loosely shaped parts
/// (dimensions, tool recommendations, cutting parameters) are kept as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResult {
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub machining_plan: MachiningPlan,
}

/// A detected machining feature (hole, slot, pocket, face, chamfer, thread).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Feature {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub dimensions: Value,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub tolerances: Vec<Value>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub location: Value,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MachiningPlan {
    #[serde(default)]
    pub operations: Vec<Operation>,
    /// Usually a string such as `"45 min"`, sometimes a number
    #[serde(default)]
    #[schema(value_type = Object)]
    pub total_estimated_time: Value,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// One step of the machining plan (facing, drilling, milling, turning, boring).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Operation {
    #[serde(default)]
    pub sequence: Option<u32>,
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub tool_recommendation: Value,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub cutting_parameters: Value,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub estimated_time: Value,
}

/// What the model gets to look at for a structured analysis.
#[derive(Debug, Clone)]
pub struct DrawingInput<'a> {
    /// Publicly reachable drawing URL (images)
    pub image_url: Option<&'a str>,
    /// Extracted drawing text (PDFs)
    pub text: Option<&'a str>,
    pub material: &'a str,
    pub process: ProcessType,
    /// The caller's tool inventory, embedded as pretty-printed JSON
    pub tools: &'a Value,
}

/// Inputs of the free-text report.
#[derive(Debug, Clone)]
pub struct ReportInput<'a> {
    pub text: &'a str,
    pub material: &'a str,
    pub process: &'a str,
    pub tools: &'a Value,
}

fn templates() -> Result<Environment<'static>> {
    let load_error = |e: minijinja::Error| Error::Internal {
        operation: format!("load prompt templates: {e}"),
    };

    let mut env = Environment::new();
    env.add_template("drawing_analysis.txt", include_str!("../templates/drawing_analysis.txt.j2"))
        .map_err(load_error)?;
    env.add_template("pdf_report.txt", include_str!("../templates/pdf_report.txt.j2"))
        .map_err(load_error)?;
    Ok(env)
}

fn render(name: &str, ctx: minijinja::Value) -> Result<String> {
    let env = templates()?;
    env.get_template(name)
        .and_then(|template| template.render(ctx))
        .map_err(|e| Error::Internal {
            operation: format!("render prompt {name}: {e}"),
        })
}

/// Messages for a structured drawing analysis.
pub fn analysis_messages(input: &DrawingInput<'_>) -> Result<Vec<ChatMessage>> {
    let tools_json = serde_json::to_string_pretty(input.tools).map_err(|e| Error::Internal {
        operation: format!("serialize tools: {e}"),
    })?;

    let prompt = render(
        "drawing_analysis.txt",
        context! {
            image_url => input.image_url,
            text => input.text,
            material => input.material,
            process_label => input.process.label(),
            tools_json => tools_json,
        },
    )?;

    Ok(vec![ChatMessage::system(SYSTEM_INSTRUCTION), ChatMessage::user(prompt)])
}

/// Messages for the free-text report. A string `tools` value is embedded verbatim,
/// anything else as compact JSON.
pub fn report_messages(input: &ReportInput<'_>) -> Result<Vec<ChatMessage>> {
    let tools = match input.tools {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let prompt = render(
        "pdf_report.txt",
        context! {
            text => input.text,
            material => input.material,
            process => input.process,
            tools => tools,
        },
    )?;

    Ok(vec![ChatMessage::user(prompt)])
}

/// Remove a surrounding Markdown code fence (```` ```json ... ``` ````), if any.
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (e.g. `json`) on the opening line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a model reply into an [`AnalysisResult`]. An empty reply is an empty result.
pub fn parse_analysis(content: &str) -> Result<AnalysisResult> {
    let body = strip_code_fence(content);
    let body = if body.is_empty() { "{}" } else { body };

    serde_json::from_str(body).map_err(|e| Error::Upstream {
        message: e.to_string(),
        details: json!({ "content": content }),
    })
}

/// Run one structured analysis call and parse the reply.
#[instrument(skip_all, fields(material = %input.material, process = input.process.as_str(), has_image = input.image_url.is_some(), has_text = input.text.is_some()), err)]
pub async fn analyze_drawing(client: &InferenceClient, input: &DrawingInput<'_>) -> Result<AnalysisResult> {
    client.ensure_configured()?;
    let messages = analysis_messages(input)?;
    let content = client.complete(&messages, ANALYSIS_OPTIONS).await?;
    debug!(length = content.len(), "Received analysis reply");

    parse_analysis(&content)
}

/// Run one free-text report call and return the reply content.
#[instrument(skip_all, fields(material = %input.material), err)]
pub async fn report(client: &InferenceClient, input: &ReportInput<'_>) -> Result<String> {
    client.ensure_configured()?;
    let messages = report_messages(input)?;
    client.complete(&messages, REPORT_OPTIONS).await
}

/// Minimal round trip to the provider.
#[instrument(skip_all, err)]
pub async fn connection_test(client: &InferenceClient) -> Result<String> {
    client.ensure_configured()?;
    client.complete(&[ChatMessage::user(CONNECTION_TEST_PROMPT)], CONNECTION_TEST_OPTIONS).await
}
