//! Hosted chat-model answerer
//!
//! Sends the analyst guide, the question and the filtered scope as JSON to an
//! OpenAI-compatible chat model. Any failure is reported to the user as an
//! answer, never as an error.

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use hrdash_facts::{FactRow, FactTable, FilterSelection};
use hrdash_query::{classify_intent, Answer, Answerer};
use serde_json::{json, Value};

type LlmResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const SYSTEM_GUIDE: &str = r#"Eres un analista senior de Gestión Humana. Responde SIEMPRE apoyándote en cálculos sobre las filas JSON proporcionadas (el alcance filtrado del tablero).
- Si te piden "mayor/menor", calcula máximos/mínimos y referencia mes y año.
- Devuelve tablas concisas en markdown cuando aporten claridad; redondea a 2 decimales.
- No inventes datos que no estén en las filas.
- Si el indicador no existe en las filas, explica cómo encontrarlo en el tablero (filtros de año, mes, subproceso e indicador)."#;

const COLUMNS: [&str; 8] = [
    "Subprocess",
    "Indicator Type",
    "Indicator Name",
    "Measurement Frequency",
    "Formula / How it is calculated",
    "Year",
    "Month",
    "Value",
];

/// Scope rows as JSON objects keyed by the dashboard column names.
fn rows_payload(scope: &[FactRow], max_rows: usize) -> Value {
    let rows: Vec<Value> = scope
        .iter()
        .take(max_rows)
        .map(|r| {
            json!({
                "Subprocess": r.category,
                "Indicator Type": r.metric_type,
                "Indicator Name": r.metric_name,
                "Measurement Frequency": r.frequency,
                "Formula / How it is calculated": r.formula,
                "Year": r.period_group,
                "Month": r.period,
                "Value": r.value,
            })
        })
        .collect();
    Value::Array(rows)
}

fn failure_message(detail: &str) -> String {
    format!(
        "⚠️ No pude completar el análisis.\n\
         Detalle técnico: {detail}\n\
         Revisa que el indicador exista y que los filtros del dashboard contengan datos."
    )
}

pub struct LlmAnswerer {
    client: Client<OpenAIConfig>,
    model: String,
    max_rows: usize,
}

impl LlmAnswerer {
    pub fn new(client: Client<OpenAIConfig>, model: impl Into<String>, max_rows: usize) -> Self {
        Self {
            client,
            model: model.into(),
            max_rows,
        }
    }

    fn user_prompt(&self, question: &str, scope: &[FactRow]) -> String {
        let truncated = if scope.len() > self.max_rows {
            format!(" (primeras {} de {} filas)", self.max_rows, scope.len())
        } else {
            String::new()
        };
        format!(
            "Pregunta: {question}\n\n\
             Columnas disponibles: {}.\n\n\
             Filas del alcance filtrado{truncated}:\n{}",
            COLUMNS.join(", "),
            rows_payload(scope, self.max_rows)
        )
    }

    async fn complete(&self, question: &str, scope: &[FactRow]) -> LlmResult<String> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_GUIDE)
                    .build()?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(self.user_prompt(question, scope))
                    .build()?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages(messages)
            .temperature(0.0)
            .build()?;

        let response = self.client.chat().create(request).await?;
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or("No response from model")?;
        Ok(content)
    }
}

#[async_trait]
impl Answerer for LlmAnswerer {
    async fn answer(&self, question: &str, filters: &FilterSelection, facts: &FactTable) -> Answer {
        let intent = classify_intent(question);
        let scope = filters.apply(facts.rows());
        tracing::info!(model = %self.model, rows = scope.len(), "Forwarding question to chat model");

        match self.complete(question, &scope).await {
            Ok(message) => Answer {
                intent,
                message,
                tables: Vec::new(),
                is_error: false,
            },
            Err(e) => {
                tracing::error!(error = %e, "Chat model request failed");
                Answer::failure(intent, failure_message(&e.to_string()))
            }
        }
    }
}
