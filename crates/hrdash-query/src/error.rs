use thiserror::Error;

/// Failures of one question-answering interaction.
///
/// None of these are fatal: the answerer turns each into the message of the
/// interaction and the fact table is left as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("No data in scope{}", .metric.as_ref().map(|m| format!(" for metric '{m}'")).unwrap_or_default())]
    NoData { metric: Option<String> },

    #[error("Metric '{metric}' has no numeric values in scope")]
    NonNumeric { metric: String },

    #[error("Ambiguous metric, candidates: {}", .candidates.join(", "))]
    AmbiguousMetric { candidates: Vec<String> },

    #[error("Question does not match any known intent")]
    UnknownIntent,
}

impl QueryError {
    /// Markdown text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            QueryError::NoData { metric: Some(metric) } => format!(
                "No hay datos para **{metric}** con los filtros actuales. \
                 Revisa los años, meses y subprocesos seleccionados."
            ),
            QueryError::NoData { metric: None } => {
                "No hay datos con los filtros actuales. Amplía la selección de filtros.".to_string()
            }
            QueryError::NonNumeric { metric } => format!(
                "Los valores de **{metric}** en el alcance actual no son numéricos."
            ),
            QueryError::AmbiguousMetric { candidates } if candidates.is_empty() => {
                "No identifiqué el indicador. Escribe su nombre tal como aparece en el tablero."
                    .to_string()
            }
            QueryError::AmbiguousMetric { candidates } => {
                let list = candidates
                    .iter()
                    .map(|c| format!("- {c}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("¿A cuál indicador te refieres?\n\n{list}\n\nSelecciona uno en los filtros o escríbelo completo.")
            }
            QueryError::UnknownIntent => "No entendí la pregunta. Puedo calcular el **máximo**, \
                 el **mínimo** o el **promedio** de un indicador, o generar un **resumen ejecutivo**."
                .to_string(),
        }
    }
}
