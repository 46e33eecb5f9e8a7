//! Final answer composition.
//!
//! Simple questions are answered with the deterministic analysis. Anything
//! else is rephrased by the language model, and every backend failure falls
//! back to the deterministic analysis.

use crate::llm::backend::GenerationBackend;
use crate::models::DataSummary;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Queries containing any of these are answered without the model.
pub const SIMPLE_KEYWORDS: [&str; 5] = ["estatísticas", "resumo", "total", "quantidade", "valor"];

/// Error marker older backends embed in their text output.
pub const ERROR_MARKER: &str = "❌";

/// Whether the query can be answered directly from the analysis.
pub fn is_simple_query(query: &str) -> bool {
    let query_lower = query.to_lowercase();
    SIMPLE_KEYWORDS.iter().any(|k| query_lower.contains(k))
}

/// Build the generation prompt for a query and its analysis.
pub fn build_prompt(query: &str, analysis: &str, summary: &DataSummary) -> Result<String> {
    let context =
        serde_json::to_string_pretty(summary).context("Failed to serialize dataset summary")?;

    Ok(format!(
        r#"Você é um assistente especializado em análise de notas fiscais brasileiras.

CONTEXTO DOS DADOS:
{context}

PERGUNTA DO USUÁRIO: {query}

ANÁLISE DOS DADOS REALIZADA:
{analysis}

INSTRUÇÕES:
- Responda de forma clara e objetiva baseado na análise dos dados
- Use linguagem profissional mas acessível
- Se apropriado, sugira outras análises que podem ser úteis
- Formate valores monetários em reais (R$)
- Se houver dados específicos, destaque os pontos principais
- Mantenha a resposta concisa e informativa

RESPOSTA:"#
    ))
}

/// Decides between the deterministic analysis and a model rephrasing.
pub struct ResponseComposer {
    backend: Option<Box<dyn GenerationBackend>>,
    show_progress: bool,
}

impl ResponseComposer {
    pub fn new(backend: Box<dyn GenerationBackend>) -> Self {
        Self {
            backend: Some(backend),
            show_progress: false,
        }
    }

    /// A composer that never calls a model.
    pub fn offline() -> Self {
        Self {
            backend: None,
            show_progress: false,
        }
    }

    /// Show a spinner while waiting for the model.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Produce the final answer for `query`.
    ///
    /// Only prompt construction can fail; backend failures are absorbed.
    pub async fn respond(&self, query: &str, analysis: &str, summary: &DataSummary) -> Result<String> {
        if is_simple_query(query) {
            debug!("Simple query, returning analysis directly");
            return Ok(analysis.to_string());
        }

        let Some(backend) = self.backend.as_deref() else {
            debug!("No language model configured, returning analysis directly");
            return Ok(analysis.to_string());
        };

        let prompt = build_prompt(query, analysis, summary)?;
        info!("Generating answer with model {}", backend.model());

        let spinner = self.show_progress.then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message("🤖 Gerando resposta com IA...");
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });

        let result = backend.generate(&prompt).await;

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        Ok(match result {
            Err(e) => {
                warn!("Language model unavailable, using analysis: {}", e);
                analysis.to_string()
            }
            Ok(text) if text.contains(ERROR_MARKER) => {
                warn!("Language model returned an error marker, using analysis");
                analysis.to_string()
            }
            Ok(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    debug!("Empty model response, using analysis");
                    analysis.to_string()
                } else {
                    trimmed.to_string()
                }
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::llm::backend::BackendError;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Backend returning a fixed reply and counting calls.
    pub(crate) struct StubBackend {
        pub reply: Result<String, BackendError>,
        pub calls: Arc<AtomicUsize>,
    }

    impl StubBackend {
        pub(crate) fn new(reply: Result<String, BackendError>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    reply,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    impl GenerationBackend for StubBackend {
        fn generate<'a>(&'a self, _prompt: &'a str) -> BoxFuture<'a, Result<String, BackendError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self.reply.clone();
            Box::pin(async move { reply })
        }

        fn list_models(&self) -> BoxFuture<'_, Result<Vec<String>, BackendError>> {
            Box::pin(async { Ok(vec!["stub".to_string()]) })
        }

        fn model(&self) -> &str {
            "stub"
        }
    }

    fn summary() -> DataSummary {
        DataSummary {
            total_registros: 2,
            campos_nota_fiscal: crate::models::Field::invoice_columns(),
            campos_cliente: vec!["NOME_DESTINATARIO".to_string()],
            campos_fornecedor: vec!["NOME_EMITENTE".to_string()],
        }
    }

    const ANALYSIS: &str = "🏆 Top 5 clientes por valor:\n   • Loja A: R$ 10.00";

    #[test]
    fn test_simple_keywords() {
        assert!(is_simple_query("Qual o VALOR total?"));
        assert!(is_simple_query("Estatísticas gerais"));
        assert!(is_simple_query("resumo dos dados"));
        assert!(!is_simple_query("Quem é o maior cliente?"));
    }

    #[test]
    fn test_prompt_contents() {
        let prompt = build_prompt("Quem compra mais?", ANALYSIS, &summary()).unwrap();
        assert!(prompt.contains("PERGUNTA DO USUÁRIO: Quem compra mais?"));
        assert!(prompt.contains(ANALYSIS));
        assert!(prompt.contains("\"total_registros\": 2"));
        assert!(prompt.contains("\"campos_cliente\": [\n    \"NOME_DESTINATARIO\"\n  ]"));
        assert!(prompt.ends_with("RESPOSTA:"));
    }

    #[tokio::test]
    async fn test_simple_query_skips_backend() {
        let (stub, calls) = StubBackend::new(Ok("reescrito".to_string()));
        let composer = ResponseComposer::new(Box::new(stub));

        let out = composer
            .respond("Qual o valor total das notas fiscais?", ANALYSIS, &summary())
            .await
            .unwrap();
        assert_eq!(out, ANALYSIS);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_connection_fault_returns_analysis_unchanged() {
        let (stub, calls) =
            StubBackend::new(Err(BackendError::Connect("http://localhost:11434".to_string())));
        let composer = ResponseComposer::new(Box::new(stub));

        let out = composer
            .respond("Quem é o maior cliente?", ANALYSIS, &summary())
            .await
            .unwrap();
        assert_eq!(out, ANALYSIS);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_returns_analysis() {
        let (stub, _) = StubBackend::new(Err(BackendError::Timeout(30)));
        let composer = ResponseComposer::new(Box::new(stub));
        let out = composer
            .respond("Quem é o maior cliente?", ANALYSIS, &summary())
            .await
            .unwrap();
        assert_eq!(out, ANALYSIS);
    }

    #[tokio::test]
    async fn test_error_marker_returns_analysis() {
        let (stub, _) = StubBackend::new(Ok("❌ Erro: algo falhou".to_string()));
        let composer = ResponseComposer::new(Box::new(stub));
        let out = composer
            .respond("Quem é o maior cliente?", ANALYSIS, &summary())
            .await
            .unwrap();
        assert_eq!(out, ANALYSIS);
    }

    #[tokio::test]
    async fn test_model_answer_is_trimmed() {
        let (stub, calls) = StubBackend::new(Ok("\n  A Loja A lidera.  \n".to_string()));
        let composer = ResponseComposer::new(Box::new(stub));
        let out = composer
            .respond("Quem é o maior cliente?", ANALYSIS, &summary())
            .await
            .unwrap();
        assert_eq!(out, "A Loja A lidera.");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_answer_returns_analysis() {
        let (stub, _) = StubBackend::new(Ok("   ".to_string()));
        let composer = ResponseComposer::new(Box::new(stub));
        let out = composer
            .respond("Quem é o maior cliente?", ANALYSIS, &summary())
            .await
            .unwrap();
        assert_eq!(out, ANALYSIS);
    }

    #[test]
    fn test_offline_composer() {
        let composer = ResponseComposer::offline();
        let out = tokio_test::block_on(composer.respond("Quem é o maior cliente?", ANALYSIS, &summary()))
            .unwrap();
        assert_eq!(out, ANALYSIS);
    }
}
