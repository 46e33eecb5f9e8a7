//! Chat session: per-query pipeline and the interactive command loop.

use crate::analysis::{classify, perform_analysis, summarize};
use crate::dataset::Dataset;
use crate::llm::ResponseComposer;
use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

/// Example questions shown by `ajuda`.
pub const EXAMPLE_QUESTIONS: [&str; 9] = [
    "Qual o valor total das notas fiscais?",
    "Quantas notas fiscais temos?",
    "Quais são os top 5 clientes por valor?",
    "Quais são os top 5 fornecedores por valor?",
    "Mostre os produtos mais vendidos",
    "Estatísticas gerais dos dados",
    "Qual cliente comprou mais?",
    "Quem são os maiores fornecedores?",
    "Resumo dos dados",
];

/// A line typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Help,
    Stats,
    Columns,
    Empty,
    Ask(String),
}

impl Command {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match input.to_lowercase().as_str() {
            "sair" | "exit" | "quit" => Command::Quit,
            "ajuda" | "help" => Command::Help,
            "stats" | "estatisticas" => Command::Stats,
            "colunas" | "columns" => Command::Columns,
            "" => Command::Empty,
            _ => Command::Ask(input.to_string()),
        }
    }
}

/// Owns the dataset and answers questions about it, one at a time.
pub struct ChatSession {
    dataset: Dataset,
    composer: ResponseComposer,
}

impl ChatSession {
    pub fn new(dataset: Dataset, composer: ResponseComposer) -> Self {
        Self { dataset, composer }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Answer a question. Failures become a single diagnostic line.
    pub async fn ask(&self, query: &str) -> String {
        match self.process(query).await {
            Ok(answer) => answer,
            Err(e) => format!("❌ Erro ao processar pergunta: {:#}", e),
        }
    }

    async fn process(&self, query: &str) -> Result<String> {
        info!("Analyzing: {}", query);

        let classification = classify(query, &self.dataset);
        debug!(
            "Classified as {} ({} target fields)",
            classification.category,
            classification.target_fields.len()
        );

        let analysis = perform_analysis(query, &classification, &self.dataset);
        self.composer
            .respond(query, &analysis, &self.dataset.summary())
            .await
    }

    /// General statistics for the `stats` command.
    pub fn stats(&self) -> String {
        summarize(&self.dataset)
    }

    /// Numbered column listing for the `colunas` command.
    pub fn columns_listing(&self) -> String {
        let columns = self.dataset.columns();
        let mut lines = vec![format!("📋 Colunas disponíveis ({}):", columns.len())];
        for (i, col) in columns.iter().enumerate() {
            lines.push(format!("{:2}. {}", i + 1, col));
        }
        lines.join("\n")
    }

    /// Help text with example questions and tips.
    pub fn help_text() -> String {
        let mut lines = vec!["📋 Exemplos de perguntas:".to_string()];
        for (i, example) in EXAMPLE_QUESTIONS.iter().enumerate() {
            lines.push(format!("{:2}. {}", i + 1, example));
        }
        lines.push(String::new());
        lines.push("💡 Dicas:".to_string());
        lines.push("• Use 'cliente' para análises de destinatários".to_string());
        lines.push("• Use 'fornecedor' para análises de emitentes".to_string());
        lines.push("• Use 'produto' para análises de itens".to_string());
        lines.push("• Use 'top' ou 'maior' para rankings".to_string());
        lines.join("\n")
    }

    /// Handle one input line. Returns `None` when the session should end.
    pub async fn handle(&self, input: &str) -> Option<String> {
        match Command::parse(input) {
            Command::Quit => None,
            Command::Help => Some(Self::help_text()),
            Command::Stats => Some(format!("📊 Estatísticas Gerais:\n{}", self.stats())),
            Command::Columns => Some(self.columns_listing()),
            Command::Empty => Some("❌ Por favor, digite uma pergunta.".to_string()),
            Command::Ask(query) => Some(format!("🤖 Assistente:\n{}", self.ask(&query).await)),
        }
    }

    /// Read questions from stdin until `sair` or end of input.
    pub async fn run_interactive(&self) -> Result<()> {
        println!("\nComandos disponíveis:");
        println!("• 'sair' - Encerrar o chat");
        println!("• 'ajuda' - Ver exemplos de perguntas");
        println!("• 'stats' - Ver estatísticas gerais");
        println!("• 'colunas' - Ver colunas disponíveis");
        println!("{}", "=".repeat(50));

        let stdin = BufReader::new(tokio::io::stdin());
        self.converse(stdin, &mut std::io::stdout()).await?;

        println!("👋 Encerrando chat. Até logo!");
        Ok(())
    }

    /// Answer lines from `input` until `sair` or end of input.
    ///
    /// An unreadable line is reported and skipped.
    pub async fn converse<R, W>(&self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        loop {
            write!(out, "\n👤 Você: ")?;
            out.flush()?;

            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    writeln!(out)?;
                    break;
                }
                Err(e) => {
                    warn!("Failed to read input line: {}", e);
                    writeln!(out, "\n❌ Erro: {}", e)?;
                    continue;
                }
            };

            match self.handle(&line).await {
                Some(output) => writeln!(out, "\n{}", output)?,
                None => break,
            }
        }
        Ok(())
    }
}
