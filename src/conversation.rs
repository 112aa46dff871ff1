use crate::config::DEFAULT_HISTORY_WINDOW;
use crate::kpi::KpiResult;
use crate::statements::StatementTriple;
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const GREETING: &str = "Hello! I'm your financial AI assistant. I can help you with:\n\n\
    • Multi-entity/subsidiary analysis\n\
    • KPI metrics (AR Aging, DSO)\n\
    • Revenue analytics (YTD, variance, trailing 3M, TOP N)\n\
    • Foreign exchange rates\n\
    • Unusual transaction detection\n\
    • Financial statement insights\n\n\
    Upload a ledger, then ask me anything about it to get started.";

pub const NEEDS_TRANSACTIONS_MESSAGE: &str = "I need transaction data to answer questions about \
    subsidiaries. Please upload a CSV file with your financial transactions first. The CSV should \
    include columns like: date, account, amount, type, and entity (or subsidiary).";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::now(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::now(Role::Assistant, content)
    }

    fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Role and content of a message, as forwarded to the reasoning service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// Append-only record of the session's chat. Nothing is ever dropped; only a
/// window of it is forwarded.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_greeting() -> Self {
        let mut log = Self::new();
        log.append(Message::assistant(GREETING));
        log
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The most recent `size` entries, oldest first.
    pub fn window(&self, size: usize) -> Vec<HistoryEntry> {
        let start = self.messages.len().saturating_sub(size);
        self.messages[start..]
            .iter()
            .map(|m| HistoryEntry {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }
}

/// Payload for the reasoning endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_data: Option<StatementTriple>,
    /// Absent when nothing is on display, never an empty list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<Transaction>>,
    pub conversation_history: Vec<HistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

/// Everything the builder reads to assemble one request.
pub struct ChatContext<'a> {
    pub question: &'a str,
    pub kpi: Option<&'a KpiResult>,
    pub statements: Option<StatementTriple>,
    /// The subset currently on display.
    pub transactions: &'a [Transaction],
    /// Whether any ledger has been uploaded at all.
    pub ledger_loaded: bool,
    /// Prior messages; the current question is not yet in it.
    pub log: &'a ConversationLog,
    pub entity: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContextDecision {
    Send(ChatRequest),
    /// Answer locally with this text; no external call is made.
    Clarify(String),
}

pub struct ConversationContextBuilder {
    history_window: usize,
}

impl Default for ConversationContextBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW)
    }
}

impl ConversationContextBuilder {
    pub fn new(history_window: usize) -> Self {
        Self { history_window }
    }

    /// Questions about entities or cross-entity comparisons that cannot be
    /// answered without a ledger.
    pub fn needs_transactions(question: &str) -> bool {
        let q = question.to_lowercase();
        q.contains("subsidiary")
            || q.contains("subsidiaries")
            || q.contains("entity")
            || q.contains("highest revenue")
            || (q.contains("compare") && q.contains("revenue"))
    }

    /// The local answer for a question that cannot be served without a
    /// ledger. Checked before any external call is made.
    pub fn clarification(question: &str, ledger_loaded: bool) -> Option<String> {
        (!ledger_loaded && Self::needs_transactions(question))
            .then(|| NEEDS_TRANSACTIONS_MESSAGE.to_string())
    }

    pub fn build(&self, ctx: ChatContext<'_>) -> ContextDecision {
        if let Some(text) = Self::clarification(ctx.question, ctx.ledger_loaded) {
            return ContextDecision::Clarify(text);
        }

        let mut message = ctx.question.to_string();
        if let Some(kpi) = ctx.kpi {
            message.push_str("\n\n");
            message.push_str(&kpi.as_context_block());
        }

        let transactions = (!ctx.transactions.is_empty()).then(|| ctx.transactions.to_vec());

        ContextDecision::Send(ChatRequest {
            message,
            financial_data: ctx.statements,
            transactions,
            conversation_history: ctx.log.window(self.history_window),
            entity: ctx.entity.map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::KpiOperation;
    use serde_json::json;

    fn context<'a>(
        question: &'a str,
        transactions: &'a [Transaction],
        log: &'a ConversationLog,
    ) -> ChatContext<'a> {
        ChatContext {
            question,
            kpi: None,
            statements: None,
            transactions,
            ledger_loaded: !transactions.is_empty(),
            log,
            entity: None,
        }
    }

    #[test]
    fn test_window_keeps_last_ten_without_truncating_log() {
        let mut log = ConversationLog::new();
        for i in 0..15 {
            log.append(Message::user(format!("q{}", i)));
        }
        let window = log.window(10);
        assert_eq!(window.len(), 10);
        assert_eq!(window[0].content, "q5");
        assert_eq!(window[9].content, "q14");
        assert_eq!(log.len(), 15);
    }

    #[test]
    fn test_greeting_is_first_message() {
        let log = ConversationLog::with_greeting();
        assert_eq!(log.len(), 1);
        assert_eq!(log.messages()[0].role, Role::Assistant);
        assert!(log.messages()[0].content.ends_with("to get started."));
    }

    #[test]
    fn test_clarification_only_without_ledger() {
        let question = "Which entity grew fastest?";
        assert_eq!(
            ConversationContextBuilder::clarification(question, false).as_deref(),
            Some(NEEDS_TRANSACTIONS_MESSAGE)
        );
        assert_eq!(ConversationContextBuilder::clarification(question, true), None);
        assert_eq!(
            ConversationContextBuilder::clarification("What is revenue YTD?", false),
            None
        );
    }

    #[test]
    fn test_empty_transactions_are_omitted_from_payload() {
        let log = ConversationLog::new();
        let decision = ConversationContextBuilder::default().build(context("Hello", &[], &log));
        let ContextDecision::Send(request) = decision else {
            panic!("expected a request");
        };
        assert!(request.transactions.is_none());

        let wire = serde_json::to_value(&request).unwrap();
        assert!(wire.get("transactions").is_none());
        assert!(wire.get("financial_data").is_none());
        assert_eq!(wire["conversation_history"], json!([]));
    }

    #[test]
    fn test_kpi_result_is_appended_to_message() {
        let log = ConversationLog::new();
        let rows = vec![Transaction::from(json!({"date": "2024-01-01"}))];
        let kpi = KpiResult {
            operation: KpiOperation::RevenueYtd,
            data: json!({"total": 10}),
        };
        let mut ctx = context("Revenue YTD?", &rows, &log);
        ctx.kpi = Some(&kpi);
        ctx.entity = Some("A");

        let ContextDecision::Send(request) = ConversationContextBuilder::default().build(ctx)
        else {
            panic!("expected a request");
        };
        assert!(request
            .message
            .starts_with("Revenue YTD?\n\nKPI Calculation Result:\n"));
        assert_eq!(request.transactions.as_ref().map(Vec::len), Some(1));
        assert_eq!(request.entity.as_deref(), Some("A"));
    }

    #[test]
    fn test_entity_question_without_ledger_is_clarified() {
        let log = ConversationLog::new();
        let decision = ConversationContextBuilder::default()
            .build(context("Which subsidiary earns the most?", &[], &log));
        assert_eq!(
            decision,
            ContextDecision::Clarify(NEEDS_TRANSACTIONS_MESSAGE.to_string())
        );
    }

    #[test]
    fn test_history_entries_carry_role_and_content_only() {
        let mut log = ConversationLog::new();
        log.append(Message::user("hi"));
        log.append(Message::assistant("hello"));
        let wire = serde_json::to_value(log.window(10)).unwrap();
        assert_eq!(
            wire,
            json!([
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"}
            ])
        );
    }
}
