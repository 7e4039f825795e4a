use serde::Deserialize;

/// Event names the gateway sends to the webhook receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventKind {
    TransactionCreated,
    TransactionUpdated,
    Unknown(String),
}

impl WebhookEventKind {
    pub fn parse(event: &str) -> Self {
        match event {
            "transaction.created" => WebhookEventKind::TransactionCreated,
            "transaction.updated" => WebhookEventKind::TransactionUpdated,
            other => WebhookEventKind::Unknown(other.to_string()),
        }
    }
}

/// Webhook body: `{ event, data: { transaction: {...} } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    #[serde(default)]
    pub data: WebhookData,
}

impl WebhookEnvelope {
    pub fn kind(&self) -> WebhookEventKind {
        WebhookEventKind::parse(&self.event)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookData {
    pub transaction: Option<WebhookTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookTransaction {
    pub id: String,
    pub reference: String,
    pub status: String,
    #[serde(alias = "amount_in_cents")]
    pub amount_minor_units: Option<i64>,
    pub currency: Option<String>,
    pub status_message: Option<String>,
}
