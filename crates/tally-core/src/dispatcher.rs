//! Message dispatcher
//!
//! Drives one chat message through the assistant: ask the model for an
//! envelope, normalize it, audit it, then create, list or analyze purchases
//! depending on the action.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ai::{AIBackend, AIClient, AnalyticsPayload};
use crate::envelope::{parse_envelope, Action, AiEnvelope};
use crate::error::{Error, Result};
use crate::filter::build_filter;
use crate::models::{Caller, Purchase};
use crate::store::PurchaseStore;

/// Result of a successfully handled message
///
/// Serializes to the response body clients receive.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DispatchOutcome {
    Created {
        message: String,
        purchase: Purchase,
    },
    Listed {
        message: String,
        purchases: Vec<Purchase>,
        total: usize,
    },
    Analyzed {
        message: String,
        analysis: AnalyticsPayload,
    },
}

impl DispatchOutcome {
    /// The action that produced this outcome
    pub fn action(&self) -> Action {
        match self {
            Self::Created { .. } => Action::Add,
            Self::Listed { .. } => Action::Query,
            Self::Analyzed { .. } => Action::Analyze,
        }
    }

    /// Text shown to the user
    pub fn message(&self) -> &str {
        match self {
            Self::Created { message, .. }
            | Self::Listed { message, .. }
            | Self::Analyzed { message, .. } => message,
        }
    }
}

/// Routes messages to store operations on behalf of an authenticated caller
pub struct MessageDispatcher<'a> {
    store: &'a dyn PurchaseStore,
    ai: &'a AIClient,
}

impl<'a> MessageDispatcher<'a> {
    pub fn new(store: &'a dyn PurchaseStore, ai: &'a AIClient) -> Self {
        Self { store, ai }
    }

    /// Handle one message from `caller`
    ///
    /// Model failures surface as `ExternalService`. Output that is not a
    /// valid envelope fails with `MalformedAiOutput` before anything is
    /// logged or written.
    pub async fn handle_message(&self, caller: &Caller, message: &str) -> Result<DispatchOutcome> {
        let raw = self.ai.interpret_message(caller, message).await?;
        debug!(user_id = caller.user_id, "Model output: {}", raw);

        let envelope = parse_envelope(&raw)?;
        info!(
            user_id = caller.user_id,
            action = %envelope.action,
            "Dispatching message"
        );

        if let Err(e) = self
            .store
            .record_ai_log(Some(caller.user_id), message, &raw)
        {
            warn!(user_id = caller.user_id, "Failed to record AI log: {}", e);
        }

        self.dispatch(caller, envelope).await
    }

    async fn dispatch(&self, caller: &Caller, envelope: AiEnvelope) -> Result<DispatchOutcome> {
        match envelope.action {
            Action::Add => self.add(caller, envelope),
            Action::Query => self.query(caller, envelope),
            Action::Analyze => self.analyze(caller, envelope).await,
            Action::Unknown(action) => Err(Error::UnknownAction {
                action,
                reply: envelope.assistant_reply,
            }),
        }
    }

    fn add(&self, caller: &Caller, envelope: AiEnvelope) -> Result<DispatchOutcome> {
        let new_purchase = envelope
            .purchase
            .into_new_purchase(caller.user_id, Utc::now())
            .map_err(|reason| Error::InvalidPurchase {
                reason,
                reply: envelope.assistant_reply.clone(),
            })?;

        let purchase = self.store.insert_purchase(&new_purchase)?;
        info!(
            user_id = caller.user_id,
            purchase_id = purchase.id,
            "Created purchase"
        );

        Ok(DispatchOutcome::Created {
            message: envelope.assistant_reply,
            purchase,
        })
    }

    fn query(&self, caller: &Caller, envelope: AiEnvelope) -> Result<DispatchOutcome> {
        let filter = build_filter(&envelope.filters, &envelope.request_context, caller);
        let purchases = self.store.list_purchases(&filter)?;

        Ok(DispatchOutcome::Listed {
            message: envelope.assistant_reply,
            total: purchases.len(),
            purchases,
        })
    }

    async fn analyze(&self, caller: &Caller, envelope: AiEnvelope) -> Result<DispatchOutcome> {
        let filter = build_filter(&envelope.filters, &envelope.request_context, caller);

        let total_amount = self.store.sum_purchases(&filter)?;
        let top = self.store.top_category(&filter)?;
        let purchase_count = self.store.count_purchases(&filter)?;

        let analysis = AnalyticsPayload {
            total_amount,
            top_category: top.category,
            top_category_total: top.total,
            purchase_count,
            filters: envelope.filters,
        };

        let summary = self.ai.summarize_analysis(&analysis).await?;

        Ok(DispatchOutcome::Analyzed {
            message: summary.text,
            analysis,
        })
    }
}
