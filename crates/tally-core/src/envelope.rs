//! AI output envelope normalizer
//!
//! The model is asked to answer with exactly one JSON object describing what
//! the user wants. Its shape drifts between prompt versions: purchase fields
//! may sit directly under `data` or under `data.extracted`, sections may be
//! missing or `null`, keys may be camelCase. [`parse_envelope`] absorbs that
//! drift in one place and hands back fully typed structures, so nothing past
//! this module touches untyped JSON.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::coerce;
use crate::error::{Error, Result};
use crate::models::{Necessity, NewPurchase, PurchaseStatus};

/// What the model decided the user wants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Record a new purchase
    Add,
    /// List matching purchases
    Query,
    /// Aggregate matching purchases and summarize them
    Analyze,
    /// Anything else the model produced, kept verbatim
    Unknown(String),
}

impl Action {
    /// Classify an action string. Matching is exact and case-sensitive.
    pub fn classify(action: &str) -> Self {
        match action {
            "add" | "create_purchase" => Self::Add,
            "query" | "get_purchases" => Self::Query,
            "analyze" => Self::Analyze,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Add => "add",
            Self::Query => "query",
            Self::Analyze => "analyze",
            Self::Unknown(raw) => raw,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the purchase fields were found inside `data`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataLayout {
    /// `data.extracted` was an object and held the fields
    Extracted,
    /// The fields sat directly under `data`
    #[default]
    Flat,
}

impl DataLayout {
    /// Pick the object holding purchase fields
    fn resolve(data: &Map<String, Value>) -> (Self, &Map<String, Value>) {
        match data.get("extracted") {
            Some(Value::Object(inner)) => (Self::Extracted, inner),
            _ => (Self::Flat, data),
        }
    }
}

/// Purchase fields proposed by the model, each coerced independently
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PurchaseDraft {
    pub title: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub vendor: Option<String>,
    pub purchase_time: Option<DateTime<Utc>>,
    pub necessity: Option<Necessity>,
    pub emotional_tone: Option<String>,
    pub reason_guess: Option<String>,
    pub confidence: Option<f64>,
}

impl PurchaseDraft {
    fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            title: obj.get("title").and_then(coerce::non_empty_string),
            amount: obj.get("amount").and_then(coerce::number),
            currency: obj.get("currency").and_then(coerce::string),
            category: obj.get("category").and_then(coerce::string),
            subcategory: obj.get("subcategory").and_then(coerce::string),
            vendor: obj.get("vendor").and_then(coerce::non_empty_string),
            purchase_time: obj.get("purchase_time").and_then(coerce::timestamp),
            necessity: obj
                .get("necessity")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok()),
            emotional_tone: obj.get("emotional_tone").and_then(coerce::string),
            reason_guess: obj.get("reason_guess").and_then(coerce::string),
            confidence: obj
                .get("confidence")
                .and_then(coerce::number)
                .map(|c| c.clamp(0.0, 1.0)),
        }
    }

    /// Turn the draft into an insertable purchase owned by `user_id`
    ///
    /// Fails with a human-readable reason when the title is missing or the
    /// amount is not positive. A missing purchase time defaults to `now`.
    pub fn into_new_purchase(
        self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> std::result::Result<NewPurchase, String> {
        let title = self.title.ok_or_else(|| "title is required".to_string())?;
        let amount = match self.amount {
            Some(a) if a > 0.0 => a,
            _ => return Err("amount must be greater than zero".to_string()),
        };

        Ok(NewPurchase {
            user_id,
            title,
            amount,
            currency: self.currency.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            subcategory: self.subcategory.unwrap_or_default(),
            vendor: self.vendor,
            necessity: self.necessity,
            emotional_tone: self.emotional_tone.unwrap_or_default(),
            reason_guess: self.reason_guess.unwrap_or_default(),
            confidence: self.confidence.unwrap_or(0.0),
            purchase_time: self.purchase_time.unwrap_or(now),
            status: PurchaseStatus::Confirmed,
        })
    }
}

/// Filter constraints requested by the model
///
/// Amount bounds of zero are already dropped. Keywords are carried for
/// display but do not constrain queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl FilterRequest {
    fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            from_date: obj.get("from_date").and_then(coerce::date),
            to_date: obj.get("to_date").and_then(coerce::date),
            categories: obj
                .get("categories")
                .map(coerce::string_list)
                .unwrap_or_default(),
            min_amount: coerce::amount_bound(obj.get("min_amount")),
            max_amount: coerce::amount_bound(obj.get("max_amount")),
            keywords: obj
                .get("keywords")
                .map(coerce::string_list)
                .unwrap_or_default(),
        }
    }
}

/// Who the model thinks the request is about
///
/// `user_role` is descriptive only; authorization always uses the
/// authenticated caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub user_role: Option<String>,
    pub target_users: Vec<i64>,
}

impl RequestContext {
    fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            user_role: field(obj, &["user_role", "userRole"]).and_then(coerce::string),
            target_users: field(obj, &["target_users", "targetUsers"])
                .map(coerce::id_list)
                .unwrap_or_default(),
        }
    }
}

/// The model's description of the analysis it has in mind
///
/// Descriptive only: the analyze path always computes the same aggregates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisRequest {
    pub intent: Option<String>,
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
    pub compare: Option<bool>,
    pub aggregation_level: Option<String>,
    pub output_type: Option<String>,
    pub details: Option<String>,
}

impl AnalysisRequest {
    fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            intent: obj.get("intent").and_then(coerce::non_empty_string),
            dimensions: obj
                .get("dimensions")
                .map(coerce::string_list)
                .unwrap_or_default(),
            metrics: obj
                .get("metrics")
                .map(coerce::string_list)
                .unwrap_or_default(),
            compare: obj.get("compare").and_then(Value::as_bool),
            aggregation_level: obj
                .get("aggregation_level")
                .and_then(coerce::non_empty_string),
            output_type: obj.get("output_type").and_then(coerce::non_empty_string),
            details: obj.get("details").and_then(coerce::non_empty_string),
        }
    }
}

/// A normalized model answer
#[derive(Debug, Clone, PartialEq)]
pub struct AiEnvelope {
    pub action: Action,
    pub request_context: RequestContext,
    pub data_layout: DataLayout,
    pub purchase: PurchaseDraft,
    pub filters: FilterRequest,
    pub analysis: AnalysisRequest,
    pub assistant_reply: String,
}

/// Parse raw model text into an [`AiEnvelope`]
///
/// The text must be exactly one JSON object. Code fences or prose around it
/// are not stripped and make the output malformed. `action` must be a
/// string; every other section is optional and defaults to empty when absent
/// or `null`.
pub fn parse_envelope(raw: &str) -> Result<AiEnvelope> {
    let value: Value = serde_json::from_str(raw).map_err(|e| malformed(raw, e.to_string()))?;

    let Value::Object(root) = value else {
        return Err(malformed(raw, "expected a JSON object"));
    };

    let action = match root.get("action") {
        Some(Value::String(action)) => Action::classify(action),
        Some(Value::Null) | None => return Err(malformed(raw, "missing action")),
        Some(_) => return Err(malformed(raw, "action must be a string")),
    };

    let empty = Map::new();
    let data = object(root.get("data")).unwrap_or(&empty);
    let (data_layout, purchase_fields) = DataLayout::resolve(data);

    Ok(AiEnvelope {
        action,
        request_context: RequestContext::from_object(
            object(field(&root, &["request_context", "requestContext"])).unwrap_or(&empty),
        ),
        data_layout,
        purchase: PurchaseDraft::from_object(purchase_fields),
        filters: FilterRequest::from_object(object(root.get("filters")).unwrap_or(&empty)),
        analysis: AnalysisRequest::from_object(object(root.get("analysis")).unwrap_or(&empty)),
        assistant_reply: field(&root, &["assistant_reply", "assistantReply"])
            .and_then(coerce::string)
            .unwrap_or_default(),
    })
}

fn malformed(raw: &str, reason: impl Into<String>) -> Error {
    Error::MalformedAiOutput {
        reason: reason.into(),
        raw: raw.to_string(),
    }
}

/// First non-null value under any of `keys`
fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn object(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value.and_then(Value::as_object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_action_synonyms() {
        assert_eq!(Action::classify("add"), Action::Add);
        assert_eq!(Action::classify("create_purchase"), Action::Add);
        assert_eq!(Action::classify("query"), Action::Query);
        assert_eq!(Action::classify("get_purchases"), Action::Query);
        assert_eq!(Action::classify("analyze"), Action::Analyze);
        // Case-sensitive
        assert_eq!(
            Action::classify("Add"),
            Action::Unknown("Add".to_string())
        );
    }

    #[test]
    fn test_code_fence_is_malformed() {
        let raw = "```json\n{\"action\": \"add\"}\n```";
        let err = parse_envelope(raw).unwrap_err();
        match err {
            Error::MalformedAiOutput { raw: attached, .. } => assert_eq!(attached, raw),
            other => panic!("expected MalformedAiOutput, got {:?}", other),
        }
    }

    #[test]
    fn test_prose_around_json_is_malformed() {
        let raw = r#"Sure! Here you go: {"action": "query"}"#;
        assert!(matches!(
            parse_envelope(raw),
            Err(Error::MalformedAiOutput { .. })
        ));

        let raw = r#"{"action": "query"} hope that helps"#;
        assert!(matches!(
            parse_envelope(raw),
            Err(Error::MalformedAiOutput { .. })
        ));
    }

    #[test]
    fn test_non_object_is_malformed() {
        assert!(matches!(
            parse_envelope(r#"["add"]"#),
            Err(Error::MalformedAiOutput { .. })
        ));
    }

    #[test]
    fn test_missing_or_non_string_action() {
        let err = parse_envelope(r#"{"data": {}}"#).unwrap_err();
        assert!(err.to_string().contains("missing action"));

        let err = parse_envelope(r#"{"action": null}"#).unwrap_err();
        assert!(err.to_string().contains("missing action"));

        let err = parse_envelope(r#"{"action": 3}"#).unwrap_err();
        assert!(err.to_string().contains("action must be a string"));
    }

    #[test]
    fn test_unknown_action_is_not_an_error() {
        let env = parse_envelope(r#"{"action": "delete", "assistant_reply": "Hmm"}"#).unwrap();
        assert_eq!(env.action, Action::Unknown("delete".to_string()));
        assert_eq!(env.assistant_reply, "Hmm");
    }

    #[test]
    fn test_minimal_envelope_defaults_everything() {
        let env = parse_envelope(
            r#"{"action": "query", "filters": null, "analysis": null, "data": null}"#,
        )
        .unwrap();
        assert_eq!(env.action, Action::Query);
        assert_eq!(env.filters, FilterRequest::default());
        assert_eq!(env.analysis, AnalysisRequest::default());
        assert_eq!(env.request_context, RequestContext::default());
        assert_eq!(env.purchase, PurchaseDraft::default());
        assert_eq!(env.assistant_reply, "");
    }

    #[test]
    fn test_extracted_layout() {
        let env = parse_envelope(
            r#"{
                "action": "add",
                "data": {"title": "ignored", "extracted": {"title": "Coffee", "amount": "4.5"}}
            }"#,
        )
        .unwrap();
        assert_eq!(env.data_layout, DataLayout::Extracted);
        assert_eq!(env.purchase.title.as_deref(), Some("Coffee"));
        assert_eq!(env.purchase.amount, Some(4.5));
    }

    #[test]
    fn test_flat_layout_when_extracted_not_an_object() {
        let env = parse_envelope(
            r#"{"action": "add", "data": {"extracted": "n/a", "title": "Book", "amount": 12}}"#,
        )
        .unwrap();
        assert_eq!(env.data_layout, DataLayout::Flat);
        assert_eq!(env.purchase.title.as_deref(), Some("Book"));
        assert_eq!(env.purchase.amount, Some(12.0));
    }

    #[test]
    fn test_purchase_fields_are_coerced() {
        let env = parse_envelope(
            r#"{
                "action": "add",
                "data": {
                    "title": "Sneakers",
                    "amount": 89.99,
                    "currency": "USD",
                    "category": "Clothing",
                    "subcategory": 7,
                    "vendor": "",
                    "purchase_time": "2024-04-10",
                    "necessity": "Medium",
                    "emotional_tone": "excited",
                    "reason_guess": "treat",
                    "confidence": 1.7
                }
            }"#,
        )
        .unwrap();

        let draft = env.purchase;
        assert_eq!(draft.subcategory, None);
        assert_eq!(draft.vendor, None);
        assert_eq!(draft.necessity, Some(Necessity::Medium));
        assert_eq!(draft.confidence, Some(1.0));
        assert_eq!(
            draft.purchase_time,
            Some(Utc.with_ymd_and_hms(2024, 4, 10, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_filters_and_context() {
        let env = parse_envelope(
            r#"{
                "action": "query",
                "request_context": {"user_role": "admin", "target_users": [2, "3", "x"]},
                "filters": {
                    "from_date": "2024-01-01",
                    "to_date": "last week",
                    "categories": ["Food", 12, ""],
                    "min_amount": 0,
                    "max_amount": "250",
                    "keywords": "coffee"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(env.request_context.user_role.as_deref(), Some("admin"));
        assert_eq!(env.request_context.target_users, vec![2, 3]);
        assert_eq!(
            env.filters.from_date,
            Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
        assert_eq!(env.filters.to_date, None);
        assert_eq!(env.filters.categories, vec!["Food".to_string()]);
        assert_eq!(env.filters.min_amount, None);
        assert_eq!(env.filters.max_amount, Some(250.0));
        assert_eq!(env.filters.keywords, vec!["coffee".to_string()]);
    }

    #[test]
    fn test_camel_case_keys() {
        let env = parse_envelope(
            r#"{
                "action": "query",
                "requestContext": {"userRole": "user", "targetUsers": [5]},
                "assistantReply": "Here are your purchases"
            }"#,
        )
        .unwrap();
        assert_eq!(env.request_context.target_users, vec![5]);
        assert_eq!(env.request_context.user_role.as_deref(), Some("user"));
        assert_eq!(env.assistant_reply, "Here are your purchases");
    }

    #[test]
    fn test_analysis_section() {
        let env = parse_envelope(
            r#"{
                "action": "analyze",
                "analysis": {
                    "intent": "spending_breakdown",
                    "dimensions": ["category"],
                    "metrics": ["sum", "count"],
                    "compare": false,
                    "aggregation_level": "month",
                    "output_type": "summary"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(env.analysis.intent.as_deref(), Some("spending_breakdown"));
        assert_eq!(env.analysis.metrics, vec!["sum", "count"]);
        assert_eq!(env.analysis.compare, Some(false));
        assert_eq!(env.analysis.details, None);
    }

    #[test]
    fn test_draft_validation() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        let missing_title = PurchaseDraft {
            amount: Some(5.0),
            ..Default::default()
        };
        assert_eq!(
            missing_title.into_new_purchase(1, now).unwrap_err(),
            "title is required"
        );

        let zero_amount = PurchaseDraft {
            title: Some("Gum".into()),
            amount: Some(0.0),
            ..Default::default()
        };
        assert_eq!(
            zero_amount.into_new_purchase(1, now).unwrap_err(),
            "amount must be greater than zero"
        );

        let ok = PurchaseDraft {
            title: Some("Gum".into()),
            amount: Some(1.25),
            ..Default::default()
        }
        .into_new_purchase(7, now)
        .unwrap();
        assert_eq!(ok.user_id, 7);
        assert_eq!(ok.purchase_time, now);
        assert_eq!(ok.status, PurchaseStatus::Confirmed);
    }
}
