//! Reads bills with a multimodal model behind an OpenAI compatible chat completions API.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{Error, expense::ExpensePrefill, receipt::ReceiptFileType};

const SCAN_PROMPT: &str = "Read this bill or receipt. Reply with only a JSON object with the keys \
merchant_name (string), total_amount (number), bill_date (YYYY-MM-DD), tax_amount (number) and \
category_suggestion (a short spending category such as Food, Transport or Shopping). \
Use null for anything you cannot read.";

const BILL_DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Where and how to reach the AI gateway used for scanning bills.
#[derive(Debug, Clone, Default)]
pub struct ScannerConfig {
    /// The chat completions URL, e.g. "https://api.openai.com/v1/chat/completions".
    pub url: String,
    pub model: String,
    /// Scanning is disabled when no key is set.
    pub api_key: Option<String>,
}

impl ScannerConfig {
    pub fn is_enabled(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|api_key| !api_key.trim().is_empty())
    }
}

/// The details read from a bill. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScannedBill {
    #[serde(default)]
    pub merchant_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub bill_date: Option<Date>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub tax_amount: Option<f64>,
    #[serde(default)]
    pub category_suggestion: Option<String>,
}

impl ScannedBill {
    /// The values to fill the new expense form with.
    pub fn into_prefill(self, receipt_path: String) -> ExpensePrefill {
        ExpensePrefill {
            amount: self.total_amount.filter(|amount| *amount > 0.0),
            date: self.bill_date,
            description: self.merchant_name.filter(|name| !name.trim().is_empty()),
            category: self.category_suggestion,
            receipt_path: Some(receipt_path),
        }
    }
}

/// Accept amounts given as numbers or as text such as "$12.50".
fn lenient_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let amount = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => {
            let cleaned: String = text
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };

    Ok(amount.filter(|amount| amount.is_finite()))
}

/// Accept dates in the form "2025-03-04", anything else is treated as unreadable.
fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Date>, D::Error> {
    let date = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Date::parse(text.trim(), BILL_DATE_FORMAT).ok(),
        _ => None,
    };

    Ok(date)
}

/// Parse the model's reply into a [ScannedBill].
///
/// The JSON object may be wrapped in a markdown code fence or surrounded by prose.
///
/// # Errors
///
/// Returns [Error::ScannerResponseInvalid] if no JSON object can be found.
pub fn parse_scan_response(content: &str) -> Result<ScannedBill, Error> {
    let content = content.trim();
    let start = content.find('{');
    let end = content.rfind('}');

    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => {
            return Err(Error::ScannerResponseInvalid(
                "the reply did not contain a JSON object".to_owned(),
            ));
        }
    };

    serde_json::from_str(json).map_err(|error| Error::ScannerResponseInvalid(error.to_string()))
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Build the chat completion request for one bill.
fn scan_request_body(model: &str, file_type: ReceiptFileType, bytes: &[u8]) -> Value {
    let data_url = format!("data:{};base64,{}", file_type.mime_type(), STANDARD.encode(bytes));

    json!({
        "model": model,
        "temperature": 0,
        "messages": [{
            "role": "user",
            "content": [
                { "type": "text", "text": SCAN_PROMPT },
                { "type": "image_url", "image_url": { "url": data_url } }
            ]
        }]
    })
}

/// Send a bill to the AI gateway and read the details off it.
///
/// # Errors
///
/// Returns [Error::ScannerNotConfigured] without making a request if no API key is set,
/// [Error::ScannerRequestFailed] if the gateway cannot be reached or replies with an
/// error status, and [Error::ScannerResponseInvalid] if the reply cannot be understood.
pub async fn scan_bill(
    client: &reqwest::Client,
    config: &ScannerConfig,
    file_type: ReceiptFileType,
    bytes: &[u8],
) -> Result<ScannedBill, Error> {
    let Some(api_key) = config.api_key.as_deref().filter(|_| config.is_enabled()) else {
        return Err(Error::ScannerNotConfigured);
    };

    let response = client
        .post(&config.url)
        .bearer_auth(api_key)
        .json(&scan_request_body(&config.model, file_type, bytes))
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|error| {
            tracing::error!("Bill scanner request failed: {error}");
            Error::ScannerRequestFailed(error.to_string())
        })?;

    let completion: ChatCompletion = response.json().await.map_err(|error| {
        tracing::error!("Could not decode bill scanner response: {error}");
        Error::ScannerResponseInvalid(error.to_string())
    })?;

    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| Error::ScannerResponseInvalid("the reply was empty".to_owned()))?;

    tracing::debug!("Bill scanner replied: {content}");

    parse_scan_response(&content)
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{Error, receipt::ReceiptFileType};

    use super::{
        ScannedBill, ScannerConfig, parse_scan_response, scan_bill, scan_request_body,
    };

    #[test]
    fn parses_plain_json() {
        let got = parse_scan_response(
            r#"{"merchant_name": "Cafe", "total_amount": 12.5, "bill_date": "2025-03-04",
            "tax_amount": 1.63, "category_suggestion": "Food"}"#,
        );

        assert_eq!(
            got,
            Ok(ScannedBill {
                merchant_name: Some("Cafe".to_owned()),
                total_amount: Some(12.5),
                bill_date: Some(date!(2025 - 03 - 04)),
                tax_amount: Some(1.63),
                category_suggestion: Some("Food".to_owned()),
            })
        );
    }

    #[test]
    fn parses_json_in_code_fence() {
        let reply = "Here you go:\n```json\n{\"merchant_name\": \"Deli\", \"total_amount\": \"$8.20\"}\n```";

        let got = parse_scan_response(reply).unwrap();

        assert_eq!(got.merchant_name.as_deref(), Some("Deli"));
        assert_eq!(got.total_amount, Some(8.2));
        assert_eq!(got.bill_date, None);
    }

    #[test]
    fn unreadable_fields_become_none() {
        let got = parse_scan_response(
            r#"{"merchant_name": null, "total_amount": "unknown", "bill_date": "last tuesday"}"#,
        )
        .unwrap();

        assert_eq!(got, ScannedBill::default());
    }

    #[test]
    fn reply_without_json_is_invalid() {
        assert!(matches!(
            parse_scan_response("I could not read this image."),
            Err(Error::ScannerResponseInvalid(_))
        ));
    }

    #[test]
    fn request_embeds_image_as_data_url() {
        let body = scan_request_body("vision-model", ReceiptFileType::Png, b"abc");

        assert_eq!(body["model"], "vision-model");
        assert_eq!(
            body["messages"][0]["content"][1]["image_url"]["url"],
            "data:image/png;base64,YWJj"
        );
    }

    #[test]
    fn prefill_drops_blank_values() {
        let bill = ScannedBill {
            merchant_name: Some(" ".to_owned()),
            total_amount: Some(0.0),
            ..Default::default()
        };

        let prefill = bill.into_prefill("1/a.png".to_owned());

        assert_eq!(prefill.description, None);
        assert_eq!(prefill.amount, None);
        assert_eq!(prefill.receipt_path.as_deref(), Some("1/a.png"));
    }

    #[tokio::test]
    async fn scanning_without_api_key_fails_fast() {
        let config = ScannerConfig {
            url: "http://127.0.0.1:9/never-called".to_owned(),
            model: "vision-model".to_owned(),
            api_key: None,
        };

        let got = scan_bill(&reqwest::Client::new(), &config, ReceiptFileType::Png, b"abc").await;

        assert_eq!(got, Err(Error::ScannerNotConfigured));
    }
}
