use bigdecimal::{BigDecimal, ToPrimitive};
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{Config, Error as FailsafeError, StateMachine, backoff, failure_policy};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Enforced per-operation timeouts. Expiry is a transport failure, never a
/// gateway-reported one.
const INITIATE_TIMEOUT: Duration = Duration::from_secs(30);
const COMPLETE_TIMEOUT: Duration = Duration::from_secs(30);
const STATUS_TIMEOUT: Duration = Duration::from_secs(10);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{0}")]
    Rejected(String),
    #[error("Transaction not found: {0}")]
    NotFound(String),
    #[error("Invalid response from payments service: {0}")]
    InvalidResponse(String),
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

impl GatewayError {
    /// Transport-class errors get a generic connectivity message; gateway
    /// rejections are surfaced verbatim.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            GatewayError::Transport(_)
                | GatewayError::InvalidResponse(_)
                | GatewayError::CircuitBreakerOpen(_)
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitiatePaymentRequest<'a> {
    sender_wallet: &'a str,
    receiver_wallet: &'a str,
    amount: f64,
    currency: &'a str,
    transaction_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitiatePaymentResponse {
    success: bool,
    interaction_url: Option<String>,
    quote: Option<Value>,
    continue_uri: Option<String>,
    continue_token: Option<String>,
    error: Option<String>,
}

/// Continuation handle returned by a successful initiation. The caller
/// persists `continue_uri`/`continue_token`; the interaction URL is where
/// the paying user authorizes the grant.
#[derive(Debug, Clone)]
pub struct InitiatedPayment {
    pub interaction_url: String,
    pub quote: Option<Value>,
    pub continue_uri: String,
    pub continue_token: String,
}

#[derive(Debug, Serialize)]
struct CompletePaymentRequest<'a> {
    // Field casing follows the payments service: the interaction reference
    // arrives snake_case from the redirect, the grant handle is camelCase.
    interact_ref: &'a str,
    #[serde(rename = "continueUri")]
    continue_uri: &'a str,
    #[serde(rename = "continueToken")]
    continue_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletePaymentResponse {
    success: bool,
    payment_id: Option<String>,
    error: Option<String>,
}

/// HTTP client for the external payment-initiation service.
#[derive(Clone)]
pub struct PaymentsClient {
    client: Client,
    base_url: String,
    operating_wallet: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl PaymentsClient {
    pub fn new(base_url: String, operating_wallet: String) -> Self {
        let client = Client::builder().build().unwrap_or_default();

        let backoff = backoff::equal_jittered(Duration::from_secs(60), Duration::from_secs(120));
        let policy = failure_policy::consecutive_failures(3, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        PaymentsClient {
            client,
            base_url,
            operating_wallet,
            circuit_breaker,
        }
    }

    pub fn circuit_state(&self) -> &'static str {
        if self.circuit_breaker.is_call_permitted() {
            "closed"
        } else {
            "open"
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Asks the service to set up the payment: incoming payment, quote and
    /// an outgoing-payment grant that the user must authorize out of band.
    /// The configured operating wallet is always the sender.
    pub async fn initiate_payment(
        &self,
        receiver_wallet: &str,
        amount: &BigDecimal,
        transaction_id: Uuid,
        currency: &str,
    ) -> Result<InitiatedPayment, GatewayError> {
        let url = self.url("/initiate-payment");
        let body = InitiatePaymentRequest {
            sender_wallet: &self.operating_wallet,
            receiver_wallet,
            amount: amount.to_f64().unwrap_or(0.0),
            currency,
            transaction_id,
        };

        let client = self.client.clone();
        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .timeout(INITIATE_TIMEOUT)
                    .json(&body)
                    .send()
                    .await?;
                response
                    .json::<InitiatePaymentResponse>()
                    .await
                    .map_err(GatewayError::from)
            })
            .await;

        let parsed = flatten_breaker(result)?;
        if !parsed.success {
            return Err(GatewayError::Rejected(
                parsed
                    .error
                    .unwrap_or_else(|| "el servicio de pagos rechazó la solicitud".to_string()),
            ));
        }

        match (
            parsed.interaction_url,
            parsed.continue_uri,
            parsed.continue_token,
        ) {
            (Some(interaction_url), Some(continue_uri), Some(continue_token)) => {
                Ok(InitiatedPayment {
                    interaction_url,
                    quote: parsed.quote,
                    continue_uri,
                    continue_token,
                })
            }
            _ => Err(GatewayError::InvalidResponse(
                "successful initiation without a continuation grant".to_string(),
            )),
        }
    }

    /// Finishes a payment after the user authorized it: continues the grant
    /// with the interaction reference and executes the outgoing payment.
    /// Returns the gateway-issued payment id.
    pub async fn complete_payment(
        &self,
        transaction_id: Uuid,
        interact_ref: &str,
        continue_uri: &str,
        continue_token: &str,
    ) -> Result<String, GatewayError> {
        let url = self.url(&format!("/complete-payment/{}", transaction_id));
        let body = CompletePaymentRequest {
            interact_ref,
            continue_uri,
            continue_token,
        };

        let client = self.client.clone();
        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .timeout(COMPLETE_TIMEOUT)
                    .json(&body)
                    .send()
                    .await?;
                response
                    .json::<CompletePaymentResponse>()
                    .await
                    .map_err(GatewayError::from)
            })
            .await;

        let parsed = flatten_breaker(result)?;
        if !parsed.success {
            return Err(GatewayError::Rejected(parsed.error.unwrap_or_else(|| {
                "el servicio de pagos no pudo completar el pago".to_string()
            })));
        }

        parsed.payment_id.ok_or_else(|| {
            GatewayError::InvalidResponse("completed payment without a paymentId".to_string())
        })
    }

    /// Live status passthrough. No local state is consulted or updated.
    pub async fn transaction_status(&self, transaction_id: Uuid) -> Result<Value, GatewayError> {
        let url = self.url(&format!("/transaction-status/{}", transaction_id));

        let client = self.client.clone();
        let result = self
            .circuit_breaker
            .call(async move {
                let response = client.get(&url).timeout(STATUS_TIMEOUT).send().await?;
                if response.status() == 404 {
                    return Err(GatewayError::NotFound(transaction_id.to_string()));
                }
                response.json::<Value>().await.map_err(GatewayError::from)
            })
            .await;

        flatten_breaker(result)
    }

    pub async fn health(&self) -> Result<Value, GatewayError> {
        let url = self.url("/health");

        let client = self.client.clone();
        let result = self
            .circuit_breaker
            .call(async move {
                let response = client.get(&url).timeout(HEALTH_TIMEOUT).send().await?;
                response.json::<Value>().await.map_err(GatewayError::from)
            })
            .await;

        flatten_breaker(result)
    }
}

fn flatten_breaker<T>(result: Result<T, FailsafeError<GatewayError>>) -> Result<T, GatewayError> {
    match result {
        Ok(value) => Ok(value),
        Err(FailsafeError::Rejected) => Err(GatewayError::CircuitBreakerOpen(
            "payments service circuit breaker is open".to_string(),
        )),
        Err(FailsafeError::Inner(e)) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn test_client(base_url: String) -> PaymentsClient {
        PaymentsClient::new(base_url, "$ilp.interledger-test.dev/operador".to_string())
    }

    #[test]
    fn client_starts_with_closed_circuit() {
        let client = test_client("http://127.0.0.1:3001".to_string());
        assert_eq!(client.circuit_state(), "closed");
    }

    #[tokio::test]
    async fn initiate_payment_returns_continuation_handle() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/initiate-payment")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "success": true,
                    "transactionId": "3fa85f64-5717-4562-b3fc-2c963f66afa6",
                    "interactionUrl": "https://auth.interledger-test.dev/interact/abc",
                    "continueUri": "https://auth.interledger-test.dev/continue/xyz",
                    "continueToken": "tok-123",
                    "quote": {"debitAmount": {"value": "2500"}, "receiveAmount": {"value": "2500"}}
                }"#,
            )
            .create_async()
            .await;

        let client = test_client(server.url());
        let amount = BigDecimal::from_str("25.00").unwrap();
        let initiated = client
            .initiate_payment(
                "$ilp.interledger-test.dev/bobdev",
                &amount,
                Uuid::new_v4(),
                "USD",
            )
            .await
            .expect("initiation should succeed");

        assert_eq!(
            initiated.interaction_url,
            "https://auth.interledger-test.dev/interact/abc"
        );
        assert_eq!(initiated.continue_token, "tok-123");
        assert!(initiated.quote.is_some());
    }

    #[tokio::test]
    async fn initiate_payment_surfaces_rejection_verbatim() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/initiate-payment")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": false, "error": "No se pudo finalizar la concesión"}"#)
            .create_async()
            .await;

        let client = test_client(server.url());
        let amount = BigDecimal::from_str("25.00").unwrap();
        let result = client
            .initiate_payment("$ilp.test/bob", &amount, Uuid::new_v4(), "USD")
            .await;

        match result {
            Err(GatewayError::Rejected(msg)) => {
                assert_eq!(msg, "No se pudo finalizar la concesión");
            }
            other => panic!("expected Rejected, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn complete_payment_returns_payment_id() {
        let tx_id = Uuid::new_v4();
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", format!("/complete-payment/{}", tx_id).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true, "paymentId": "op-789", "status": "completed"}"#)
            .create_async()
            .await;

        let client = test_client(server.url());
        let payment_id = client
            .complete_payment(tx_id, "ref-1", "https://auth/continue", "tok")
            .await
            .expect("completion should succeed");

        assert_eq!(payment_id, "op-789");
    }

    #[tokio::test]
    async fn transaction_status_maps_404_to_not_found() {
        let tx_id = Uuid::new_v4();
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", format!("/transaction-status/{}", tx_id).as_str())
            .with_status(404)
            .create_async()
            .await;

        let client = test_client(server.url());
        let result = client.transaction_status(tx_id).await;
        assert!(matches!(result, Err(GatewayError::NotFound(_))));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        // Nothing listens on this port.
        let client = test_client("http://127.0.0.1:9".to_string());
        let amount = BigDecimal::from_str("1.00").unwrap();
        let result = client
            .initiate_payment("$ilp.test/bob", &amount, Uuid::new_v4(), "USD")
            .await;

        match result {
            Err(e) => assert!(e.is_transport()),
            Ok(_) => panic!("expected a transport error"),
        }
    }

    #[tokio::test]
    async fn circuit_breaker_opens_after_consecutive_failures() {
        let client = test_client("http://127.0.0.1:9".to_string());
        let amount = BigDecimal::from_str("1.00").unwrap();

        for _ in 0..3 {
            let _ = client
                .initiate_payment("$ilp.test/bob", &amount, Uuid::new_v4(), "USD")
                .await;
        }

        let result = client
            .initiate_payment("$ilp.test/bob", &amount, Uuid::new_v4(), "USD")
            .await;
        assert!(matches!(result, Err(GatewayError::CircuitBreakerOpen(_))));
        assert_eq!(client.circuit_state(), "open");
    }
}
