use coin_ledger::{Error as LedgerError, ErrorKind, Ledger};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{debug, error, info};

// Include generated protobuf code
pub mod billing {
    tonic::include_proto!("billing");
}

use billing::billing_server::Billing;
use billing::operation_response::Status as OperationStatus;
use billing::{
    AccountProfile, EmissionRequest, Empty, FailureKind, OperationResponse, TransferRequest,
};

/// Profiles buffered ahead of a slow ListAccounts reader
const LIST_BUFFER: usize = 16;

pub struct BillingGrpcServer {
    ledger: Arc<Ledger>,
}

impl BillingGrpcServer {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Run a ledger call on the blocking pool
    ///
    /// Emission holds the write lock while minting every coin, so ledger
    /// calls never run on a runtime worker.
    async fn with_ledger<T, F>(&self, f: F) -> Result<T, Status>
    where
        F: FnOnce(&Ledger) -> T + Send + 'static,
        T: Send + 'static,
    {
        let ledger = self.ledger.clone();
        tokio::task::spawn_blocking(move || f(&ledger))
            .await
            .map_err(|e| {
                error!("Ledger task failed: {}", e);
                Status::internal(format!("Ledger task failed: {}", e))
            })
    }
}

fn ok_response(comment: impl Into<String>) -> OperationResponse {
    OperationResponse {
        status: OperationStatus::Ok as i32,
        comment: comment.into(),
        failure: FailureKind::None as i32,
    }
}

fn failed_response(err: &LedgerError) -> OperationResponse {
    OperationResponse {
        status: OperationStatus::Failed as i32,
        comment: format!("Failed! {}", err),
        failure: failure_kind(err.kind()) as i32,
    }
}

fn failure_kind(kind: ErrorKind) -> FailureKind {
    match kind {
        ErrorKind::Validation => FailureKind::Validation,
        ErrorKind::NotFound => FailureKind::NotFound,
        ErrorKind::InsufficientFunds => FailureKind::InsufficientFunds,
        ErrorKind::DegenerateArithmetic => FailureKind::DegenerateArithmetic,
        ErrorKind::Empty => FailureKind::Empty,
        ErrorKind::Internal => FailureKind::Internal,
    }
}

fn requested_amount(amount: i64) -> Result<u64, LedgerError> {
    u64::try_from(amount).map_err(|_| {
        LedgerError::InvalidAmount(format!("amount must be non-negative, got {}", amount))
    })
}

#[tonic::async_trait]
impl Billing for BillingGrpcServer {
    type ListAccountsStream = ReceiverStream<Result<AccountProfile, Status>>;

    async fn list_accounts(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<Self::ListAccountsStream>, Status> {
        let accounts = self.with_ledger(Ledger::accounts).await?;
        let (tx, rx) = mpsc::channel(LIST_BUFFER);

        tokio::spawn(async move {
            for account in accounts {
                let profile = AccountProfile {
                    name: account.name.to_string(),
                    balance: account.balance as i64,
                };

                // Receiver dropped: the client cancelled the stream
                if tx.send(Ok(profile)).await.is_err() {
                    debug!("ListAccounts stream closed by client");
                    break;
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn emit_coins(
        &self,
        request: Request<EmissionRequest>,
    ) -> Result<Response<OperationResponse>, Status> {
        let req = request.into_inner();

        info!("Received emission request for {} coins", req.amount);

        let result = match requested_amount(req.amount) {
            Ok(amount) => self.with_ledger(move |ledger| ledger.emit(amount)).await?,
            Err(e) => Err(e),
        };

        let response = match result {
            Ok(receipt) => ok_response(format!("OK! {} coins distributed", receipt.minted)),
            Err(e) => failed_response(&e),
        };

        Ok(Response::new(response))
    }

    async fn transfer_coins(
        &self,
        request: Request<TransferRequest>,
    ) -> Result<Response<OperationResponse>, Status> {
        let req = request.into_inner();

        info!(
            "Received transfer request: {} coins from {} to {}",
            req.amount, req.source, req.destination
        );

        let result = match requested_amount(req.amount) {
            Ok(amount) => {
                let source = req.source.clone();
                let destination = req.destination.clone();
                self.with_ledger(move |ledger| ledger.transfer(&source, &destination, amount))
                    .await?
            }
            Err(e) => Err(e),
        };

        let response = match result {
            Ok(receipt) => ok_response(format!(
                "OK! {} coins transferred from {} to {}",
                receipt.moved.len(),
                req.source,
                req.destination
            )),
            Err(e) => failed_response(&e),
        };

        Ok(Response::new(response))
    }

    async fn longest_history_coin(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<billing::Coin>, Status> {
        match self.with_ledger(Ledger::longest_history_coin).await? {
            Ok(coin) => Ok(Response::new(billing::Coin {
                id: coin.id.value() as i64,
                history: coin.history.to_string(),
            })),
            Err(LedgerError::EmptyLedger) => {
                Err(Status::not_found("Ledger holds no coins"))
            }
            Err(e) => {
                error!("Longest history query failed: {}", e);
                Err(Status::internal(format!("Query failed: {}", e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_amount() {
        assert_eq!(requested_amount(5).unwrap(), 5);
        assert!(matches!(
            requested_amount(-1),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_failed_response_carries_kind() {
        let response = failed_response(&LedgerError::AccountNotFound("ivan".to_string()));
        assert_eq!(response.status, OperationStatus::Failed as i32);
        assert_eq!(response.failure, FailureKind::NotFound as i32);
        assert!(response.comment.contains("ivan"));
    }
}
