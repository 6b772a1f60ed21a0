//! Contract binding and the call/send primitives.

use std::fmt;
use std::sync::Arc;

use ballot_abi::{encode_call, ContractAbi, Token};
use ballot_rpc::{eth, EndpointConfig, LedgerTransport, TransactionRequest};
use ballot_types::{Account, TxHash};

use crate::error::{ContractError, SessionError};

/// Sender and gas budget for a state-mutating call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendOptions {
    pub from: Account,
    pub gas_limit: u64,
}

/// Where the contract handle's transport comes from.
#[derive(Clone)]
pub enum TransportSource {
    /// Build an HTTP transport for this endpoint at bind time.
    Endpoint(EndpointConfig),
    /// Use an existing transport.
    Shared(Arc<dyn LedgerTransport>),
}

/// Everything needed to bind the contract.
#[derive(Clone)]
pub struct ContractBinding {
    pub source: TransportSource,
    pub address: String,
    pub abi: ContractAbi,
}

/// A contract bound to an address, an interface schema and a transport.
///
/// Immutable once created; clones share the same transport and schema.
#[derive(Clone)]
pub struct ContractHandle {
    transport: Arc<dyn LedgerTransport>,
    address: Account,
    abi: Arc<ContractAbi>,
}

impl fmt::Debug for ContractHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractHandle")
            .field("address", &self.address)
            .field("functions", &self.abi.functions().len())
            .finish()
    }
}

impl ContractHandle {
    pub fn address(&self) -> &Account {
        &self.address
    }

    pub fn abi(&self) -> &ContractAbi {
        &self.abi
    }

    /// Read-only call against the latest ledger state.
    pub async fn call(&self, method: &str, args: &[Token]) -> Result<Vec<u8>, ContractError> {
        let function = self.abi.function(method)?;
        let data = encode_call(function, args)?;
        Ok(eth::call(self.transport.as_ref(), &self.address, &data).await?)
    }

    /// Submit a transaction; resolves once the ledger has accepted it.
    pub async fn send(
        &self,
        method: &str,
        args: &[Token],
        options: &SendOptions,
    ) -> Result<TxHash, ContractError> {
        let function = self.abi.function(method)?;
        let data = encode_call(function, args)?;
        let tx = TransactionRequest {
            from: options.from.clone(),
            to: self.address.clone(),
            data,
            gas: options.gas_limit,
        };
        Ok(eth::send_transaction(self.transport.as_ref(), &tx).await?)
    }

    /// Advisory connectivity check. Only logs; never fails.
    pub async fn probe(&self) {
        match eth::net_listening(self.transport.as_ref()).await {
            Ok(true) => tracing::info!("connected to ledger network"),
            Ok(false) => tracing::warn!("ledger node reports it is not listening"),
            Err(e) => tracing::error!(error = %e, "error connecting to ledger network"),
        }
        match eth::get_code(self.transport.as_ref(), &self.address).await {
            Ok(code) if code.is_empty() => {
                tracing::warn!(address = %self.address, "no contract code at address")
            }
            Ok(code) => tracing::debug!(address = %self.address, bytes = code.len(), "contract code present"),
            Err(e) => tracing::warn!(error = %e, "could not read contract code"),
        }
    }
}

/// Builds [`ContractHandle`]s.
pub struct ContractSession;

impl ContractSession {
    /// Build an HTTP transport for `endpoint` and bind the contract over it.
    pub async fn initialize(
        endpoint: &EndpointConfig,
        address: &str,
        abi: ContractAbi,
    ) -> Result<ContractHandle, SessionError> {
        let transport = endpoint
            .connect()
            .map_err(|e| SessionError::BindFailed(e.to_string()))?;
        Self::bind(Arc::new(transport), address, abi)
    }

    /// Bind the contract over an existing transport. Does not touch the network.
    pub fn bind(
        transport: Arc<dyn LedgerTransport>,
        address: &str,
        abi: ContractAbi,
    ) -> Result<ContractHandle, SessionError> {
        let address = Account::parse(address).map_err(|e| SessionError::BindFailed(e.to_string()))?;
        abi.require_election_methods()
            .map_err(|e| SessionError::BindFailed(e.to_string()))?;
        Ok(ContractHandle {
            transport,
            address,
            abi: Arc::new(abi),
        })
    }

    /// Bind according to a [`ContractBinding`].
    pub async fn open(binding: &ContractBinding) -> Result<ContractHandle, SessionError> {
        match &binding.source {
            TransportSource::Endpoint(endpoint) => {
                Self::initialize(endpoint, &binding.address, binding.abi.clone()).await
            }
            TransportSource::Shared(transport) => {
                Self::bind(transport.clone(), &binding.address, binding.abi.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_abi::{decode_uint, ElectionMethod, U256};
    use ballot_nullables::NullLedger;
    use ballot_types::{NetworkId, DEFAULT_CONTRACT_ADDRESS};

    fn bind(ledger: &Arc<NullLedger>) -> ContractHandle {
        ContractSession::bind(ledger.clone(), DEFAULT_CONTRACT_ADDRESS, ContractAbi::election())
            .unwrap()
    }

    #[test]
    fn bind_rejects_bad_address_and_incomplete_abi() {
        let ledger = Arc::new(NullLedger::new());
        let err = ContractSession::bind(ledger.clone(), "0x1234", ContractAbi::election()).unwrap_err();
        assert!(matches!(err, SessionError::BindFailed(_)));

        let partial = ContractAbi::from_json(r#"[{ "type": "function", "name": "Vote" }]"#).unwrap();
        let err = ContractSession::bind(ledger.clone(), DEFAULT_CONTRACT_ADDRESS, partial).unwrap_err();
        assert!(matches!(err, SessionError::BindFailed(_)));
        assert_eq!(ledger.request_count(), 0);
    }

    #[tokio::test]
    async fn initialize_without_key_fails_to_bind() {
        let endpoint = EndpointConfig::new(NetworkId::Sepolia);
        let err = ContractSession::initialize(&endpoint, DEFAULT_CONTRACT_ADDRESS, ContractAbi::election())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::BindFailed(_)));
    }

    #[tokio::test]
    async fn initialize_does_not_contact_the_node() {
        // Nothing listens on this port; binding must still succeed.
        let endpoint = EndpointConfig::new(NetworkId::Dev).with_rpc_url("http://127.0.0.1:9");
        let handle =
            ContractSession::initialize(&endpoint, DEFAULT_CONTRACT_ADDRESS, ContractAbi::election())
                .await
                .unwrap();
        assert_eq!(handle.address(), &Account::parse(DEFAULT_CONTRACT_ADDRESS).unwrap());
    }

    #[tokio::test]
    async fn call_and_send_go_through_the_transport() {
        let ledger = Arc::new(NullLedger::with_candidate_count(2));
        let handle = bind(&ledger);

        let raw = handle.call(ElectionMethod::CandidateNumber.name(), &[]).await.unwrap();
        assert_eq!(decode_uint(&raw).unwrap(), U256::from(2u64));

        let voter = Account::from_bytes([9; 20]);
        let options = SendOptions {
            from: voter,
            gas_limit: 300_000,
        };
        handle
            .send(ElectionMethod::Vote.name(), &[Token::from(1)], &options)
            .await
            .unwrap();
        assert_eq!(ledger.candidates()[1].votes, 1);

        let sent = &ledger.requests()[1];
        assert_eq!(sent.rpc_method, "eth_sendTransaction");
        assert_eq!(sent.params[0]["gas"], "0x493e0");
    }

    #[tokio::test]
    async fn send_failure_is_reported() {
        let ledger = Arc::new(NullLedger::new());
        ledger.fail("candidateRegistration");
        let handle = bind(&ledger);
        let options = SendOptions {
            from: Account::from_bytes([1; 20]),
            gas_limit: 300_000,
        };
        let err = handle
            .send(ElectionMethod::CandidateRegistration.name(), &[], &options)
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::Rpc(_)));
        assert!(ledger.candidates().is_empty());
    }

    #[tokio::test]
    async fn probe_never_fails() {
        let ledger = Arc::new(NullLedger::new());
        ledger.fail("net_listening");
        ledger.fail("eth_getCode");
        bind(&ledger).probe().await;
        assert_eq!(ledger.count("net_listening"), 1);
        assert_eq!(ledger.count("eth_getCode"), 1);
    }
}
