//! In-memory scripted graph store
//!
//! Implements the engine's client seam with full bookkeeping: sessions
//! opened and closed, transactions begun, commits and rollbacks, every
//! statement run with its parameters. Results and failures are scripted
//! per statement in FIFO order; an unscripted statement yields an empty
//! result with a clean summary.

use graphbridge::{
    ClientError, ConnectionRegistry, GraphClient, GraphSession, GraphTransaction, Notification,
    ParameterMap, Record, Result, ResultSummary, StatementResult, TransactionWork,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One statement as the store saw it
#[derive(Debug, Clone)]
pub struct RecordedStatement {
    pub statement: String,
    pub parameters: ParameterMap,
    pub read_only: bool,
}

/// A scripted response for one statement
#[derive(Debug, Clone, Default)]
pub struct ScriptedResult {
    pub records: Vec<Record>,
    pub notifications: Vec<Notification>,
}

#[derive(Default)]
struct StoreInner {
    sessions_opened: usize,
    sessions_closed: usize,
    transactions: usize,
    commits: usize,
    rollbacks: usize,
    statements: Vec<RecordedStatement>,
    committed_statements: usize,
    tx_sizes: Vec<usize>,
    scripted_results: VecDeque<ScriptedResult>,
    pending_errors: VecDeque<Option<ClientError>>,
}

/// Handle owning the scripted store; clones of the client share its state
#[derive(Clone, Default)]
pub struct MockGraphStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl MockGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store as a driver the engine can open sessions against
    pub fn client(&self) -> Arc<dyn GraphClient> {
        Arc::new(MockClient {
            inner: self.inner.clone(),
        })
    }

    /// A registry resolving exactly one connection name to this store
    pub fn registry(&self, name: &str) -> MockRegistry {
        MockRegistry {
            name: name.to_string(),
            client: self.client(),
        }
    }

    /// Queue a scripted result; consumed by statements in FIFO order
    pub fn script_result(&self, records: Vec<Record>, notifications: Vec<Notification>) {
        self.inner
            .lock()
            .unwrap()
            .scripted_results
            .push_back(ScriptedResult {
                records,
                notifications,
            });
    }

    /// Queue an error; the next statement run fails with it
    pub fn fail_next(&self, error: ClientError) {
        self.inner
            .lock()
            .unwrap()
            .pending_errors
            .push_back(Some(error));
    }

    /// Let the next statement pass; used to fail a later statement
    pub fn pass_next(&self) {
        self.inner.lock().unwrap().pending_errors.push_back(None);
    }

    pub fn sessions_opened(&self) -> usize {
        self.inner.lock().unwrap().sessions_opened
    }

    pub fn sessions_closed(&self) -> usize {
        self.inner.lock().unwrap().sessions_closed
    }

    pub fn transactions(&self) -> usize {
        self.inner.lock().unwrap().transactions
    }

    pub fn commits(&self) -> usize {
        self.inner.lock().unwrap().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.inner.lock().unwrap().rollbacks
    }

    /// Every statement the store saw, attempted or committed
    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.inner.lock().unwrap().statements.clone()
    }

    /// Statements that were part of a committed transaction
    pub fn committed_statements(&self) -> usize {
        self.inner.lock().unwrap().committed_statements
    }

    /// Statement counts per transaction, in execution order
    pub fn transaction_sizes(&self) -> Vec<usize> {
        self.inner.lock().unwrap().tx_sizes.clone()
    }
}

/// Registry resolving one configured name
pub struct MockRegistry {
    name: String,
    client: Arc<dyn GraphClient>,
}

impl ConnectionRegistry for MockRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<dyn GraphClient>> {
        if name == self.name {
            Some(self.client.clone())
        } else {
            None
        }
    }
}

struct MockClient {
    inner: Arc<Mutex<StoreInner>>,
}

impl GraphClient for MockClient {
    fn name(&self) -> &str {
        "mock"
    }

    fn open_session(&self) -> std::result::Result<Box<dyn GraphSession>, ClientError> {
        self.inner.lock().unwrap().sessions_opened += 1;
        Ok(Box::new(MockSession {
            inner: self.inner.clone(),
        }))
    }
}

struct MockSession {
    inner: Arc<Mutex<StoreInner>>,
}

impl MockSession {
    fn transaction(&mut self, read_only: bool, work: TransactionWork<'_>) -> Result<usize> {
        self.inner.lock().unwrap().transactions += 1;
        let mut tx = MockTransaction {
            inner: self.inner.clone(),
            read_only,
            statements_in_tx: 0,
        };
        match work(&mut tx) {
            Ok(processed) => {
                let mut inner = self.inner.lock().unwrap();
                inner.commits += 1;
                inner.committed_statements += tx.statements_in_tx;
                inner.tx_sizes.push(tx.statements_in_tx);
                Ok(processed)
            }
            Err(e) => {
                let mut inner = self.inner.lock().unwrap();
                inner.rollbacks += 1;
                inner.tx_sizes.push(tx.statements_in_tx);
                Err(e)
            }
        }
    }
}

impl GraphSession for MockSession {
    fn read_transaction(&mut self, work: TransactionWork<'_>) -> Result<usize> {
        self.transaction(true, work)
    }

    fn write_transaction(&mut self, work: TransactionWork<'_>) -> Result<usize> {
        self.transaction(false, work)
    }

    fn close(&mut self) {
        self.inner.lock().unwrap().sessions_closed += 1;
    }
}

struct MockTransaction {
    inner: Arc<Mutex<StoreInner>>,
    read_only: bool,
    statements_in_tx: usize,
}

impl GraphTransaction for MockTransaction {
    fn run<'t>(
        &'t mut self,
        statement: &str,
        parameters: &ParameterMap,
    ) -> std::result::Result<Box<dyn StatementResult + 't>, ClientError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(Some(error)) = inner.pending_errors.pop_front() {
            return Err(error);
        }
        inner.statements.push(RecordedStatement {
            statement: statement.to_string(),
            parameters: parameters.clone(),
            read_only: self.read_only,
        });
        self.statements_in_tx += 1;
        let scripted = inner.scripted_results.pop_front().unwrap_or_default();
        Ok(Box::new(MockResult {
            records: scripted.records.into(),
            notifications: scripted.notifications,
        }))
    }
}

struct MockResult {
    records: VecDeque<Record>,
    notifications: Vec<Notification>,
}

impl StatementResult for MockResult {
    fn next_record(&mut self) -> std::result::Result<Option<Record>, ClientError> {
        Ok(self.records.pop_front())
    }

    fn consume(&mut self) -> std::result::Result<ResultSummary, ClientError> {
        Ok(ResultSummary {
            notifications: std::mem::take(&mut self.notifications),
        })
    }
}

/// A warning notification for scripting errored summaries
pub fn warning_notification(code: &str) -> Notification {
    Notification {
        code: code.to_string(),
        title: "statement warning".to_string(),
        description: "the statement raised a warning".to_string(),
        severity: "WARNING".to_string(),
        position: None,
    }
}
