// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction execution with session ownership and reconnect-retry
//!
//! [`SessionHolder`] owns the driver session for one run: opened at
//! initialization, recreated after every reconnect, closed at disposal. The
//! old session is always closed before a new one opens, so no connection
//! leaks across reconnects.
//!
//! [`TransactionRunner`] executes a transaction-work unit through the holder
//! in a read or write transaction. A transient connectivity failure is
//! retried exactly once after a reconnect and cool-down when retry is
//! enabled; any other failure class, or a second transient failure,
//! propagates as fatal.

use crate::client::{GraphClient, GraphSession, TransactionWork};
use crate::error::{BridgeError, Result};
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Pause before a reconnect attempt, giving the server room to recover
pub const RECONNECT_COOLDOWN: Duration = Duration::from_secs(30);

/// Owns the driver session for one transform run
pub struct SessionHolder {
    client: Arc<dyn GraphClient>,
    session: Option<Box<dyn GraphSession>>,
    session_id: Option<Uuid>,
    cooldown: Duration,
}

impl SessionHolder {
    pub fn new(client: Arc<dyn GraphClient>) -> Self {
        Self {
            client,
            session: None,
            session_id: None,
            cooldown: RECONNECT_COOLDOWN,
        }
    }

    /// Override the reconnect cool-down; tests use a zero pause
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Open a session, closing any session already held
    pub fn open(&mut self) -> Result<()> {
        self.close();
        let session = self.client.open_session()?;
        let session_id = Uuid::new_v4();
        debug!(
            "opened session {} on connection '{}'",
            session_id,
            self.client.name()
        );
        self.session = Some(session);
        self.session_id = Some(session_id);
        Ok(())
    }

    /// Close the held session, if any
    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
            if let Some(session_id) = self.session_id.take() {
                debug!("closed session {}", session_id);
            }
        }
    }

    /// Close, pause for the cool-down, open a fresh session
    pub fn reconnect(&mut self) -> Result<()> {
        self.close();
        info!(
            "reconnecting to connection '{}' after {:?} cool-down",
            self.client.name(),
            self.cooldown
        );
        std::thread::sleep(self.cooldown);
        self.open()
    }

    /// The held session; an error when none is open
    pub fn session(&mut self) -> Result<&mut dyn GraphSession> {
        match self.session.as_deref_mut() {
            Some(session) => Ok(session),
            None => Err(BridgeError::Execution(
                "no open session; the transform was not initialized".to_string(),
            )),
        }
    }

    /// True while a session is held
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }
}

/// Input- and output-line accounting for the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCounters {
    pub lines_input: u64,
    pub lines_output: u64,
}

/// Executes transaction-work units with the single reconnect-retry
#[derive(Debug, Clone, Copy)]
pub struct TransactionRunner {
    read_only: bool,
    retry_enabled: bool,
}

impl TransactionRunner {
    pub fn new(read_only: bool, retry_enabled: bool) -> Self {
        Self {
            read_only,
            retry_enabled,
        }
    }

    /// Execute the work unit inside a read or write transaction.
    ///
    /// On a transient failure with retry enabled, reconnects once and
    /// re-invokes the same unit; the successful count updates the input- or
    /// output-line counter according to the access mode.
    pub fn execute(
        &self,
        holder: &mut SessionHolder,
        counters: &mut LineCounters,
        work: TransactionWork<'_>,
    ) -> Result<usize> {
        let processed = match self.run_once(holder, work) {
            Ok(processed) => processed,
            Err(e) if e.is_transient() && self.retry_enabled => {
                holder.reconnect()?;
                self.run_once(holder, work)?
            }
            Err(e) => return Err(e),
        };

        if self.read_only {
            counters.lines_input += processed as u64;
        } else {
            counters.lines_output += processed as u64;
        }
        debug!("processed {} statements", processed);
        Ok(processed)
    }

    fn run_once(&self, holder: &mut SessionHolder, work: TransactionWork<'_>) -> Result<usize> {
        let session = holder.session()?;
        if self.read_only {
            session.read_transaction(work)
        } else {
            session.write_transaction(work)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, GraphTransaction, StatementResult};
    use crate::value::ParameterMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakySession {
        failures_left: Arc<AtomicUsize>,
    }

    struct NoopTransaction;

    impl GraphTransaction for NoopTransaction {
        fn run<'t>(
            &'t mut self,
            _statement: &str,
            _parameters: &ParameterMap,
        ) -> std::result::Result<Box<dyn StatementResult + 't>, ClientError> {
            unimplemented!("runner tests drive the work closure directly")
        }
    }

    impl GraphSession for FlakySession {
        fn read_transaction(&mut self, work: TransactionWork<'_>) -> Result<usize> {
            self.write_transaction(work)
        }

        fn write_transaction(&mut self, work: TransactionWork<'_>) -> Result<usize> {
            let remaining = self.failures_left.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures_left.store(remaining - 1, Ordering::SeqCst);
                return Err(
                    ClientError::ServiceUnavailable("connection reset".to_string()).into(),
                );
            }
            work(&mut NoopTransaction)
        }

        fn close(&mut self) {}
    }

    struct FlakyClient {
        failures: Arc<AtomicUsize>,
        sessions_opened: Arc<AtomicUsize>,
    }

    impl GraphClient for FlakyClient {
        fn name(&self) -> &str {
            "test"
        }

        fn open_session(&self) -> std::result::Result<Box<dyn GraphSession>, ClientError> {
            self.sessions_opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FlakySession {
                failures_left: self.failures.clone(),
            }))
        }
    }

    fn holder_with_failures(
        failures: usize,
    ) -> (SessionHolder, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let failures = Arc::new(AtomicUsize::new(failures));
        let sessions_opened = Arc::new(AtomicUsize::new(0));
        let client = Arc::new(FlakyClient {
            failures: failures.clone(),
            sessions_opened: sessions_opened.clone(),
        });
        let holder = SessionHolder::new(client).with_cooldown(Duration::from_millis(0));
        (holder, failures, sessions_opened)
    }

    #[test]
    fn transient_failure_reconnects_and_retries_once() {
        let (mut holder, _failures, sessions_opened) = holder_with_failures(1);
        holder.open().unwrap();
        assert_eq!(sessions_opened.load(Ordering::SeqCst), 1);

        let runner = TransactionRunner::new(false, true);
        let mut counters = LineCounters::default();
        let mut invocations = 0;
        let processed = runner
            .execute(&mut holder, &mut counters, &mut |_tx| {
                invocations += 1;
                Ok(3)
            })
            .unwrap();

        assert_eq!(processed, 3);
        assert_eq!(invocations, 1);
        assert_eq!(sessions_opened.load(Ordering::SeqCst), 2);
        assert_eq!(counters.lines_output, 3);
    }

    #[test]
    fn retry_disabled_propagates_without_reconnect() {
        let (mut holder, _failures, sessions_opened) = holder_with_failures(1);
        holder.open().unwrap();

        let runner = TransactionRunner::new(false, false);
        let mut counters = LineCounters::default();
        let result = runner.execute(&mut holder, &mut counters, &mut |_tx| Ok(1));

        assert!(matches!(result, Err(BridgeError::Client(e)) if e.is_transient()));
        assert_eq!(sessions_opened.load(Ordering::SeqCst), 1);
        assert_eq!(counters.lines_output, 0);
    }

    #[test]
    fn second_transient_failure_is_fatal() {
        let (mut holder, _failures, sessions_opened) = holder_with_failures(2);
        holder.open().unwrap();

        let runner = TransactionRunner::new(false, true);
        let mut counters = LineCounters::default();
        let result = runner.execute(&mut holder, &mut counters, &mut |_tx| Ok(1));

        assert!(result.is_err());
        assert_eq!(sessions_opened.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn read_only_success_counts_input_lines() {
        let (mut holder, _failures, _sessions) = holder_with_failures(0);
        holder.open().unwrap();

        let runner = TransactionRunner::new(true, false);
        let mut counters = LineCounters::default();
        runner
            .execute(&mut holder, &mut counters, &mut |_tx| Ok(5))
            .unwrap();
        assert_eq!(counters.lines_input, 5);
        assert_eq!(counters.lines_output, 0);
    }
}
