//! One reconciliation session: the loaded table, the reference source and
//! the latest result

use crate::config::ReconConfig;
use crate::error::{Error, Result};
use crate::reconciler::ReconciliationResult;
use crate::source::QueryExecutor;
use crate::table::Table;
use std::path::Path;
use tracing::{debug, info, warn};

/// Marks the start of a load or run; only the newest ticket may commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTicket {
    generation: u64,
}

/// Fetch the reference records and join them to `imported`.
///
/// Query failures are returned as errors. Any failure of the join itself is
/// logged and reported as an empty result, so callers see a single
/// matches/no-matches signal.
pub fn execute_run<E>(executor: &E, config: &ReconConfig, imported: &Table) -> Result<ReconciliationResult>
where
    E: QueryExecutor + ?Sized,
{
    info!(rows = imported.row_count(), "running reference query");
    let reference = executor.execute(&config.reference_query, &config.connection)?;
    info!(records = reference.row_count(), "reference records fetched");

    match config.reconciler().reconcile(&reference, imported) {
        Ok(result) => {
            if result.is_empty() {
                info!("no matching checks found");
            } else {
                info!(matches = result.row_count(), "matching checks found");
            }
            Ok(result)
        }
        Err(e) => {
            warn!(error = %e, "reconciliation failed, reporting no matches");
            Ok(ReconciliationResult::empty())
        }
    }
}

/// Exclusively owns the current imported table and current result; both
/// are replaced whole by each load or run.
#[derive(Debug)]
pub struct ReconciliationSession<E> {
    executor: E,
    config: ReconConfig,
    imported: Option<Table>,
    result: Option<ReconciliationResult>,
    generation: u64,
}

impl<E: QueryExecutor> ReconciliationSession<E> {
    pub fn new(executor: E, config: ReconConfig) -> Self {
        Self {
            executor,
            config,
            imported: None,
            result: None,
            generation: 0,
        }
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// The most recently loaded table
    pub fn imported(&self) -> Option<&Table> {
        self.imported.as_ref()
    }

    /// The most recent result
    pub fn result(&self) -> Option<&ReconciliationResult> {
        self.result.as_ref()
    }

    /// Start a load or run; invalidates every earlier ticket
    pub fn begin(&mut self) -> RunTicket {
        self.generation += 1;
        RunTicket {
            generation: self.generation,
        }
    }

    /// True when no load or run has started since `ticket` was issued
    pub fn is_current(&self, ticket: RunTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Store a loaded table if `ticket` is still current. The previous result
    /// belongs to the old table and is dropped.
    pub fn commit_load(&mut self, ticket: RunTicket, table: Table) -> bool {
        if !self.is_current(ticket) {
            debug!(generation = ticket.generation, "discarding stale load");
            return false;
        }
        self.imported = Some(table);
        self.result = None;
        true
    }

    /// Store a result if `ticket` is still current
    pub fn commit_run(&mut self, ticket: RunTicket, result: ReconciliationResult) -> bool {
        if !self.is_current(ticket) {
            debug!(generation = ticket.generation, "discarding stale result");
            return false;
        }
        self.result = Some(result);
        true
    }

    /// Load `path` with the configured header keywords and make it current
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<&Table> {
        let ticket = self.begin();
        let table = self.config.loader().load(path)?;
        self.commit_load(ticket, table);
        self.imported.as_ref().ok_or(Error::NoTableLoaded)
    }

    /// Replace the current table with `imported`, then fetch and join
    pub fn run(&mut self, imported: Table) -> Result<&ReconciliationResult> {
        let ticket = self.begin();
        self.imported = Some(imported);
        self.result = None;
        self.run_ticket(ticket)
    }

    /// Fetch and join again against the current table
    pub fn run_current(&mut self) -> Result<&ReconciliationResult> {
        let ticket = self.begin();
        self.result = None;
        self.run_ticket(ticket)
    }

    fn run_ticket(&mut self, ticket: RunTicket) -> Result<&ReconciliationResult> {
        let imported = self.imported.as_ref().ok_or(Error::NoTableLoaded)?;
        let result = execute_run(&self.executor, &self.config, imported)?;
        self.commit_run(ticket, result);
        Ok(self.result.get_or_insert_with(ReconciliationResult::empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CellValue;
    use std::cell::Cell;

    fn reference() -> Table {
        Table::from_parts(
            vec!["CHECK_NUM".to_string(), "CHECK_AMT".to_string()],
            vec![
                vec![CellValue::String("0099".to_string()), CellValue::Float(1.0)],
                vec![CellValue::Integer(100), CellValue::Float(2.0)],
            ],
        )
    }

    fn imported(keys: &[i64]) -> Table {
        Table::from_parts(
            vec!["Payment/SerialNumber".to_string()],
            keys.iter().map(|k| vec![CellValue::Integer(*k)]).collect(),
        )
    }

    struct CountingExecutor {
        calls: Cell<usize>,
    }

    impl QueryExecutor for CountingExecutor {
        fn execute(&self, _query: &str, _connection: &str) -> Result<Table> {
            self.calls.set(self.calls.get() + 1);
            Ok(reference())
        }
    }

    #[test]
    fn test_run_matches() {
        let executor = |_: &str, _: &str| -> Result<Table> { Ok(reference()) };
        let mut session = ReconciliationSession::new(executor, ReconConfig::default());

        let result = session.run(imported(&[99, 5])).unwrap();
        assert_eq!(result.row_count(), 1);
        assert!(session.imported().is_some());
    }

    #[test]
    fn test_each_run_queries_again() {
        let executor = CountingExecutor {
            calls: Cell::new(0),
        };
        let mut session = ReconciliationSession::new(executor, ReconConfig::default());

        session.run(imported(&[99])).unwrap();
        session.run_current().unwrap();
        assert_eq!(session.executor().calls.get(), 2);
    }

    #[test]
    fn test_join_failure_collapses_to_empty() {
        let executor = |_: &str, _: &str| -> Result<Table> { Ok(reference()) };
        let mut session = ReconciliationSession::new(executor, ReconConfig::default());

        let no_key = Table::from_parts(
            vec!["Amount".to_string()],
            vec![vec![CellValue::Integer(99)]],
        );
        let result = session.run(no_key).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_query_failure_is_error() {
        let executor =
            |_: &str, _: &str| -> Result<Table> { Err(Error::Query("connection refused".to_string())) };
        let mut session = ReconciliationSession::new(executor, ReconConfig::default());

        assert!(matches!(
            session.run(imported(&[99])),
            Err(Error::Query(_))
        ));
        assert!(session.result().is_none());
    }

    #[test]
    fn test_run_without_table() {
        let executor = |_: &str, _: &str| -> Result<Table> { Ok(reference()) };
        let mut session = ReconciliationSession::new(executor, ReconConfig::default());
        assert!(matches!(session.run_current(), Err(Error::NoTableLoaded)));
    }

    #[test]
    fn test_new_run_replaces_result() {
        let executor = |_: &str, _: &str| -> Result<Table> { Ok(reference()) };
        let mut session = ReconciliationSession::new(executor, ReconConfig::default());

        session.run(imported(&[99, 100])).unwrap();
        assert_eq!(session.result().map(|r| r.row_count()), Some(2));

        session.run(imported(&[7])).unwrap();
        assert_eq!(session.result().map(|r| r.is_empty()), Some(true));
    }

    #[test]
    fn test_stale_commit_is_discarded() {
        let executor = |_: &str, _: &str| -> Result<Table> { Ok(reference()) };
        let mut session = ReconciliationSession::new(executor, ReconConfig::default());

        let slow = session.begin();
        let fast = session.begin();
        assert!(session.commit_load(fast, imported(&[99])));
        assert!(!session.commit_load(slow, imported(&[1, 2, 3])));
        assert_eq!(session.imported().map(|t| t.row_count()), Some(1));

        let stale = session.begin();
        session.run_current().unwrap();
        assert!(!session.commit_run(stale, ReconciliationResult::empty()));
        assert_eq!(session.result().map(|r| r.row_count()), Some(1));
    }

    #[test]
    fn test_load_replaces_table_and_clears_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checks.csv");
        std::fs::write(&path, "Payment / Serial Number,Payee\n00100,ACME\n").unwrap();

        let executor = |_: &str, _: &str| -> Result<Table> { Ok(reference()) };
        let mut session = ReconciliationSession::new(executor, ReconConfig::default());
        session.run(imported(&[99])).unwrap();

        let table = session.load(&path).unwrap();
        assert_eq!(table.column_names(), vec!["Payment/SerialNumber", "Payee"]);
        assert!(session.result().is_none());

        let result = session.run_current().unwrap();
        assert_eq!(result.row_count(), 1);
    }
}
