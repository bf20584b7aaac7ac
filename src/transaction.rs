//! Transaction and savepoint state.
//!
//! The state machine is local: misuse is detected without contacting the
//! server, and a failed statement never changes it. The connection façade
//! checks the state before issuing `BEGIN`/`COMMIT`/`SAVEPOINT`/... and
//! records the transition after the server accepted it.
use std::fmt;

/// Transaction status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// No transaction in progress.
    Idle,
    /// Inside an explicit transaction block.
    InTransaction,
}

/// Local transaction state: status plus the ordered savepoint stack.
///
/// The stack is empty outside a transaction; names are unique within one.
#[derive(Debug)]
pub(crate) struct TxState {
    status: TxStatus,
    savepoints: Vec<String>,
}

impl TxState {
    pub fn new() -> Self {
        Self { status: TxStatus::Idle, savepoints: Vec::new() }
    }

    pub fn status(&self) -> TxStatus {
        self.status
    }

    pub fn in_transaction(&self) -> bool {
        self.status == TxStatus::InTransaction
    }

    pub fn savepoints(&self) -> &[String] {
        &self.savepoints
    }

    /// `BEGIN` requires no transaction in progress, there is no implicit
    /// nesting at the top level, only explicit savepoints nest.
    pub fn ensure_idle(&self) -> Result<(), StateError> {
        match self.status {
            TxStatus::Idle => Ok(()),
            TxStatus::InTransaction => Err(StateError::AlreadyInTransaction),
        }
    }

    pub fn ensure_active(&self) -> Result<(), StateError> {
        match self.status {
            TxStatus::InTransaction => Ok(()),
            TxStatus::Idle => Err(StateError::NotInTransaction),
        }
    }

    /// A savepoint requires an active transaction and an unused name.
    pub fn check_savepoint(&self, name: &str) -> Result<(), StateError> {
        self.ensure_active()?;
        match self.savepoints.iter().any(|s| s == name) {
            true => Err(StateError::DuplicateSavepoint(name.to_owned())),
            false => Ok(()),
        }
    }

    pub fn find(&self, name: &str) -> Result<usize, NotFoundError> {
        self.savepoints
            .iter()
            .position(|s| s == name)
            .ok_or_else(|| NotFoundError { savepoint: name.to_owned() })
    }

    pub fn enter(&mut self) {
        debug_assert!(self.savepoints.is_empty());
        self.status = TxStatus::InTransaction;
    }

    /// Commit or rollback: clear the stack and return to idle.
    pub fn leave(&mut self) {
        self.status = TxStatus::Idle;
        self.savepoints.clear();
    }

    pub fn push(&mut self, name: &str) {
        self.savepoints.push(name.to_owned());
    }

    /// Rolling back to a savepoint pops everything above it, the named
    /// entry itself stays active.
    pub fn rollback_to(&mut self, idx: usize) {
        self.savepoints.truncate(idx + 1);
    }

    /// Releasing a savepoint pops it and everything above it.
    pub fn release(&mut self, idx: usize) {
        self.savepoints.truncate(idx);
    }
}

/// Transaction misuse, raised locally without contacting the server.
pub enum StateError {
    /// `begin` while a transaction is already in progress.
    AlreadyInTransaction,
    /// A transaction scoped operation outside a transaction.
    NotInTransaction,
    /// A savepoint name already on the stack.
    DuplicateSavepoint(String),
}

impl std::error::Error for StateError { }

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInTransaction => f.write_str("already in a transaction"),
            Self::NotInTransaction => f.write_str("not in a transaction"),
            Self::DuplicateSavepoint(name) => {
                write!(f, "savepoint {name:?} already exists")
            },
        }
    }
}

impl fmt::Debug for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// A savepoint name that is not on the stack.
pub struct NotFoundError {
    pub savepoint: String,
}

impl std::error::Error for NotFoundError { }

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "savepoint {:?} not found", self.savepoint)
    }
}

impl fmt::Debug for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn begin_commit_cycle() {
        let mut tx = TxState::new();
        assert_eq!(tx.status(), TxStatus::Idle);
        tx.ensure_idle().unwrap();
        tx.enter();
        assert!(tx.in_transaction());
        assert!(matches!(tx.ensure_idle(), Err(StateError::AlreadyInTransaction)));
        tx.leave();
        assert_eq!(tx.status(), TxStatus::Idle);
    }

    #[test]
    fn savepoint_requires_transaction() {
        let tx = TxState::new();
        assert!(matches!(
            tx.check_savepoint("sp1"),
            Err(StateError::NotInTransaction)
        ));
    }

    #[test]
    fn savepoint_names_unique() {
        let mut tx = TxState::new();
        tx.enter();
        tx.check_savepoint("sp1").unwrap();
        tx.push("sp1");
        assert!(matches!(
            tx.check_savepoint("sp1"),
            Err(StateError::DuplicateSavepoint(_))
        ));
    }

    #[test]
    fn stack_discipline() {
        let mut tx = TxState::new();
        tx.enter();
        tx.push("sp1");
        tx.push("sp2");

        // rollback to sp1 pops sp2, keeps sp1
        let idx = tx.find("sp1").unwrap();
        tx.rollback_to(idx);
        assert_eq!(tx.savepoints(), ["sp1"]);
        assert!(tx.find("sp2").is_err());

        // release sp1 pops it
        let idx = tx.find("sp1").unwrap();
        tx.release(idx);
        assert!(tx.savepoints().is_empty());

        // commit or rollback clears everything
        tx.push("sp3");
        tx.leave();
        assert!(tx.savepoints().is_empty());
        assert_eq!(tx.status(), TxStatus::Idle);
    }
}
