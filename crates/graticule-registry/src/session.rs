//! Insertion sessions: batch staging of user-defined entities
//!
//! At most one session may be open on a registry context at a time. The
//! session accumulates literal INSERT statements; nothing touches the
//! store until `apply` runs them. Querying the statement list outside an
//! open session is an error, never a silent empty result.

use crate::connection::RegistryPool;
use crate::error::{FactoryError, FactoryResult};
use parking_lot::Mutex;
use tracing::{debug, info};

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn opt_real(v: Option<f64>) -> String {
    v.map(|v| format!("{v}")).unwrap_or_else(|| "NULL".to_string())
}

/// Accumulated state of one open session.
#[derive(Default)]
struct SessionState {
    statements: Vec<String>,
}

/// Session manager owned by the registry context.
#[derive(Default)]
pub struct InsertSessions {
    open: Mutex<Option<SessionState>>,
}

impl InsertSessions {
    /// Enter a session. Fails if one is already open on this context.
    pub fn start(&self) -> FactoryResult<()> {
        let mut open = self.open.lock();
        if open.is_some() {
            return Err(FactoryError::Session(
                "an insertion session is already open on this context".to_string(),
            ));
        }
        debug!("Opening insertion session");
        *open = Some(SessionState::default());
        Ok(())
    }

    /// Stage one literal INSERT statement.
    pub fn add_statement(&self, sql: String) -> FactoryResult<()> {
        let mut open = self.open.lock();
        match open.as_mut() {
            Some(state) => {
                state.statements.push(sql);
                Ok(())
            }
            None => Err(FactoryError::Session(
                "no insertion session is open".to_string(),
            )),
        }
    }

    /// Stage a user-defined geographic CRS row.
    pub fn add_geographic_crs(
        &self,
        authority: &str,
        code: &str,
        name: &str,
        cs: (&str, &str),
        datum: (&str, &str),
    ) -> FactoryResult<()> {
        self.add_statement(format!(
            "INSERT INTO geodetic_crs VALUES({},{},{},'geographic 2D',{},{},{},{},NULL,NULL,NULL,0);",
            quote(authority),
            quote(code),
            quote(name),
            quote(cs.0),
            quote(cs.1),
            quote(datum.0),
            quote(datum.1),
        ))
    }

    /// Stage a user-defined transformation row (no parameters).
    #[allow(clippy::too_many_arguments)]
    pub fn add_transformation(
        &self,
        authority: &str,
        code: &str,
        name: &str,
        method: (&str, &str, &str),
        source: (&str, &str),
        target: (&str, &str),
        accuracy: Option<f64>,
    ) -> FactoryResult<()> {
        self.add_statement(format!(
            "INSERT INTO coordinate_operation VALUES({},{},{},'transformation',{},{},{},{},{},{},{},{},NULL,0);",
            quote(authority),
            quote(code),
            quote(name),
            quote(method.0),
            quote(method.1),
            quote(method.2),
            quote(source.0),
            quote(source.1),
            quote(target.0),
            quote(target.1),
            opt_real(accuracy),
        ))
    }

    /// The staged statements; only available while the session is open.
    pub fn statements(&self) -> FactoryResult<Vec<String>> {
        let open = self.open.lock();
        match open.as_ref() {
            Some(state) => Ok(state.statements.clone()),
            None => Err(FactoryError::Session(
                "no insertion session is open".to_string(),
            )),
        }
    }

    /// Execute every staged statement, leaving the session open.
    pub fn apply(&self, pool: &RegistryPool) -> FactoryResult<()> {
        let statements = self.statements()?;
        info!(count = statements.len(), "Applying staged insert statements");
        pool.with_connection(|conn| {
            for sql in &statements {
                conn.execute_batch(sql)?;
            }
            Ok(())
        })
    }

    /// Exit the session, discarding any unapplied statements.
    pub fn close(&self) -> FactoryResult<()> {
        let mut open = self.open.lock();
        if open.take().is_none() {
            return Err(FactoryError::Session(
                "no insertion session is open".to_string(),
            ));
        }
        debug!("Closed insertion session");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.open.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_session_at_a_time() {
        let sessions = InsertSessions::default();
        sessions.start().unwrap();
        assert!(sessions.start().is_err());
        sessions.close().unwrap();
        sessions.start().unwrap();
    }

    #[test]
    fn statements_fail_outside_session() {
        let sessions = InsertSessions::default();
        let err = sessions.statements().unwrap_err();
        assert!(matches!(err, FactoryError::Session(_)));
        assert!(sessions
            .add_statement("INSERT INTO scope VALUES('X','1','s',0);".to_string())
            .is_err());
    }

    #[test]
    fn staged_statements_are_literal_sql() {
        let sessions = InsertSessions::default();
        sessions.start().unwrap();
        sessions
            .add_geographic_crs("MINE", "1", "it's mine", ("EPSG", "6422"), ("EPSG", "6326"))
            .unwrap();
        let statements = sessions.statements().unwrap();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].starts_with("INSERT INTO geodetic_crs"));
        // Embedded quote escaped, not injected.
        assert!(statements[0].contains("'it''s mine'"));
    }
}
