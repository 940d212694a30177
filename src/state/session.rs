//! Session state shared by every call on a connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::opts::Opts;
use crate::protocol::response::ExecResponseData;

/// Session parameter enabling the heartbeat task.
pub const CLIENT_SESSION_KEEP_ALIVE: &str = "client_session_keep_alive";
/// Session parameter naming the service to route requests to.
pub const SERVICE_NAME: &str = "service_name";

/// Names and diagnostics tracked for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Current database
    pub database: String,
    /// Current schema
    pub schema: String,
    /// Current warehouse
    pub warehouse: String,
    /// Current role
    pub role: String,
    /// Query id of the last successful statement
    pub last_query_id: String,
    /// SQLSTATE of the last successful statement
    pub last_sql_state: String,
    /// Session parameters, keys lower-cased
    pub params: HashMap<String, String>,
}

/// Session: sequence counter, token and mutable state.
#[derive(Debug)]
pub struct Session {
    sequence: AtomicU64,
    token: Option<String>,
    state: Mutex<SessionState>,
}

impl Session {
    /// Create a session from connection options.
    pub fn new(opts: &Opts) -> Self {
        let params = opts
            .params
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect();
        Self {
            sequence: AtomicU64::new(0),
            token: opts.token.clone(),
            state: Mutex::new(SessionState {
                database: opts.database.clone().unwrap_or_default(),
                schema: opts.schema.clone().unwrap_or_default(),
                warehouse: opts.warehouse.clone().unwrap_or_default(),
                role: opts.role.clone().unwrap_or_default(),
                params,
                ..SessionState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Issue the next sequence number. The first value is 1.
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Last issued sequence number (0 before the first call).
    pub fn current_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Session token.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Record the outcome of a successful statement.
    ///
    /// Names are overwritten with the final names the server reports and
    /// parameters are merged in canonical text form.
    pub fn apply_response(&self, data: &ExecResponseData) {
        let mut state = self.lock();
        state.database.clone_from(&data.final_database_name);
        state.schema.clone_from(&data.final_schema_name);
        state.warehouse.clone_from(&data.final_warehouse_name);
        state.role.clone_from(&data.final_role_name);
        state.last_query_id.clone_from(&data.query_id);
        state.last_sql_state.clone_from(&data.sql_state);
        for param in &data.parameters {
            let value = param.value_text();
            tracing::trace!(name = %param.name, value = %value, "session parameter");
            state.params.insert(param.name.to_lowercase(), value);
        }
    }

    /// Get a session parameter (name is case-insensitive).
    pub fn param(&self, name: &str) -> Option<String> {
        self.lock().params.get(&name.to_lowercase()).cloned()
    }

    /// Service name for the routing header.
    pub fn service_name(&self) -> Option<String> {
        self.param(SERVICE_NAME)
    }

    /// Returns true if `client_session_keep_alive` is `"true"`.
    pub fn keepalive_enabled(&self) -> bool {
        self.param(CLIENT_SESSION_KEEP_ALIVE).as_deref() == Some("true")
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }
}
