//! Named connections and the models registered on them.

use std::collections::HashMap;
use std::sync::Arc;

use modelsync_core::TableSchema;
use tracing::info;

use crate::connection::Connection;
use crate::error::{OrmError, Result};
use crate::model::Model;

/// Owns every open connection and registered model of one application.
///
/// Names are unique: registering a second connection or a second model for
/// the same table on the same connection fails instead of replacing the
/// first one.
pub struct Registry<C: Connection> {
    connections: HashMap<String, Arc<C>>,
    models: HashMap<(String, String), Arc<Model<C>>>,
}

impl<C: Connection> Default for Registry<C> {
    fn default() -> Self {
        Self {
            connections: HashMap::new(),
            models: HashMap::new(),
        }
    }
}

impl<C: Connection> Registry<C> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a connection is registered under `name`.
    #[must_use]
    pub fn has_connection(&self, name: &str) -> bool {
        self.connections.contains_key(name)
    }

    /// Opens `connection` and registers it under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::AlreadyRegistered`] if the name is taken, and
    /// passes connection errors through. Nothing is registered on error.
    pub async fn register_connection(
        &mut self,
        name: impl Into<String>,
        connection: C,
    ) -> Result<Arc<C>> {
        let name = name.into();
        if self.has_connection(&name) {
            return Err(OrmError::AlreadyRegistered {
                kind: "connection",
                name,
            });
        }
        connection.connect().await?;
        let connection = Arc::new(connection);
        self.connections.insert(name.clone(), Arc::clone(&connection));
        info!(connection = %name, "Registered connection");
        Ok(connection)
    }

    /// Returns the connection registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::NotRegistered`] if there is none.
    pub fn connection(&self, name: &str) -> Result<Arc<C>> {
        self.connections
            .get(name)
            .cloned()
            .ok_or_else(|| OrmError::NotRegistered {
                kind: "connection",
                name: name.to_string(),
            })
    }

    /// Disconnects and forgets the connection registered under `name`,
    /// together with every model registered on it.
    ///
    /// Returns `false` if no such connection was registered.
    ///
    /// # Errors
    ///
    /// Passes disconnect errors through; the connection is forgotten either
    /// way.
    pub async fn unregister_connection(&mut self, name: &str) -> Result<bool> {
        let Some(connection) = self.connections.remove(name) else {
            return Ok(false);
        };
        self.models.retain(|(owner, _), _| owner != name);
        connection.disconnect().await?;
        info!(connection = %name, "Unregistered connection");
        Ok(true)
    }

    /// Disconnects every registered connection. Registrations are kept.
    ///
    /// # Errors
    ///
    /// Returns the first disconnect error after trying every connection.
    pub async fn disconnect_all(&self) -> Result<()> {
        let mut first_error = None;
        for connection in self.connections.values() {
            if let Err(error) = connection.disconnect().await {
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Reconciles `schema` on the named connection and registers the model.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::NotRegistered`] for an unknown connection,
    /// [`OrmError::AlreadyRegistered`] if the table already has a model on
    /// that connection, and reconciliation errors otherwise.
    pub async fn register_model(
        &mut self,
        connection: &str,
        schema: Arc<TableSchema>,
    ) -> Result<Arc<Model<C>>> {
        let key = (connection.to_string(), schema.name().to_string());
        if self.models.contains_key(&key) {
            return Err(OrmError::AlreadyRegistered {
                kind: "model",
                name: format!("{}.{}", key.0, key.1),
            });
        }
        let handle = self.connection(connection)?;
        let model = Arc::new(Model::register(handle, schema).await?);
        self.models.insert(key, Arc::clone(&model));
        Ok(model)
    }

    /// Returns the model for `table` on the named connection.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::NotRegistered`] if there is none.
    pub fn model(&self, connection: &str, table: &str) -> Result<Arc<Model<C>>> {
        self.models
            .get(&(connection.to_string(), table.to_string()))
            .cloned()
            .ok_or_else(|| OrmError::NotRegistered {
                kind: "model",
                name: format!("{connection}.{table}"),
            })
    }

    /// Returns every model registered on the named connection.
    #[must_use]
    pub fn models_on(&self, connection: &str) -> Vec<Arc<Model<C>>> {
        self.models
            .iter()
            .filter(|((owner, _), _)| owner == connection)
            .map(|(_, model)| Arc::clone(model))
            .collect()
    }
}
