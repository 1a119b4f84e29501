use super::Client;
use crate::engine::Engine;

use std::sync::Arc;
use tether_core::{driver::Driver, Error, Result, Schema};

/// Configures a [`Client`].
#[derive(Debug)]
pub struct Builder {
    schema: Arc<Schema>,
    driver: Option<Box<dyn Driver>>,
}

impl Builder {
    pub(super) fn new(schema: Schema) -> Builder {
        Builder {
            schema: Arc::new(schema),
            driver: None,
        }
    }

    /// The storage driver documents are kept in.
    pub fn driver(&mut self, driver: impl Driver) -> &mut Self {
        self.driver = Some(Box::new(driver));
        self
    }

    /// Register the schema with the driver and return a client over it.
    ///
    /// The driver is consumed; building again needs a new one.
    pub async fn build(&mut self) -> Result<Client> {
        let Some(mut driver) = self.driver.take() else {
            return Err(Error::invalid_config("no driver configured"));
        };

        driver.register_schema(&self.schema).await?;

        tracing::debug!(
            collections = ?self.schema.models().map(|model| model.name()).collect::<Vec<_>>(),
            "client ready"
        );

        Ok(Client {
            engine: Arc::new(Engine::new(self.schema.clone(), Arc::from(driver))),
        })
    }
}
