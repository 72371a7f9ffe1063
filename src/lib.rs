pub mod greeter;

use rpc_registry::{LocalProtocol, Registry, RegistryError, ServerConfig, ServerError};

use crate::greeter::{GREETER, Greeter, GreeterState};

/// Errors raised while wiring the demo at start-up.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Register the greeter group and serve it in process.
///
/// Returns the registry holding the greeter and a protocol that delivers
/// requests to its handler.
pub fn serve_greeter(registry: &Registry) -> Result<(Registry, LocalProtocol), SetupError> {
    let (registry, greeter) = GREETER.register_and_get(registry, Greeter)?;
    let handler = greeter.server_handler(
        greeter::handlers(),
        ServerConfig::new(GreeterState::default()),
    )?;
    Ok((registry, LocalProtocol::new(handler)))
}
