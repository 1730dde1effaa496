pub mod errors;
pub mod events;
pub mod ids;
pub mod messages;
pub mod operations;
pub mod provider;
pub mod session;

pub use errors::{ErrorClass, GatewayError};
pub use ids::{CallId, SessionId};
pub use messages::Message;
pub use operations::{Operation, OperationCall, OperationDefinition, OperationError, OperationResult};
pub use provider::{ModelProvider, ModelRequest, ModelResponse};
pub use session::{LoopState, SessionError, SessionState, TurnPatch};
