//! Chatbot engine: HTTP plumbing for submissions and progress polling.
mod csrf;
mod engine;
mod persist;
mod poll;
mod settings;
mod submit;
mod types;

pub use csrf::{csrf_from_set_cookie, CsrfProvider, CSRF_COOKIE, CSRF_HEADER};
pub use engine::EngineHandle;
pub use persist::{ensure_state_dir, AtomicFileWriter, PersistError};
pub use poll::{
    ChannelProgressSink, PollEvent, PollHandle, ProgressPoller, ProgressSink,
    ReqwestStatusSource, StatusSource,
};
pub use settings::{build_client, ClientSettings};
pub use submit::{classify_response, ReqwestSubmitter, RequestSubmitter, SendPayload};
pub use types::{ClientError, EngineEvent};
