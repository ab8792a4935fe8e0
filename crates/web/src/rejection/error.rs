use thiserror::Error;

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("only handlers built by RejectionHandler::builder() support mapping their responses, found a {kind} handler")]
    NotBuilt { kind: &'static str },
}
