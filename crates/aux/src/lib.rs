//! Aux-data wire codec, prefetcher, responder, and validator (§4.7-§4.11).

pub mod codec;
pub mod error;
pub mod prefetcher;
pub mod responder;
pub mod validator;

pub use codec::{AuxDataBlock, AuxDataBlockTransferHeader};
pub use error::{CodecError, PrefetchError, ResponderError};
pub use prefetcher::{AcceptMode, Prefetcher, PrefetcherConfig};
pub use responder::{EssenceReader, ResponderState};
pub use validator::Validator;
