mod gateway;

pub use gateway::{Gateway, RequestCtx};
