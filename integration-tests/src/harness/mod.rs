mod server;
mod stub;

pub use server::TestServer;
pub use stub::StubBackend;
