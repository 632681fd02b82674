pub mod envelope;
pub mod http;
pub mod mock;
pub mod traits;

pub use envelope::*;
pub use http::*;
pub use mock::*;
pub use traits::*;
