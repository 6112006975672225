pub mod canon;
pub mod error;
pub mod keywords;
pub mod location;
pub mod node;
pub mod output;
pub mod ptr;
pub mod registry;
pub mod validator;

pub use error::Error;
pub use node::Node;
pub use output::{Output, OutputUnit};
pub use ptr::Pointer;
pub use registry::Registry;
pub use validator::{validate, Validator};
