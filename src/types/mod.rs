pub mod object;
pub mod value;

pub use object::{Object, XRefEntry};
pub use value::{Dictionary, StreamData, Value};
