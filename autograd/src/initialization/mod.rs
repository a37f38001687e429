mod error;
mod param_gen;
mod random;

pub use error::{RandErr, Result};
pub use param_gen::ParamGen;
pub use random::{RandParamGen, uniform};
