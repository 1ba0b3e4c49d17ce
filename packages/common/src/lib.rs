pub mod error;
pub mod ids;
pub mod model;
pub mod result;
pub mod visitor;

pub use error::*;
pub use ids::*;
pub use model::*;
pub use result::*;
pub use visitor::*;
