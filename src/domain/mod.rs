pub mod institution;
pub mod notice;
pub mod scope;

pub use institution::*;
pub use notice::*;
pub use scope::*;
