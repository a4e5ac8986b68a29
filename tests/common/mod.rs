pub mod builders;
pub mod sources;
pub mod strategies;

pub use builders::*;
pub use sources::*;
pub use strategies::*;
