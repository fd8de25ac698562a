pub mod analysis;
pub mod cycle;
pub mod errors;
pub mod model;
pub mod numeric;
pub mod project;
pub mod variant;

pub use analysis::*;
pub use cycle::*;
pub use errors::*;
pub use model::*;
pub use numeric::*;
pub use project::*;
pub use variant::*;
