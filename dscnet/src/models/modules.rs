mod coordinate_field;
mod offset_predictor;
mod snake_conv;
mod standard_conv;
mod triplet_stage;
mod utils;

pub use coordinate_field::*;
pub use offset_predictor::*;
pub use snake_conv::*;
pub use standard_conv::*;
pub use triplet_stage::*;
pub use utils::*;
