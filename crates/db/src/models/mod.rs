pub mod chart_analysis;
pub mod model_profile;
pub mod pair;
pub mod project;
pub mod video;
