pub mod chart;
pub mod system;
