pub mod chart;
pub mod concept_map;
pub mod energy;
pub mod history;
