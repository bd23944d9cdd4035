pub mod doctor;
pub mod export;
pub mod feedback;
pub mod index;
pub mod maintenance;
pub mod reset;
pub mod search;
pub mod stats;
