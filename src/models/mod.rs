pub mod committee;
pub mod motion;
pub mod paths;
pub mod reply;
pub mod threshold;
pub mod vote;
