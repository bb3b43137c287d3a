pub mod describe;
pub mod run;
pub mod steps;
pub mod token;
pub mod wait;
