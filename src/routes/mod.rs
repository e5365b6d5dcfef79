pub mod health;
pub mod schools;
pub mod settings;
pub mod timetable;
