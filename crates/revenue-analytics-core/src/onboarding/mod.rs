pub mod completion;
pub mod time_to_onboard;
pub mod timeline;
