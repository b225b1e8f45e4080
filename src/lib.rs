pub mod automation;
pub mod platform;
pub mod settings;
pub mod template_matching;
