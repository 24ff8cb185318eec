pub mod canvas;
pub mod dispatch;
pub mod hooks;
pub mod host;
pub mod session;
