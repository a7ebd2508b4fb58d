mod room;
mod session;

pub use room::Room;
pub use session::Session;
