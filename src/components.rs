mod auth_switch;
pub use auth_switch::*;
mod task_item;
pub use task_item::*;
mod user;
pub use user::*;
