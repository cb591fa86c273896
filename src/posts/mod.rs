//! Blog posts. Anyone may read them; only authenticated users may create
//! them, and only the author may delete one.

pub mod handlers;
