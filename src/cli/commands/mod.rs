//! One module per subcommand; each exposes `execute`.

pub mod add;
pub mod check;
pub mod create;
pub mod creds;
pub mod delete;
pub mod edit;
pub mod fav;
pub mod info;
pub mod list;
pub mod passwd;
pub mod remove;
pub mod update;
