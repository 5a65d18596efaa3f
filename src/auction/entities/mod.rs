mod auction;
mod user;

pub use {
    auction::*,
    user::*,
};
