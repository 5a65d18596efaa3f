mod bid;
mod ladder;

pub use {
    bid::*,
    ladder::*,
};
