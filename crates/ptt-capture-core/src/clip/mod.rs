mod result;
mod store;

pub use {
    result::{ClipResult, ClipStatus},
    store::ClipStore,
};
