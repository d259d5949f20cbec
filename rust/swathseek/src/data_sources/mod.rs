pub mod speclib;

pub use speclib::{
    Speclib,
    SpeclibEntry,
    SpeclibFormat,
};
