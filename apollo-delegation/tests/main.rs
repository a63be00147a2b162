mod common;
mod pairing;
mod stitching;
