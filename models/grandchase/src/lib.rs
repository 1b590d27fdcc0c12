pub mod p3m;
pub mod skel;
