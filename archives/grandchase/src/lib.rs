pub mod kom;
